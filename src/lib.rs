//! Glyph Field core crate.
//!
//! A card-aware animated ASCII backdrop: a full-viewport canvas paints a grid
//! of glyphs whose brightness follows a decaying energy field seeded by
//! pointer movement. Registered card elements block the field, get a glyph
//! border, and animate a directional light sweep on hover. The host page
//! drives everything through `start_backdrop` / `stop_backdrop` and the
//! `register_card` / `unregister_card` pair.

use wasm_bindgen::prelude::*;

pub mod backdrop;
pub mod diffusion;
pub mod geom;
pub mod grid;
pub mod registry;
pub mod sweep;

pub use backdrop::{register_card, start_backdrop, stop_backdrop, unregister_card};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}
