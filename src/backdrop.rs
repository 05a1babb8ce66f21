//! Browser host for the backdrop engine.
//!
//! Owns the canvas, the animation-frame loop, DOM listeners and theme
//! resolution, and orchestrates the per-frame pipeline: refresh card bounds,
//! reclassify the grid, run the diffusion step, advance the border sweeps,
//! paint. Everything runs on the one browser thread; event handlers just
//! mutate shared state and the next frame picks it up.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, Event, EventTarget, HtmlCanvasElement,
    MouseEvent, MutationObserver, MutationObserverInit, Window, window,
};

use crate::diffusion::{self, PointerPath};
use crate::geom::perimeter_pos;
use crate::grid::{CELL_PX, Grid, glyph_for};
use crate::registry::{CardRecord, CardRegistry, DomHandle, RenderView};
use crate::sweep::SweepSet;

/// Repaint budget: skip the whole update unless this much time elapsed.
const FRAME_BUDGET_MS: f64 = 1000.0 / 30.0;
/// Card-bounds cache refresh period; also invalidated by resize / scroll /
/// registry changes.
const BOUNDS_REFRESH_MS: f64 = 500.0;
/// Pixel band below the viewport top where glyph alpha fades out (keeps the
/// field from colliding with a fixed navigation bar).
const FADE_PX: f64 = 140.0;
/// Floor alpha for unlit border glyphs before local wave energy is added.
const BORDER_AMBIENT_ALPHA: f64 = 0.2;
const FONT: &str = "12px 'Fira Code', monospace";
const CANVAS_ID: &str = "gf-backdrop";

const DEFAULT_BG: &str = "#0a0a0c";
const DEFAULT_FG: Rgb = Rgb { r: 122, g: 128, b: 140 };
const DEFAULT_ACCENT: Rgb = Rgb { r: 122, g: 162, b: 247 };

// --- Theme -------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Colors resolved from the page theme. Background is kept as the raw CSS
/// value (painted opaquely); foreground and accent are parsed to channels so
/// per-cell alpha can be applied.
pub struct ThemeColors {
    pub bg: String,
    pub fg: Rgb,
    pub accent: Rgb,
}

impl ThemeColors {
    /// Reads `--backdrop-bg` / `--backdrop-fg` / `--backdrop-accent` off the
    /// root element's computed style, falling back to built-in defaults when
    /// a token is unset or unparsable.
    fn resolve(win: &Window, doc: &Document) -> ThemeColors {
        let style = doc
            .document_element()
            .and_then(|root| win.get_computed_style(&root).ok().flatten());
        let read = |prop: &str| -> Option<String> {
            style
                .as_ref()
                .and_then(|s| s.get_property_value(prop).ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        ThemeColors {
            bg: read("--backdrop-bg").unwrap_or_else(|| DEFAULT_BG.to_string()),
            fg: read("--backdrop-fg")
                .and_then(|v| parse_css_color(&v))
                .unwrap_or(DEFAULT_FG),
            accent: read("--backdrop-accent")
                .and_then(|v| parse_css_color(&v))
                .unwrap_or(DEFAULT_ACCENT),
        }
    }
}

/// Parses `#rgb`, `#rrggbb` and `rgb()/rgba()` color values (the forms
/// computed style actually hands back). Anything else yields `None`.
pub fn parse_css_color(value: &str) -> Option<Rgb> {
    let v = value.trim();
    if let Some(hex) = v.strip_prefix('#') {
        return match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
                let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
                let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
                Some(Rgb { r: r * 17, g: g * 17, b: b * 17 })
            }
            6 => Some(Rgb {
                r: u8::from_str_radix(&hex[0..2], 16).ok()?,
                g: u8::from_str_radix(&hex[2..4], 16).ok()?,
                b: u8::from_str_radix(&hex[4..6], 16).ok()?,
            }),
            _ => None,
        };
    }
    let inner = v
        .strip_prefix("rgba(")
        .or_else(|| v.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let mut parts = inner.split(',').map(str::trim);
    let mut channel = || -> Option<u8> {
        let n = parts.next()?.parse::<f64>().ok()?;
        Some(n.clamp(0.0, 255.0) as u8)
    };
    Some(Rgb { r: channel()?, g: channel()?, b: channel()? })
}

/// Cubic fade applied to glyph alpha near the top of the viewport.
pub fn fade_factor(py: f64) -> f64 {
    if py >= FADE_PX {
        1.0
    } else {
        (py.max(0.0) / FADE_PX).powi(3)
    }
}

// --- Page-lifetime state ------------------------------------------------------

struct ListenerHook {
    target: EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

struct BackdropState {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    registry: Rc<RefCell<CardRegistry<DomHandle>>>,
    grid: Grid,
    sweeps: SweepSet,
    theme: ThemeColors,
    views: Vec<RenderView>,             // cached snapshot, refreshed periodically
    card_to_view: Vec<Option<usize>>,   // hovered card index -> render view
    bounds_stale: Rc<Cell<bool>>,
    theme_stale: Rc<Cell<bool>>,
    last_bounds_ms: f64,
    last_paint_ms: f64,
    prev_mouse: Option<(f64, f64)>,
    start_ms: f64,
    raf_id: i32,
    listeners: Vec<ListenerHook>,
    observer: Option<(MutationObserver, Closure<dyn FnMut()>)>,
    subscription: u64,
}

thread_local! {
    static BACKDROP: RefCell<Option<BackdropState>> = const { RefCell::new(None) };
    static REGISTRY: Rc<RefCell<CardRegistry<DomHandle>>> =
        Rc::new(RefCell::new(CardRegistry::new()));
}

/// The page's card registry. Created lazily so cards may register before the
/// engine starts; the engine holds the same `Rc`.
fn registry() -> Rc<RefCell<CardRegistry<DomHandle>>> {
    REGISTRY.with(|r| r.clone())
}

// --- WASM surface -------------------------------------------------------------

/// Associates a card id with a DOM element (replacing any previous handle for
/// that id); passing no element removes the association, mirroring
/// `register(id, null)`.
#[wasm_bindgen]
pub fn register_card(
    id: &str,
    element: Option<Element>,
    is_blocker: bool,
    is_border_eraser: bool,
    group_id: Option<String>,
) {
    let reg = registry();
    match element {
        Some(el) => reg.borrow_mut().register(CardRecord {
            id: id.to_string(),
            handle: DomHandle::new(el),
            is_blocker,
            is_border_eraser,
            group_id,
        }),
        None => reg.borrow_mut().unregister(id),
    }
}

#[wasm_bindgen]
pub fn unregister_card(id: &str) {
    registry().borrow_mut().unregister(id);
}

/// Builds the backdrop (canvas, listeners, theme watcher) and starts the
/// animation loop. Idempotent: a second call while running is a no-op.
#[wasm_bindgen]
pub fn start_backdrop() -> Result<(), JsValue> {
    if BACKDROP.with(|b| b.borrow().is_some()) {
        return Ok(());
    }
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win.document().ok_or_else(|| JsValue::from_str("no document"))?;

    // Reuse an existing backdrop canvas, otherwise create one pinned behind
    // the page content.
    let canvas: HtmlCanvasElement = if let Some(el) = doc.get_element_by_id(CANVAS_ID) {
        el.dyn_into()?
    } else {
        let c: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
        c.set_id(CANVAS_ID);
        let style = c.style();
        style.set_property("position", "fixed")?;
        style.set_property("inset", "0")?;
        style.set_property("z-index", "-1")?;
        style.set_property("pointer-events", "none")?;
        doc.body()
            .ok_or_else(|| JsValue::from_str("no body"))?
            .append_child(&c)?;
        c
    };
    let (vw, vh) = viewport_size(&win);
    canvas.set_width(vw as u32);
    canvas.set_height(vh as u32);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;
    ctx.set_font(FONT);
    ctx.set_text_baseline("top");

    let reg = registry();
    let bounds_stale = Rc::new(Cell::new(true));
    let theme_stale = Rc::new(Cell::new(false));

    let flag = bounds_stale.clone();
    let subscription = reg.borrow_mut().subscribe(move || flag.set(true));

    let mut listeners = Vec::new();

    let reg_for_mouse = reg.clone();
    let mousemove = Closure::wrap(Box::new(move |e: Event| {
        if let Some(me) = e.dyn_ref::<MouseEvent>() {
            reg_for_mouse
                .borrow_mut()
                .update_mouse_pos(me.client_x() as f64, me.client_y() as f64);
        }
    }) as Box<dyn FnMut(Event)>);
    listeners.push(ListenerHook {
        target: EventTarget::from(win.clone()),
        kind: "mousemove",
        closure: mousemove,
    });

    let resize = Closure::wrap(Box::new(move |_: Event| {
        BACKDROP.with(|b| {
            if let Some(state) = b.borrow_mut().as_mut() {
                state.handle_resize();
            }
        });
    }) as Box<dyn FnMut(Event)>);
    listeners.push(ListenerHook {
        target: EventTarget::from(win.clone()),
        kind: "resize",
        closure: resize,
    });

    let flag = bounds_stale.clone();
    let scroll = Closure::wrap(Box::new(move |_: Event| flag.set(true)) as Box<dyn FnMut(Event)>);
    listeners.push(ListenerHook {
        target: EventTarget::from(win.clone()),
        kind: "scroll",
        closure: scroll,
    });

    for hook in &listeners {
        hook.target
            .add_event_listener_with_callback(hook.kind, hook.closure.as_ref().unchecked_ref())?;
    }

    // Theme toggles flip an attribute on the root element; watch it so colors
    // are re-resolved on the next frame.
    let observer = {
        let flag = theme_stale.clone();
        let cb = Closure::wrap(Box::new(move || flag.set(true)) as Box<dyn FnMut()>);
        let obs = MutationObserver::new(cb.as_ref().unchecked_ref())?;
        let init = MutationObserverInit::new();
        init.set_attributes(true);
        if let Some(root) = doc.document_element() {
            obs.observe_with_options(&root, &init)?;
        }
        Some((obs, cb))
    };

    let now = win.performance().map(|p| p.now()).unwrap_or(0.0);
    let state = BackdropState {
        canvas,
        ctx,
        registry: reg,
        grid: Grid::new(vw, vh),
        sweeps: SweepSet::new(),
        theme: ThemeColors::resolve(&win, &doc),
        views: Vec::new(),
        card_to_view: Vec::new(),
        bounds_stale,
        theme_stale,
        last_bounds_ms: 0.0,
        last_paint_ms: 0.0,
        prev_mouse: None,
        start_ms: now,
        raf_id: 0,
        listeners,
        observer,
        subscription,
    };
    BACKDROP.with(|b| b.replace(Some(state)));
    start_loop();
    Ok(())
}

/// Tears the backdrop down: cancels the pending frame, removes listeners,
/// disconnects the theme watcher and drops all state. Safe to call when not
/// running.
#[wasm_bindgen]
pub fn stop_backdrop() {
    let Some(state) = BACKDROP.with(|b| b.borrow_mut().take()) else {
        return;
    };
    if let Some(win) = window() {
        let _ = win.cancel_animation_frame(state.raf_id);
    }
    for hook in &state.listeners {
        let _ = hook
            .target
            .remove_event_listener_with_callback(hook.kind, hook.closure.as_ref().unchecked_ref());
    }
    if let Some((observer, _cb)) = &state.observer {
        observer.disconnect();
    }
    state.registry.borrow_mut().unsubscribe(state.subscription);
}

// --- Frame loop ---------------------------------------------------------------

fn start_loop() {
    let f: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        let alive = BACKDROP.with(|cell| match cell.borrow_mut().as_mut() {
            Some(state) => {
                tick(state, ts);
                true
            }
            None => false, // stopped; let the loop go dormant
        });
        if !alive {
            return;
        }
        if let Some(w) = window() {
            if let Ok(id) =
                w.request_animation_frame(f.borrow().as_ref().unwrap().as_ref().unchecked_ref())
            {
                BACKDROP.with(|cell| {
                    if let Some(state) = cell.borrow_mut().as_mut() {
                        state.raf_id = id;
                    }
                });
            }
        }
    }) as Box<dyn FnMut(f64)>));
    if let Some(w) = window() {
        if let Ok(id) =
            w.request_animation_frame(g.borrow().as_ref().unwrap().as_ref().unchecked_ref())
        {
            BACKDROP.with(|cell| {
                if let Some(state) = cell.borrow_mut().as_mut() {
                    state.raf_id = id;
                }
            });
        }
    }
}

fn tick(state: &mut BackdropState, now: f64) {
    if now - state.last_paint_ms < FRAME_BUDGET_MS {
        return;
    }

    if state.theme_stale.get() {
        if let Some(win) = window() {
            if let Some(doc) = win.document() {
                state.theme = ThemeColors::resolve(&win, &doc);
            }
        }
        state.theme_stale.set(false);
    }

    if state.bounds_stale.get() || now - state.last_bounds_ms >= BOUNDS_REFRESH_MS {
        let (views, card_to_view) = state.registry.borrow().render_views();
        state.views = views;
        state.card_to_view = card_to_view;
        state.bounds_stale.set(false);
        state.last_bounds_ms = now;
    }

    // Classification must reflect the latest snapshot before diffusion runs.
    state.grid.classify(&state.views);

    // No injection until a pointer event has happened; the first report seeds
    // only its own position via a degenerate path.
    let mouse = state.registry.borrow().mouse_pos();
    let path = match (state.prev_mouse, mouse) {
        (Some(prev), Some(cur)) if prev != cur => Some(PointerPath { from: prev, to: cur }),
        (None, Some(cur)) => Some(PointerPath { from: cur, to: cur }),
        _ => None,
    };
    diffusion::step(&mut state.grid, path, (now - state.start_ms) / 1000.0);
    let (mx, my) = mouse.unwrap_or_default();

    let hovered_card = state.registry.borrow().hovered_card_index();
    let hovered_view = if hovered_card >= 0 {
        state
            .card_to_view
            .get(hovered_card as usize)
            .copied()
            .flatten()
            .map(|v| v as i32)
            .unwrap_or(-1)
    } else {
        -1
    };
    let views = &state.views;
    state.sweeps.advance(hovered_view, |key| {
        views
            .get(key)
            .map(|v| perimeter_pos(&v.rect, mx, my))
            .unwrap_or(0.0)
    });

    paint(state);
    state.prev_mouse = mouse;
    state.last_paint_ms = now;
}

impl BackdropState {
    fn handle_resize(&mut self) {
        let Some(win) = window() else {
            return;
        };
        let (vw, vh) = viewport_size(&win);
        self.canvas.set_width(vw as u32);
        self.canvas.set_height(vh as u32);
        // Resizing a canvas resets its 2d context state.
        self.ctx.set_font(FONT);
        self.ctx.set_text_baseline("top");
        self.grid = Grid::new(vw, vh);
        self.bounds_stale.set(true);
        self.theme_stale.set(true);
    }
}

// --- Renderer -----------------------------------------------------------------

fn paint(state: &BackdropState) {
    let ctx = &state.ctx;
    let w = state.canvas.width() as f64;
    let h = state.canvas.height() as f64;
    ctx.set_fill_style(&JsValue::from_str(&state.theme.bg));
    ctx.fill_rect(0.0, 0.0, w, h);

    for row in 0..state.grid.rows {
        for col in 0..state.grid.cols {
            let cell = &state.grid.cells[state.grid.idx(col, row)];
            if cell.is_blocker {
                continue;
            }
            let px = col as f64 * CELL_PX;
            let py = row as f64 * CELL_PX;
            let fade = fade_factor(py);

            if cell.is_border {
                let Some(ch) = cell.border_char else { continue };
                let lit = cell
                    .card_index
                    .and_then(|vi| {
                        let view = state.views.get(vi)?;
                        let pos = perimeter_pos(
                            &view.rect,
                            px + CELL_PX * 0.5,
                            py + CELL_PX * 0.5,
                        );
                        Some(state.sweeps.is_lit(vi, pos))
                    })
                    .unwrap_or(false);
                let (color, alpha) = if lit {
                    (state.theme.accent, 1.0)
                } else {
                    let a = (BORDER_AMBIENT_ALPHA + cell.wave_energy).min(1.0);
                    (state.theme.fg, a)
                };
                draw_glyph(ctx, ch, px, py, color, alpha * fade);
            } else {
                let alpha = cell.energy.clamp(0.0, 1.0) * fade;
                if alpha < 0.02 {
                    continue;
                }
                draw_glyph(ctx, glyph_for(cell.energy), px, py, state.theme.fg, alpha);
            }
        }
    }
}

fn draw_glyph(
    ctx: &CanvasRenderingContext2d,
    ch: char,
    px: f64,
    py: f64,
    color: Rgb,
    alpha: f64,
) {
    let mut buf = [0u8; 4];
    let glyph = ch.encode_utf8(&mut buf);
    ctx.set_fill_style(&JsValue::from_str(&format!(
        "rgba({},{},{},{:.3})",
        color.r, color.g, color.b, alpha
    )));
    ctx.fill_text(glyph, px, py).ok();
}

fn viewport_size(win: &Window) -> (f64, f64) {
    let w = win.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    let h = win.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    (w, h)
}
