// Integration tests (native) for the `glyph-field` crate: card registry
// contract, hover detection, grid classification and the border sweep state
// machine driven frame by frame. These avoid wasm-specific functionality so
// they can run under `cargo test` on the host.

use std::cell::Cell;
use std::rc::Rc;

use glyph_field::geom::Rect;
use glyph_field::grid::Grid;
use glyph_field::registry::{BoundsSource, CardRecord, CardRegistry, RenderView};
use glyph_field::sweep::{COVERAGE_STEP, DARK_CEILING, LIGHT_CEILING, SweepSet};

struct Fixed(Rect);

impl BoundsSource for Fixed {
    fn bounds(&self) -> Option<Rect> {
        Some(self.0)
    }
}

fn card(id: &str, rect: Rect) -> CardRecord<Fixed> {
    CardRecord {
        id: id.to_string(),
        handle: Fixed(rect),
        is_blocker: true,
        is_border_eraser: false,
        group_id: None,
    }
}

#[test]
fn hover_index_follows_the_pointer() {
    let mut reg = CardRegistry::new();
    reg.register(card("hero", Rect::new(0.0, 0.0, 100.0, 100.0)));

    reg.update_mouse_pos(50.0, 50.0);
    assert_eq!(reg.hovered_card_index(), 0);

    reg.update_mouse_pos(200.0, 200.0);
    assert_eq!(reg.hovered_card_index(), -1);
}

#[test]
fn pointer_position_is_unknown_until_the_first_event() {
    let mut reg: CardRegistry<Fixed> = CardRegistry::new();
    assert_eq!(reg.mouse_pos(), None, "no sentinel position before any event");
    assert_eq!(reg.hovered_card_index(), -1);

    reg.update_mouse_pos(240.0, 180.0);
    assert_eq!(reg.mouse_pos(), Some((240.0, 180.0)));
}

#[test]
fn overlapping_cards_resolve_to_registration_order() {
    let mut reg = CardRegistry::new();
    reg.register(card("under", Rect::new(0.0, 0.0, 100.0, 100.0)));
    reg.register(card("over", Rect::new(50.0, 50.0, 100.0, 100.0)));

    reg.update_mouse_pos(75.0, 75.0); // inside both
    assert_eq!(reg.hovered_card_index(), 0, "first registered wins");
}

#[test]
fn register_replaces_in_place_and_keeps_insertion_order() {
    let mut reg = CardRegistry::new();
    assert!(reg.is_empty());
    reg.register(card("a", Rect::new(0.0, 0.0, 10.0, 10.0)));
    assert!(!reg.is_empty());
    reg.register(card("b", Rect::new(20.0, 0.0, 10.0, 10.0)));
    reg.register(card("a", Rect::new(40.0, 0.0, 10.0, 10.0))); // last write wins

    let bounds = reg.card_bounds();
    assert_eq!(reg.len(), 2);
    assert_eq!(bounds[0], Rect::new(40.0, 0.0, 10.0, 10.0), "slot preserved");
    assert_eq!(bounds[1], Rect::new(20.0, 0.0, 10.0, 10.0));
}

#[test]
fn listeners_fire_on_changes_and_missing_ids_are_noops() {
    let mut reg = CardRegistry::new();
    let fired = Rc::new(Cell::new(0u32));
    let counter = fired.clone();
    let token = reg.subscribe(move || counter.set(counter.get() + 1));

    reg.register(card("a", Rect::new(0.0, 0.0, 10.0, 10.0)));
    assert_eq!(fired.get(), 1);
    reg.register(card("a", Rect::new(5.0, 5.0, 10.0, 10.0)));
    assert_eq!(fired.get(), 2);
    reg.unregister("a");
    assert_eq!(fired.get(), 3);
    reg.unregister("ghost"); // silent no-op
    assert_eq!(fired.get(), 3);

    reg.unsubscribe(token);
    reg.register(card("b", Rect::new(0.0, 0.0, 10.0, 10.0)));
    assert_eq!(fired.get(), 3, "unsubscribed listener must stay quiet");
}

#[test]
fn grouped_cards_merge_into_one_render_view() {
    let mut reg = CardRegistry::new();
    let mut left = card("left", Rect::new(0.0, 0.0, 50.0, 50.0));
    left.group_id = Some("pair".to_string());
    let mut right = card("right", Rect::new(50.0, 0.0, 50.0, 50.0));
    right.group_id = Some("pair".to_string());
    reg.register(left);
    reg.register(right);

    let (views, map) = reg.render_views();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].rect, Rect::new(0.0, 0.0, 100.0, 50.0));
    assert_eq!(map, vec![Some(0), Some(0)]);
}

#[test]
fn classification_assigns_border_glyphs_by_edge() {
    // Card covering cells 4..=12 on both axes.
    let mut grid = Grid::new(240.0, 240.0);
    let views = [RenderView {
        rect: Rect::new(48.0, 48.0, 96.0, 96.0),
        is_blocker: true,
        is_border_eraser: false,
    }];
    grid.classify(&views);

    assert_eq!(grid.cell(4, 4).unwrap().border_char, Some('+'));
    assert_eq!(grid.cell(12, 12).unwrap().border_char, Some('+'));
    assert_eq!(grid.cell(8, 4).unwrap().border_char, Some('-'));
    assert_eq!(grid.cell(8, 12).unwrap().border_char, Some('-'));
    assert_eq!(grid.cell(4, 8).unwrap().border_char, Some('|'));
    assert_eq!(grid.cell(12, 8).unwrap().border_char, Some('|'));

    let interior = grid.cell(8, 8).unwrap();
    assert!(interior.is_blocker && !interior.is_border);
    let free = grid.cell(2, 2).unwrap();
    assert!(!free.is_blocker && !free.is_border);
    assert_eq!(grid.cell(8, 4).unwrap().card_index, Some(0));
}

#[test]
fn border_erasers_strip_borders_but_keep_blocking() {
    let mut grid = Grid::new(240.0, 240.0);
    let rect = Rect::new(48.0, 48.0, 96.0, 96.0);
    let views = [
        RenderView { rect, is_blocker: true, is_border_eraser: false },
        RenderView { rect, is_blocker: false, is_border_eraser: true },
    ];
    grid.classify(&views);

    for col in 4..=12 {
        let top = grid.cell(col, 4).unwrap();
        assert!(!top.is_border, "eraser left a border at ({col},4)");
        assert_eq!(top.border_char, None);
    }
    assert!(grid.cell(8, 8).unwrap().is_blocker, "interior must still block");
}

#[test]
fn resize_reallocates_the_grid_to_zero_energy() {
    let mut grid = Grid::new(800.0, 600.0);
    assert_eq!(grid.cols * grid.rows, grid.cells.len());

    // Dirty the field, then simulate a viewport resize.
    for cell in &mut grid.cells {
        cell.wave_energy = 0.7;
        cell.energy = 0.7;
    }
    grid = Grid::new(1024.0, 768.0);
    assert_eq!(grid.cols * grid.rows, grid.cells.len());
    assert!(grid.cells.iter().all(|c| c.energy == 0.0 && c.wave_energy == 0.0));
}

#[test]
fn sweep_switches_from_light_to_dark_within_one_frame() {
    let mut sweeps = SweepSet::new();
    let peri = |_: usize| 0.25;

    for _ in 0..3 {
        sweeps.advance(0, peri);
    }
    let lit = *sweeps.state(0).unwrap();
    assert!(lit.is_hovered);
    assert!((lit.light_coverage - 3.0 * COVERAGE_STEP).abs() < 1e-12);

    // Pointer leaves: light freezes, dark starts on the very next frame.
    sweeps.advance(-1, peri);
    let leaving = *sweeps.state(0).unwrap();
    assert!(!leaving.is_hovered);
    assert!((leaving.light_coverage - 3.0 * COVERAGE_STEP).abs() < 1e-12);
    assert!((leaving.dark_coverage - COVERAGE_STEP).abs() < 1e-12);
}

#[test]
fn sweep_resets_to_idle_after_dark_saturates() {
    let mut sweeps = SweepSet::new();
    let peri = |_: usize| 0.25;

    for _ in 0..10 {
        sweeps.advance(0, peri);
    }
    let frames = (DARK_CEILING / COVERAGE_STEP).ceil() as usize + 1;
    for _ in 0..frames {
        sweeps.advance(-1, peri);
    }
    let idle = *sweeps.state(0).unwrap();
    assert_eq!(idle.light_coverage, 0.0);
    assert_eq!(idle.dark_coverage, 0.0);
}

#[test]
fn dark_phase_shrinks_the_lit_radius_inward() {
    let mut sweeps = SweepSet::new();
    let peri = |_: usize| 0.25;

    // Fully light the border, then leave and let darkness grow a little.
    let frames = (LIGHT_CEILING / COVERAGE_STEP).ceil() as usize;
    for _ in 0..frames {
        sweeps.advance(0, peri);
    }
    assert!(sweeps.is_lit(0, 0.75), "opposite point covered at full light");

    for _ in 0..5 {
        sweeps.advance(-1, peri);
    }
    // 0.75 is half a loop from the exit point; darkness has passed it.
    assert!(!sweeps.is_lit(0, 0.75));
    // Points near the exit survive longest.
    assert!(sweeps.is_lit(0, 0.26));
}

#[test]
fn sweep_ignores_cards_never_hovered() {
    let sweeps = SweepSet::new();
    assert!(!sweeps.is_lit(7, 0.1));
    assert!(sweeps.state(7).is_none());
}
