//! Hover-driven border light sweep.
//!
//! Each card that has ever been hovered owns a small state machine: entering
//! hover plants a light center at the perimeter position where the pointer
//! crossed in and grows its coverage outward along the border loop; leaving
//! plants a dark center at the exit position whose growth erases the light
//! from the outside in. When the dark phase saturates, both coverages reset
//! and the card is back in the clean idle state.

use std::collections::HashMap;

use crate::geom::wrap_dist;

/// Coverage ceiling for the light phase. Above 0.5 on purpose: perimeter
/// distances saturate at 0.5, so 0.6 fully covers the loop with margin.
pub const LIGHT_CEILING: f64 = 0.6;
/// Dark phase ceiling; reaching it resets the card to idle.
pub const DARK_CEILING: f64 = 0.6;
/// Coverage growth per frame for both phases.
pub const COVERAGE_STEP: f64 = 0.02;
/// Base radius the dark phase shrinks the lit region from.
pub const DARK_BASE: f64 = 0.55;

#[derive(Clone, Copy, Debug, Default)]
pub struct SweepState {
    pub light_center: f64,   // perimeter pos in [0,1)
    pub light_coverage: f64, // grows while hovered, ceiling LIGHT_CEILING
    pub dark_center: f64,
    pub dark_coverage: f64,
    pub is_hovered: bool,
}

/// Sweep states keyed by render-view index. Entries persist for the page
/// lifetime; the map is bounded by the number of distinct hovered cards.
pub struct SweepSet {
    states: HashMap<usize, SweepState>,
    prev_hovered: i32,
}

impl Default for SweepSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepSet {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            prev_hovered: -1,
        }
    }

    /// Advances one frame. `hovered` is the hovered render-view index (−1 for
    /// none); `peri` maps a view index to the pointer's current perimeter
    /// position on that view's rectangle, used to plant sweep centers on
    /// transitions.
    pub fn advance(&mut self, hovered: i32, peri: impl Fn(usize) -> f64) {
        if hovered != self.prev_hovered {
            if self.prev_hovered >= 0 {
                let key = self.prev_hovered as usize;
                let state = self.states.entry(key).or_default();
                state.dark_center = peri(key);
                state.dark_coverage = 0.0;
                state.is_hovered = false;
            }
            if hovered >= 0 {
                let key = hovered as usize;
                let state = self.states.entry(key).or_default();
                state.light_center = peri(key);
                state.light_coverage = 0.0;
                state.is_hovered = true;
            }
            self.prev_hovered = hovered;
        }

        for state in self.states.values_mut() {
            if state.is_hovered {
                state.light_coverage = (state.light_coverage + COVERAGE_STEP).min(LIGHT_CEILING);
            } else if state.light_coverage > 0.0 || state.dark_coverage > 0.0 {
                state.dark_coverage += COVERAGE_STEP;
                if state.dark_coverage >= DARK_CEILING {
                    // Clean idle state.
                    state.light_coverage = 0.0;
                    state.dark_coverage = 0.0;
                }
            }
        }
    }

    /// Whether a border cell at `cell_pos` on view `view_idx` renders at peak
    /// intensity. Lit when inside the light coverage radius; the dark phase
    /// overrides by shrinking the valid lit radius inward over time.
    pub fn is_lit(&self, view_idx: usize, cell_pos: f64) -> bool {
        let Some(state) = self.states.get(&view_idx) else {
            return false;
        };
        let lit = wrap_dist(cell_pos, state.light_center) < state.light_coverage;
        let darkened = !state.is_hovered
            && wrap_dist(cell_pos, state.dark_center) > (DARK_BASE - state.dark_coverage);
        lit && !darkened
    }

    pub fn state(&self, view_idx: usize) -> Option<&SweepState> {
        self.states.get(&view_idx)
    }
}
