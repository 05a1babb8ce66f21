//! Viewport-sized glyph grid and per-frame cell classification.
//!
//! The grid is a flat row-major cell array at a fixed pixel pitch. Every
//! frame the full array is reclassified against the current card snapshot
//! before the diffusion step runs; nothing is carried over, so stale bounds
//! can never leak into the simulation. Full reclassification is O(card area /
//! cell area) which stays trivial for the handful of cards a page shows.

use crate::registry::RenderView;

/// Cell pitch in pixels. One glyph is drawn per cell.
pub const CELL_PX: f64 = 12.0;

/// Low-to-high density glyph ramp for free cells.
pub const CHARSET: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Picks a ramp glyph for a combined energy value. Energy is clamped into
/// `[0,1]` here and nowhere earlier; raw wave energy may run hotter.
pub fn glyph_for(energy: f64) -> char {
    let e = energy.clamp(0.0, 1.0);
    let idx = (e * (CHARSET.len() - 1) as f64).floor() as usize;
    CHARSET[idx.min(CHARSET.len() - 1)]
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Cell {
    pub energy: f64,      // combined (ambient + wave), what the renderer reads
    pub wave_energy: f64, // pure diffusion state
    pub is_blocker: bool,
    pub is_border: bool,
    pub border_char: Option<char>,
    pub card_index: Option<usize>, // render-view index owning the border
}

pub struct Grid {
    pub cols: usize,
    pub rows: usize,
    pub cells: Vec<Cell>,
    scratch: Vec<f64>, // next-frame wave energy, reused across frames
}

impl Grid {
    /// Allocates a grid covering the viewport with one spare cell per axis so
    /// the glyph field always overshoots the right/bottom edge.
    pub fn new(viewport_w: f64, viewport_h: f64) -> Self {
        let cols = (viewport_w / CELL_PX).ceil() as usize + 1;
        let rows = (viewport_h / CELL_PX).ceil() as usize + 1;
        Self {
            cols,
            rows,
            cells: vec![Cell::default(); cols * rows],
            scratch: vec![0.0; cols * rows],
        }
    }

    pub fn idx(&self, col: usize, row: usize) -> usize {
        row * self.cols + col
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<&Cell> {
        if col < self.cols && row < self.rows {
            Some(&self.cells[row * self.cols + col])
        } else {
            None
        }
    }

    /// Cell column containing a pixel x-coordinate (may be out of range).
    pub fn col_at(&self, px: f64) -> i64 {
        (px / CELL_PX).floor() as i64
    }

    pub fn row_at(&self, py: f64) -> i64 {
        (py / CELL_PX).floor() as i64
    }

    pub(crate) fn scratch_mut(&mut self) -> &mut Vec<f64> {
        &mut self.scratch
    }

    /// Reclassifies every cell against the given card snapshot. Blocker
    /// interiors are zeroed immediately; the one-cell boundary ring gets a
    /// border glyph (`+` corners, `-` top/bottom, `|` sides) and remembers
    /// which view owns it. Border-eraser views clear borders over their whole
    /// footprint afterwards.
    pub fn classify(&mut self, views: &[RenderView]) {
        for cell in &mut self.cells {
            cell.is_blocker = false;
            cell.is_border = false;
            cell.border_char = None;
            cell.card_index = None;
        }

        for (view_idx, view) in views.iter().enumerate() {
            if !view.is_blocker {
                continue;
            }
            let Some((c0, r0, c1, r1)) = self.cell_rect(view) else {
                continue;
            };
            for row in r0..=r1 {
                for col in c0..=c1 {
                    let on_ring = row == r0 || row == r1 || col == c0 || col == c1;
                    let idx = self.idx(col, row);
                    let cell = &mut self.cells[idx];
                    if on_ring {
                        cell.is_border = true;
                        cell.card_index = Some(view_idx);
                        cell.border_char = Some(border_glyph(col, row, c0, r0, c1, r1));
                    } else {
                        cell.is_blocker = true;
                        cell.energy = 0.0;
                        cell.wave_energy = 0.0;
                    }
                }
            }
        }

        for view in views.iter().filter(|v| v.is_border_eraser) {
            let Some((c0, r0, c1, r1)) = self.cell_rect(view) else {
                continue;
            };
            for row in r0..=r1 {
                for col in c0..=c1 {
                    let idx = self.idx(col, row);
                    let cell = &mut self.cells[idx];
                    cell.is_border = false;
                    cell.border_char = None;
                    cell.card_index = None;
                }
            }
        }
    }

    /// Cell-index rectangle covered by a view's pixel bounds, clamped to the
    /// grid; `None` when the view lies fully outside.
    fn cell_rect(&self, view: &RenderView) -> Option<(usize, usize, usize, usize)> {
        let c0 = self.col_at(view.rect.x).max(0) as usize;
        let r0 = self.row_at(view.rect.y).max(0) as usize;
        let c1 = self.col_at(view.rect.right());
        let r1 = self.row_at(view.rect.bottom());
        if c1 < 0 || r1 < 0 || c0 >= self.cols || r0 >= self.rows {
            return None;
        }
        let c1 = (c1 as usize).min(self.cols - 1);
        let r1 = (r1 as usize).min(self.rows - 1);
        if c0 > c1 || r0 > r1 {
            return None;
        }
        Some((c0, r0, c1, r1))
    }
}

fn border_glyph(col: usize, row: usize, c0: usize, r0: usize, c1: usize, r1: usize) -> char {
    let h_edge = row == r0 || row == r1;
    let v_edge = col == c0 || col == c1;
    if h_edge && v_edge {
        '+'
    } else if h_edge {
        '-'
    } else {
        '|'
    }
}
