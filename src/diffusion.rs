//! Decaying energy field seeded by pointer movement.
//!
//! Each frame: inject energy along the pointer's travel path, average every
//! free cell with its axis neighbors (blockers are insulation: excluded from
//! both sum and count, so energy pools against card edges instead of leaking
//! through), damp, then blend a low-amplitude ambient term so the field is
//! never fully inert.

use crate::grid::{CELL_PX, Grid};

/// Energy added per interpolated pointer sub-step.
pub const INJECT: f64 = 2.0;
/// Hard cap on a single cell's wave energy.
pub const ENERGY_CAP: f64 = 10.0;
/// Per-frame decay applied after neighbor averaging.
pub const DAMPING: f64 = 0.96;
/// Weight of the ambient noise term in the combined energy.
pub const AMBIENT_WEIGHT: f64 = 0.08;

/// Pointer travel since the previous simulated frame, viewport pixels.
#[derive(Clone, Copy, Debug)]
pub struct PointerPath {
    pub from: (f64, f64),
    pub to: (f64, f64),
}

/// Ambient background shimmer: three offset sine waves over grid coordinates
/// and elapsed seconds, normalized into `[0,1]`.
pub fn ambient(col: usize, row: usize, t: f64) -> f64 {
    let a = (col as f64 * 0.35 + t * 0.8).sin();
    let b = (row as f64 * 0.29 - t * 0.6).sin();
    let c = ((col + row) as f64 * 0.17 + t * 1.3).sin();
    ((a + b + c) / 3.0) * 0.5 + 0.5
}

/// Advances the field one frame. `path` is `None` until the first pointer
/// event; classification must already reflect the current card bounds.
pub fn step(grid: &mut Grid, path: Option<PointerPath>, t: f64) {
    if let Some(path) = path {
        inject(grid, path);
    }

    let cols = grid.cols;
    let rows = grid.rows;
    let mut next = std::mem::take(grid.scratch_mut());
    next.resize(cols * rows, 0.0);

    for row in 0..rows {
        for col in 0..cols {
            let idx = row * cols + col;
            if grid.cells[idx].is_blocker {
                next[idx] = 0.0;
                continue;
            }
            let mut sum = grid.cells[idx].wave_energy;
            let mut count = 1.0;
            for (dc, dr) in [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)] {
                let nc = col as i64 + dc;
                let nr = row as i64 + dr;
                if nc < 0 || nr < 0 || nc >= cols as i64 || nr >= rows as i64 {
                    continue;
                }
                let neighbor = &grid.cells[nr as usize * cols + nc as usize];
                if neighbor.is_blocker {
                    continue; // insulation: no donation, no dilution
                }
                sum += neighbor.wave_energy;
                count += 1.0;
            }
            next[idx] = (sum / count) * DAMPING;
        }
    }

    for idx in 0..cols * rows {
        let col = idx % cols;
        let row = idx / cols;
        let cell = &mut grid.cells[idx];
        if cell.is_blocker {
            cell.wave_energy = 0.0;
            cell.energy = 0.0;
            continue;
        }
        cell.wave_energy = next[idx];
        cell.energy = AMBIENT_WEIGHT * ambient(col, row, t) + cell.wave_energy;
    }

    *grid.scratch_mut() = next;
}

/// Seeds energy along the pointer path. Sub-steps at half a cell pitch so a
/// fast pointer sweep still touches every cell it crossed. The `from`
/// endpoint is skipped: each frame's path starts where the previous one
/// ended (a degenerate path collapses onto `to`), so every crossing is
/// seeded exactly once.
fn inject(grid: &mut Grid, path: PointerPath) {
    let (fx, fy) = path.from;
    let (tx, ty) = path.to;
    let dist = ((tx - fx).powi(2) + (ty - fy).powi(2)).sqrt();
    let steps = (dist / (CELL_PX * 0.5)).ceil().max(1.0) as usize;

    for i in 1..=steps {
        let frac = i as f64 / steps as f64;
        let px = fx + (tx - fx) * frac;
        let py = fy + (ty - fy) * frac;
        let col = grid.col_at(px);
        let row = grid.row_at(py);
        if col < 0 || row < 0 || col >= grid.cols as i64 || row >= grid.rows as i64 {
            continue;
        }
        let idx = grid.idx(col as usize, row as usize);
        let cell = &mut grid.cells[idx];
        if !cell.is_blocker {
            cell.wave_energy = (cell.wave_energy + INJECT).min(ENERGY_CAP);
        }
    }
}
