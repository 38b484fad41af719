//! Gravity module - column collapse and refill
//!
//! After a clear, each column is squeezed: survivors keep their relative
//! order and pack to the bottom, then the vacated cells at the top are
//! refilled with fresh tiles. Refills are unconstrained: a refill that
//! lands in a run is intentional and feeds the next cascade round.

use arrayvec::ArrayVec;

use crate::grid::Grid;
use crate::rng::TileSource;
use crate::types::{Pos, TileKind, MAX_CELLS};

/// A surviving tile sliding down within its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fall {
    pub from: Pos,
    pub to: Pos,
}

/// A fresh tile dropped into a vacated cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refill {
    pub at: Pos,
    pub kind: TileKind,
}

/// Every movement performed by one collapse pass.
#[derive(Debug, Clone, Default)]
pub struct Collapse {
    /// Survivor slides, bottom-most first per column.
    pub falls: ArrayVec<Fall, MAX_CELLS>,
    /// Fresh tiles, top-down per column, columns left to right.
    pub refills: ArrayVec<Refill, MAX_CELLS>,
}

/// Compact every column downward and refill the holes.
///
/// Two-pointer squeeze per column: scan bottom to top, writing each
/// survivor to the lowest unwritten row. Order within a column is
/// preserved; tiles never change column. Cells left above the survivors
/// are then filled from `tiles`, top-down. On return the grid has no
/// empty cell.
pub fn collapse<T: TileSource>(grid: &mut Grid, color_count: u8, tiles: &mut T) -> Collapse {
    let size = grid.size();
    let mut out = Collapse::default();

    for col in 0..size {
        let mut write = size;
        for row in (0..size).rev() {
            if let Some(kind) = grid.kind_at(Pos::new(row, col)) {
                write -= 1;
                if write != row {
                    grid.set(write, col, Some(kind));
                    grid.set(row, col, None);
                    out.falls.push(Fall {
                        from: Pos::new(row, col),
                        to: Pos::new(write, col),
                    });
                }
            }
        }
        for row in 0..write {
            let kind = tiles.next_tile(color_count);
            grid.set(row, col, Some(kind));
            out.refills.push(Refill {
                at: Pos::new(row, col),
                kind,
            });
        }
    }

    out
}
