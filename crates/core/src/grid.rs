//! Grid module - manages the tile board
//!
//! The board is a square grid where each cell is empty or holds a tile kind.
//! Uses a flat array sized for the largest supported board (10×10) for cache
//! locality and zero allocation; the live `size` selects the square in use.
//! Coordinates: (row, col), row-major, row 0 at the top. Gravity packs tiles
//! toward the bottom (highest row index).

use crate::rng::TileSource;
use crate::types::{
    Cell, ConfigError, LevelConfig, Pos, TileKind, MAX_CELLS, MAX_GRID_SIZE, MIN_GRID_SIZE,
};

/// The tile board - `size × size` cells in flat row-major storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    /// Board edge length, `MIN_GRID_SIZE..=MAX_GRID_SIZE`
    size: u8,
    /// Flat array of cells, row-major order (row * size + col); cells past
    /// `size * size` stay `None`
    cells: [Cell; MAX_CELLS],
}

impl Grid {
    /// Create a new empty board of the given edge length.
    ///
    /// # Panics
    ///
    /// Panics if `size` is outside `MIN_GRID_SIZE..=MAX_GRID_SIZE`; callers
    /// holding an unvalidated size should go through [`Grid::generate`] or
    /// [`LevelConfig::validate`] instead.
    pub fn empty(size: u8) -> Self {
        assert!(
            (MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&size),
            "grid size {} outside {}..={}",
            size,
            MIN_GRID_SIZE,
            MAX_GRID_SIZE
        );
        Self {
            size,
            cells: [None; MAX_CELLS],
        }
    }

    /// Generate a fully-occupied board with no initial match.
    ///
    /// Fills cells in row-major order, redrawing each cell's kind until it
    /// does not complete a run of three with its two left or two up
    /// neighbors. At most two kinds can be forbidden for any cell (one by
    /// the row, one by the column), so with the validated minimum of three
    /// kinds every redraw succeeds with probability at least 1/color_count
    /// and the loop terminates.
    pub fn generate<T: TileSource>(config: &LevelConfig, tiles: &mut T) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut grid = Self::empty(config.grid_size);
        for row in 0..grid.size {
            for col in 0..grid.size {
                loop {
                    let kind = tiles.next_tile(config.color_count);
                    if grid.completes_run(row, col, kind) {
                        continue;
                    }
                    grid.set(row, col, Some(kind));
                    break;
                }
            }
        }
        Ok(grid)
    }

    /// Would placing `kind` at (row, col) close a run of three with the two
    /// cells to its left or the two above it? Only those directions matter
    /// during row-major generation; later cells are still empty.
    fn completes_run(&self, row: u8, col: u8, kind: TileKind) -> bool {
        if col >= 2
            && self.kind_at(Pos::new(row, col - 1)) == Some(kind)
            && self.kind_at(Pos::new(row, col - 2)) == Some(kind)
        {
            return true;
        }
        if row >= 2
            && self.kind_at(Pos::new(row - 1, col)) == Some(kind)
            && self.kind_at(Pos::new(row - 2, col)) == Some(kind)
        {
            return true;
        }
        false
    }

    /// Calculate flat index from (row, col) coordinates
    #[inline(always)]
    fn index(&self, row: u8, col: u8) -> Option<usize> {
        if row >= self.size || col >= self.size {
            return None;
        }
        Some((row as usize) * (self.size as usize) + (col as usize))
    }

    /// Board edge length
    pub fn size(&self) -> u8 {
        self.size
    }

    /// Get cell at (row, col)
    /// Returns None if out of bounds
    pub fn get(&self, row: u8, col: u8) -> Option<Cell> {
        self.index(row, col).map(|idx| self.cells[idx])
    }

    /// Tile kind at a position, `None` when out of bounds or empty
    pub fn kind_at(&self, pos: Pos) -> Option<TileKind> {
        self.get(pos.row, pos.col).flatten()
    }

    /// Set cell at (row, col)
    /// Returns false if out of bounds
    pub fn set(&mut self, row: u8, col: u8, cell: Cell) -> bool {
        match self.index(row, col) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Check if position is occupied (within bounds and filled)
    pub fn is_occupied(&self, pos: Pos) -> bool {
        matches!(self.get(pos.row, pos.col), Some(Some(_)))
    }

    /// Exchange two cells. Returns false (and leaves the board untouched)
    /// if either position is out of bounds.
    pub fn swap(&mut self, a: Pos, b: Pos) -> bool {
        let (Some(ia), Some(ib)) = (self.index(a.row, a.col), self.index(b.row, b.col)) else {
            return false;
        };
        self.cells.swap(ia, ib);
        true
    }

    /// True when every live cell holds a tile.
    pub fn is_full(&self) -> bool {
        self.live_cells().iter().all(|cell| cell.is_some())
    }

    /// The live cells, row-major (the `size * size` prefix of storage).
    pub fn cells(&self) -> &[Cell] {
        self.live_cells()
    }

    fn live_cells(&self) -> &[Cell] {
        &self.cells[..(self.size as usize) * (self.size as usize)]
    }

    /// Write the board into a fixed u8 matrix: 0 = empty, 1..=7 = palette
    /// index + 1. Cells outside the live square are zeroed.
    pub fn write_u8_cells(&self, out: &mut [[u8; MAX_GRID_SIZE as usize]; MAX_GRID_SIZE as usize]) {
        for row in out.iter_mut() {
            row.fill(0);
        }
        for row in 0..self.size {
            for col in 0..self.size {
                if let Some(kind) = self.kind_at(Pos::new(row, col)) {
                    out[row as usize][col as usize] = kind.index() + 1;
                }
            }
        }
    }

    /// Build a board from row strings for testing: '.' is empty, '1'..='7'
    /// is the palette index + 1 (matching the u8 wire encoding).
    #[cfg(test)]
    pub fn from_rows(rows: &[&str]) -> Self {
        let size = rows.len();
        assert!(rows.iter().all(|row| row.len() == size));
        let mut grid = Self::empty(size as u8);
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let cell = match ch {
                    '.' => None,
                    '1'..='7' => TileKind::from_index(ch as u8 - b'1'),
                    _ => panic!("unexpected cell char {:?}", ch),
                };
                grid.set(row as u8, col as u8, cell);
            }
        }
        grid
    }
}
