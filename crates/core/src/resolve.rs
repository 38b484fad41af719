//! Swap resolution - validates a swap and runs the cascade to quiescence
//!
//! A swap is speculative: the two tiles are exchanged, and if the exchange
//! produces no run the board is restored exactly and the attempt is
//! rejected. An accepted swap runs the full cascade loop - detect, score,
//! clear, collapse - until a pass finds nothing, and reports every round
//! so callers can replay the resolution step by step.

use arrayvec::ArrayVec;

use crate::gravity::{self, Collapse, Fall, Refill};
use crate::grid::Grid;
use crate::matches::{self, MatchSet};
use crate::rng::TileSource;
use crate::scoring::{self, RoundPoints};
use crate::types::{Pos, MAX_CELLS};

/// Why a swap attempt was rejected. Every variant is recoverable: the
/// board is unchanged and the caller may try another swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapError {
    /// A position lies outside the live board.
    OutOfBounds,
    /// The two positions are not edge neighbors.
    NotAdjacent,
    /// A position holds no tile.
    Vacant,
    /// The exchange produced no run; the board was restored.
    NoMatch,
    /// The session has already been cleared or failed.
    SessionOver,
}

impl SwapError {
    pub fn code(self) -> &'static str {
        match self {
            SwapError::OutOfBounds | SwapError::NotAdjacent | SwapError::Vacant => "invalid_swap",
            SwapError::NoMatch => "no_match_swap",
            SwapError::SessionOver => "session_over",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            SwapError::OutOfBounds => "position outside the board",
            SwapError::NotAdjacent => "tiles are not adjacent",
            SwapError::Vacant => "no tile at position",
            SwapError::NoMatch => "swap would not create a match",
            SwapError::SessionOver => "session already finished",
        }
    }
}

/// One detect-clear-collapse pass of the cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    /// Positions cleared this round, row-major.
    pub cleared: MatchSet,
    /// Survivor slides performed by the collapse.
    pub falls: ArrayVec<Fall, MAX_CELLS>,
    /// Fresh tiles dropped into the vacated cells.
    pub refills: ArrayVec<Refill, MAX_CELLS>,
    /// Points awarded for this round alone.
    pub points: RoundPoints,
}

/// Complete record of an accepted swap: every cascade round in order,
/// plus the total points across all of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub rounds: Vec<Round>,
    pub score_delta: u32,
}

impl Resolution {
    /// Total tiles cleared across every round.
    pub fn tiles_cleared(&self) -> usize {
        self.rounds.iter().map(|round| round.cleared.len()).sum()
    }
}

/// Try to exchange the tiles at `a` and `b`.
///
/// Validation happens before the board is touched; a rejected swap leaves
/// the grid bit-identical to how it was. On acceptance the cascade runs
/// to quiescence and the grid comes back full and run-free.
pub fn attempt_swap<T: TileSource>(
    grid: &mut Grid,
    a: Pos,
    b: Pos,
    color_count: u8,
    tiles: &mut T,
) -> Result<Resolution, SwapError> {
    let size = grid.size();
    if a.row >= size || a.col >= size || b.row >= size || b.col >= size {
        return Err(SwapError::OutOfBounds);
    }
    if !a.is_adjacent(b) {
        return Err(SwapError::NotAdjacent);
    }
    if !grid.is_occupied(a) || !grid.is_occupied(b) {
        return Err(SwapError::Vacant);
    }

    grid.swap(a, b);
    if !matches::has_live_match(grid) {
        grid.swap(a, b);
        return Err(SwapError::NoMatch);
    }

    Ok(run_cascade(grid, color_count, tiles))
}

/// Detect, score, clear, and collapse until a pass finds no run.
///
/// Termination: every round clears at least three tiles and refills are
/// finite, so each iteration strictly consumes the runs present; in
/// practice cascades settle within a handful of rounds.
fn run_cascade<T: TileSource>(grid: &mut Grid, color_count: u8, tiles: &mut T) -> Resolution {
    let mut resolution = Resolution::default();
    loop {
        let cleared = matches::find_matches(grid);
        if cleared.is_empty() {
            break;
        }
        let points = scoring::round_points(cleared.len());
        for pos in &cleared {
            grid.set(pos.row, pos.col, None);
        }
        let Collapse { falls, refills } = gravity::collapse(grid, color_count, tiles);
        resolution.score_delta += points.total;
        resolution.rounds.push(Round {
            cleared,
            falls,
            refills,
            points,
        });
    }
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{ScriptedTiles, SimpleRng};
    use crate::types::TileKind;

    fn kinds(indices: &[u8]) -> Vec<TileKind> {
        indices
            .iter()
            .map(|&i| TileKind::from_index(i - 1).unwrap())
            .collect()
    }

    #[test]
    fn rejects_out_of_bounds_positions() {
        let mut grid = Grid::from_rows(&["123", "231", "312"]);
        let before = grid.clone();
        let mut tiles = ScriptedTiles::new(&[]);
        let err = attempt_swap(&mut grid, Pos::new(0, 2), Pos::new(0, 3), 3, &mut tiles);
        assert_eq!(err, Err(SwapError::OutOfBounds));
        assert_eq!(grid, before);
    }

    #[test]
    fn rejects_non_adjacent_positions() {
        let mut grid = Grid::from_rows(&["123", "231", "312"]);
        let before = grid.clone();
        let mut tiles = ScriptedTiles::new(&[]);

        // Diagonal neighbors do not count
        let err = attempt_swap(&mut grid, Pos::new(0, 0), Pos::new(1, 1), 3, &mut tiles);
        assert_eq!(err, Err(SwapError::NotAdjacent));

        // Neither does a tile paired with itself
        let err = attempt_swap(&mut grid, Pos::new(1, 1), Pos::new(1, 1), 3, &mut tiles);
        assert_eq!(err, Err(SwapError::NotAdjacent));

        // Or a gap of two
        let err = attempt_swap(&mut grid, Pos::new(0, 0), Pos::new(0, 2), 3, &mut tiles);
        assert_eq!(err, Err(SwapError::NotAdjacent));
        assert_eq!(grid, before);
    }

    #[test]
    fn rejects_vacant_positions() {
        let mut grid = Grid::from_rows(&["1.3", "231", "312"]);
        let before = grid.clone();
        let mut tiles = ScriptedTiles::new(&[]);
        let err = attempt_swap(&mut grid, Pos::new(0, 0), Pos::new(0, 1), 3, &mut tiles);
        assert_eq!(err, Err(SwapError::Vacant));
        assert_eq!(grid, before);
    }

    #[test]
    fn no_match_swap_restores_the_board_exactly() {
        let grid0 = Grid::from_rows(&[
            "123123", //
            "231312", //
            "321211", //
            "132323", //
            "213131", //
            "321212",
        ]);
        let mut grid = grid0.clone();
        let mut tiles = ScriptedTiles::new(&[]);
        let err = attempt_swap(&mut grid, Pos::new(0, 0), Pos::new(0, 1), 3, &mut tiles);
        assert_eq!(err, Err(SwapError::NoMatch));
        assert_eq!(grid, grid0);
        assert_eq!(tiles.remaining(), 0);
    }

    #[test]
    fn accepted_swap_clears_one_round_and_scores_thirty() {
        // Swapping (2,2) and (2,3) turns row 2 into 3 2 2 1 1 1: a single
        // run of three at columns 3..=5. The scripted refills land at
        // (0,3) (0,4) (0,5) and close no new run.
        let mut grid = Grid::from_rows(&[
            "123123", //
            "231312", //
            "321211", //
            "132323", //
            "213131", //
            "321212",
        ]);
        let mut tiles = ScriptedTiles::new(&kinds(&[1, 2, 1]));

        let resolution = attempt_swap(&mut grid, Pos::new(2, 2), Pos::new(2, 3), 3, &mut tiles)
            .unwrap();

        assert_eq!(resolution.rounds.len(), 1);
        assert_eq!(resolution.score_delta, 30);
        assert_eq!(resolution.tiles_cleared(), 3);

        let round = &resolution.rounds[0];
        assert_eq!(
            round.cleared.as_slice(),
            &[Pos::new(2, 3), Pos::new(2, 4), Pos::new(2, 5)]
        );
        assert_eq!(round.points.base, 30);
        assert_eq!(round.points.bonus, 0);
        // Two survivors slide down in each of the three emptied columns
        assert_eq!(round.falls.len(), 6);
        assert_eq!(round.refills.len(), 3);
        assert_eq!(round.refills[0].at, Pos::new(0, 3));

        assert!(grid.is_full());
        assert!(!matches::has_live_match(&grid));
        assert_eq!(tiles.remaining(), 0);
    }

    #[test]
    fn four_in_a_row_earns_the_length_bonus() {
        // Pulling the 1 at (0,1) down into (1,1) turns row 1 into
        // 1 1 1 1 3 2: a single run of four.
        let mut grid = Grid::from_rows(&[
            "213213", //
            "121132", //
            "332213", //
            "123121", //
            "231232", //
            "312313",
        ]);
        let mut tiles = ScriptedTiles::new(&kinds(&[2, 3, 2, 3]));

        let resolution = attempt_swap(&mut grid, Pos::new(0, 1), Pos::new(1, 1), 3, &mut tiles)
            .unwrap();

        assert_eq!(resolution.rounds.len(), 1);
        assert_eq!(resolution.rounds[0].cleared.len(), 4);
        assert_eq!(resolution.rounds[0].points.base, 40);
        assert_eq!(resolution.rounds[0].points.bonus, 20);
        assert_eq!(resolution.score_delta, 60);
        assert!(!matches::has_live_match(&grid));
    }

    #[test]
    fn cascade_runs_two_rounds_and_sums_the_points() {
        // Swapping (3,0) and (3,1) clears three 1s in row 3; the tiles
        // sliding down complete a run of three 3s in the same row, which
        // clears in a second round. The scripted refills keep both rounds
        // at exactly three tiles and close nothing further.
        let mut grid = Grid::from_rows(&[
            "123123", //
            "231332", //
            "312311", //
            "121133", //
            "232212", //
            "313121",
        ]);
        let mut tiles = ScriptedTiles::new(&kinds(&[1, 2, 1, 2, 1, 2]));

        let resolution = attempt_swap(&mut grid, Pos::new(3, 0), Pos::new(3, 1), 3, &mut tiles)
            .unwrap();

        assert_eq!(resolution.rounds.len(), 2);
        assert_eq!(
            resolution.rounds[0].cleared.as_slice(),
            &[Pos::new(3, 1), Pos::new(3, 2), Pos::new(3, 3)]
        );
        assert_eq!(
            resolution.rounds[1].cleared.as_slice(),
            &[Pos::new(3, 3), Pos::new(3, 4), Pos::new(3, 5)]
        );
        assert_eq!(resolution.rounds[0].points.total, 30);
        assert_eq!(resolution.rounds[1].points.total, 30);
        assert_eq!(resolution.score_delta, 60);

        assert!(grid.is_full());
        assert!(!matches::has_live_match(&grid));
        assert_eq!(tiles.remaining(), 0);
    }

    #[test]
    fn resolution_leaves_a_full_stable_board_with_random_refills() {
        // Unscripted refills may cascade further; whatever happens, the
        // board must come back full and run-free.
        let mut grid = Grid::from_rows(&[
            "123123", //
            "231312", //
            "321211", //
            "132323", //
            "213131", //
            "321212",
        ]);
        let mut rng = SimpleRng::new(99);
        let resolution =
            attempt_swap(&mut grid, Pos::new(2, 2), Pos::new(2, 3), 3, &mut rng).unwrap();

        assert!(!resolution.rounds.is_empty());
        assert!(resolution.score_delta >= 30);
        assert!(grid.is_full());
        assert!(!matches::has_live_match(&grid));
    }
}
