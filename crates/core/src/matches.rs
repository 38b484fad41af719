//! Match detection - finds runs of three or more same-kind tiles
//!
//! Detection is a triplet scan: every horizontal and vertical window of
//! three cells with equal kinds marks all three positions. Marking into a
//! presence mask gives set semantics for free: a length-4 run or an
//! L-shaped intersection contributes each position once.

use arrayvec::ArrayVec;

use crate::grid::Grid;
use crate::types::{Pos, MAX_CELLS};

/// Positions participating in at least one run, in row-major order.
pub type MatchSet = ArrayVec<Pos, MAX_CELLS>;

/// Collect every position that belongs to a horizontal or vertical run of
/// three or more same-kind tiles.
///
/// Triplets containing an empty cell never match. The result is
/// duplicate-free and emitted in row-major order.
pub fn find_matches(grid: &Grid) -> MatchSet {
    let size = grid.size() as usize;
    let mut marked = [false; MAX_CELLS];

    for row in 0..grid.size() {
        for col in 0..grid.size() - 2 {
            let Some(kind) = grid.kind_at(Pos::new(row, col)) else {
                continue;
            };
            if grid.kind_at(Pos::new(row, col + 1)) == Some(kind)
                && grid.kind_at(Pos::new(row, col + 2)) == Some(kind)
            {
                marked[row as usize * size + col as usize] = true;
                marked[row as usize * size + col as usize + 1] = true;
                marked[row as usize * size + col as usize + 2] = true;
            }
        }
    }

    for col in 0..grid.size() {
        for row in 0..grid.size() - 2 {
            let Some(kind) = grid.kind_at(Pos::new(row, col)) else {
                continue;
            };
            if grid.kind_at(Pos::new(row + 1, col)) == Some(kind)
                && grid.kind_at(Pos::new(row + 2, col)) == Some(kind)
            {
                marked[row as usize * size + col as usize] = true;
                marked[(row as usize + 1) * size + col as usize] = true;
                marked[(row as usize + 2) * size + col as usize] = true;
            }
        }
    }

    let mut matches = MatchSet::new();
    for row in 0..grid.size() {
        for col in 0..grid.size() {
            if marked[row as usize * size + col as usize] {
                matches.push(Pos::new(row, col));
            }
        }
    }
    matches
}

/// Early-exit variant of [`find_matches`]: does any run of three exist?
///
/// Used by swap validation and the post-resolution invariant checks, where
/// the answer matters but the set does not.
pub fn has_live_match(grid: &Grid) -> bool {
    for row in 0..grid.size() {
        for col in 0..grid.size() - 2 {
            let Some(kind) = grid.kind_at(Pos::new(row, col)) else {
                continue;
            };
            if grid.kind_at(Pos::new(row, col + 1)) == Some(kind)
                && grid.kind_at(Pos::new(row, col + 2)) == Some(kind)
            {
                return true;
            }
        }
    }
    for col in 0..grid.size() {
        for row in 0..grid.size() - 2 {
            let Some(kind) = grid.kind_at(Pos::new(row, col)) else {
                continue;
            };
            if grid.kind_at(Pos::new(row + 1, col)) == Some(kind)
                && grid.kind_at(Pos::new(row + 2, col)) == Some(kind)
            {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(pairs: &[(u8, u8)]) -> Vec<Pos> {
        pairs.iter().map(|&(r, c)| Pos::new(r, c)).collect()
    }

    #[test]
    fn detects_a_horizontal_run() {
        let grid = Grid::from_rows(&["111", "233", "323"]);
        let found = find_matches(&grid);
        assert_eq!(found.as_slice(), positions(&[(0, 0), (0, 1), (0, 2)]));
        assert!(has_live_match(&grid));
    }

    #[test]
    fn detects_a_vertical_run() {
        let grid = Grid::from_rows(&["213", "231", "212"]);
        let found = find_matches(&grid);
        assert_eq!(found.as_slice(), positions(&[(0, 0), (1, 0), (2, 0)]));
    }

    #[test]
    fn no_match_on_a_stable_board() {
        let grid = Grid::from_rows(&["123", "231", "312"]);
        assert!(find_matches(&grid).is_empty());
        assert!(!has_live_match(&grid));
    }

    #[test]
    fn diagonals_do_not_match() {
        let grid = Grid::from_rows(&["122", "212", "221"]);
        assert!(find_matches(&grid).is_empty());
    }

    #[test]
    fn length_four_run_yields_four_positions_once() {
        let grid = Grid::from_rows(&["1111", "2323", "3232", "2323"]);
        let found = find_matches(&grid);
        assert_eq!(
            found.as_slice(),
            positions(&[(0, 0), (0, 1), (0, 2), (0, 3)])
        );
    }

    #[test]
    fn l_shape_intersection_counted_once() {
        // Column 0 and row 0 share the corner tile; five positions total.
        let grid = Grid::from_rows(&["111", "122", "133"]);
        let found = find_matches(&grid);
        assert_eq!(
            found.as_slice(),
            positions(&[(0, 0), (0, 1), (0, 2), (1, 0), (2, 0)])
        );
    }

    #[test]
    fn empty_cells_never_match() {
        let grid = Grid::from_rows(&["1.1", "1.1", "1.1"]);
        // Two vertical runs of kind 1 flank an empty column; each column is
        // a real run of three, the empty column contributes nothing.
        let found = find_matches(&grid);
        assert_eq!(
            found.as_slice(),
            positions(&[(0, 0), (0, 2), (1, 0), (1, 2), (2, 0), (2, 2)])
        );

        let holes = Grid::from_rows(&["...", "...", "..."]);
        assert!(find_matches(&holes).is_empty());
        assert!(!has_live_match(&holes));
    }

    #[test]
    fn result_is_row_major_sorted_across_directions() {
        // Three overlapping runs: column 0 (rows 1-3), column 2 (rows 0-2),
        // and row 3 (cols 0-2); (3,0) belongs to two of them.
        let grid = Grid::from_rows(&["3121", "1323", "1123", "1112"]);
        let found = find_matches(&grid);
        assert_eq!(
            found.as_slice(),
            positions(&[
                (0, 2),
                (1, 0),
                (1, 2),
                (2, 0),
                (2, 2),
                (3, 0),
                (3, 1),
                (3, 2)
            ])
        );
        let mut sorted: Vec<Pos> = found.to_vec();
        sorted.sort();
        assert_eq!(found.to_vec(), sorted);
    }

    #[test]
    fn crossing_runs_share_the_center() {
        // A plus shape: row 1 and column 1 are both runs of kind 1.
        let grid = Grid::from_rows(&["213", "111", "312"]);
        let found = find_matches(&grid);
        assert_eq!(
            found.as_slice(),
            positions(&[(0, 1), (1, 0), (1, 1), (1, 2), (2, 1)])
        );
    }
}
