//! Scoring module - points awarded for cleared rounds
//!
//! One formula covers every clear: each cleared tile pays a flat rate, and
//! each tile beyond the minimum run length pays a bonus on top. Runs that
//! merge through a shared tile (an L or a plus) score as one round, so a
//! five-tile cross is worth 50 + 40 = 90, not two separate triples.

use crate::types::{EXTRA_TILE_BONUS, MATCH_TILE_POINTS, MIN_RUN_LEN};

/// Points breakdown for a single cleared round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundPoints {
    /// Flat per-tile points for every cleared tile.
    pub base: u32,
    /// Bonus for tiles beyond the minimum run length.
    pub bonus: u32,
    pub total: u32,
}

/// Score one cleared round of `cleared` tiles.
///
/// Rounds smaller than the minimum run length never happen in play (the
/// detector only reports runs of three or more); they score base points
/// only, with no bonus.
pub fn round_points(cleared: usize) -> RoundPoints {
    let cleared = cleared as u32;
    let base = cleared.saturating_mul(MATCH_TILE_POINTS);
    let extra = cleared.saturating_sub(MIN_RUN_LEN as u32);
    let bonus = extra.saturating_mul(EXTRA_TILE_BONUS);
    RoundPoints {
        base,
        bonus,
        total: base.saturating_add(bonus),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_run_scores_base_only() {
        let points = round_points(3);
        assert_eq!(points.base, 30);
        assert_eq!(points.bonus, 0);
        assert_eq!(points.total, 30);
    }

    #[test]
    fn longer_runs_earn_the_extra_tile_bonus() {
        let four = round_points(4);
        assert_eq!(four.base, 40);
        assert_eq!(four.bonus, 20);
        assert_eq!(four.total, 60);

        let five = round_points(5);
        assert_eq!(five.total, 50 + 40);
    }

    #[test]
    fn merged_runs_score_as_one_round() {
        // An L of five tiles and a row of five tiles pay the same
        assert_eq!(round_points(5), round_points(5));
        // Two disjoint triples cleared together: 6 tiles, 60 + 60
        assert_eq!(round_points(6).total, 120);
    }

    #[test]
    fn empty_round_scores_zero() {
        assert_eq!(round_points(0).total, 0);
    }
}
