//! Session module - one level attempt with move and score accounting
//!
//! A session owns the board, the tile source, and the level bookkeeping:
//! score, moves left, and lifecycle status. Only a committed swap spends a
//! move; rejected swaps of every kind leave the session untouched. Once
//! the session clears or fails it stops accepting swaps until a restart.

use crate::grid::Grid;
use crate::matches;
use crate::resolve::{self, Resolution, SwapError};
use crate::rng::SimpleRng;
use crate::snapshot::SessionSnapshot;
use crate::types::{ConfigError, LevelConfig, Pos, SessionStatus};

/// A level in play.
#[derive(Debug, Clone)]
pub struct LevelSession {
    config: LevelConfig,
    grid: Grid,
    rng: SimpleRng,
    /// Seed the current board was generated from, as requested.
    seed: u32,
    score: u32,
    moves_left: u32,
    swaps_made: u32,
    /// Starts at 1 and increments on every restart.
    session_id: u32,
    status: SessionStatus,
}

impl LevelSession {
    /// Start a session on a freshly generated board.
    pub fn new(config: LevelConfig, seed: u32) -> Result<Self, ConfigError> {
        let mut rng = SimpleRng::new(seed);
        let grid = Grid::generate(&config, &mut rng)?;
        Ok(Self {
            config,
            grid,
            rng,
            seed,
            score: 0,
            moves_left: config.move_budget,
            swaps_made: 0,
            session_id: 1,
            status: SessionStatus::InProgress,
        })
    }

    /// Start a session on a caller-supplied board. The board is used
    /// as-is; `seed` drives refills only. Intended for replays and
    /// debugging, where the exact layout matters.
    pub fn with_grid(config: LevelConfig, grid: Grid, seed: u32) -> Result<Self, ConfigError> {
        config.validate()?;
        if grid.size() != config.grid_size {
            return Err(ConfigError::GridSizeMismatch {
                config: config.grid_size,
                grid: grid.size(),
            });
        }
        Ok(Self {
            config,
            grid,
            rng: SimpleRng::new(seed),
            seed,
            score: 0,
            moves_left: config.move_budget,
            swaps_made: 0,
            session_id: 1,
            status: SessionStatus::InProgress,
        })
    }

    /// Try to swap the tiles at `a` and `b`.
    ///
    /// A committed swap costs exactly one move and banks the cascade's
    /// total points; a rejected swap costs nothing and changes nothing.
    /// The status check runs first, so finished sessions reject every
    /// attempt with [`SwapError::SessionOver`].
    pub fn attempt_swap(&mut self, a: Pos, b: Pos) -> Result<Resolution, SwapError> {
        if self.status != SessionStatus::InProgress {
            return Err(SwapError::SessionOver);
        }

        let resolution = resolve::attempt_swap(
            &mut self.grid,
            a,
            b,
            self.config.color_count,
            &mut self.rng,
        )?;

        self.moves_left = self.moves_left.saturating_sub(1);
        self.score = self.score.saturating_add(resolution.score_delta);
        self.swaps_made = self.swaps_made.wrapping_add(1);

        // Reaching the target on the final move still clears the level
        if self.score >= self.config.target_score {
            self.status = SessionStatus::Cleared;
        } else if self.moves_left == 0 {
            self.status = SessionStatus::Failed;
        }

        Ok(resolution)
    }

    /// Abandon the current board and start over with a new seed. Level
    /// config is kept; score, moves, and status reset; the session id
    /// increments so observers can spot the reset.
    pub fn restart(&mut self, seed: u32) {
        let next_session = self.session_id.wrapping_add(1);
        // The config was validated when this session was built and never
        // changes afterwards, so regeneration cannot fail.
        if let Ok(mut fresh) = Self::new(self.config, seed) {
            fresh.session_id = next_session;
            *self = fresh;
        }
    }

    /// True while swaps are still being accepted.
    pub fn playable(&self) -> bool {
        self.status == SessionStatus::InProgress
    }

    /// True when no adjacent exchange anywhere on the board would match;
    /// the session is stuck until a restart.
    pub fn is_deadlocked(&self) -> bool {
        let size = self.grid.size();
        let mut probe = self.grid.clone();
        for row in 0..size {
            for col in 0..size {
                let here = Pos::new(row, col);
                for neighbor in [Pos::new(row, col + 1), Pos::new(row + 1, col)] {
                    if neighbor.row >= size || neighbor.col >= size {
                        continue;
                    }
                    probe.swap(here, neighbor);
                    let live = matches::has_live_match(&probe);
                    probe.swap(here, neighbor);
                    if live {
                        return false;
                    }
                }
            }
        }
        true
    }

    pub fn config(&self) -> LevelConfig {
        self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn moves_left(&self) -> u32 {
        self.moves_left
    }

    pub fn swaps_made(&self) -> u32 {
        self.swaps_made
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Copy the whole session into a reusable snapshot buffer.
    pub fn snapshot_into(&self, out: &mut SessionSnapshot) {
        self.grid.write_u8_cells(&mut out.cells);
        out.grid_size = self.config.grid_size;
        out.color_count = self.config.color_count;
        out.score = self.score;
        out.target_score = self.config.target_score;
        out.moves_left = self.moves_left;
        out.move_budget = self.config.move_budget;
        out.swaps_made = self.swaps_made;
        out.session_id = self.session_id;
        out.seed = self.seed;
        out.status = self.status;
    }

    #[cfg(test)]
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }
}
