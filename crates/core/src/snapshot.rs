use crate::types::{SessionStatus, MAX_GRID_SIZE};

/// Heap-free copy of everything a wire adapter or renderer needs to show
/// a session. Hosts keep one and overwrite it in place each observation,
/// so the hot path never allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionSnapshot {
    /// Board cells, 0 = empty, 1..=7 = tile kind index + 1. Rows past
    /// `grid_size` are zero.
    pub cells: [[u8; MAX_GRID_SIZE as usize]; MAX_GRID_SIZE as usize],
    pub grid_size: u8,
    pub color_count: u8,
    pub score: u32,
    pub target_score: u32,
    pub moves_left: u32,
    pub move_budget: u32,
    pub swaps_made: u32,
    /// Increments every restart; lets observers spot a board reset.
    pub session_id: u32,
    pub seed: u32,
    pub status: SessionStatus,
}

impl SessionSnapshot {
    pub fn clear(&mut self) {
        self.cells = [[0u8; MAX_GRID_SIZE as usize]; MAX_GRID_SIZE as usize];
        self.grid_size = 0;
        self.color_count = 0;
        self.score = 0;
        self.target_score = 0;
        self.moves_left = 0;
        self.move_budget = 0;
        self.swaps_made = 0;
        self.session_id = 0;
        self.seed = 0;
        self.status = SessionStatus::InProgress;
    }

    pub fn playable(&self) -> bool {
        self.status == SessionStatus::InProgress
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        let mut snapshot = Self {
            cells: [[0u8; MAX_GRID_SIZE as usize]; MAX_GRID_SIZE as usize],
            grid_size: 0,
            color_count: 0,
            score: 0,
            target_score: 0,
            moves_left: 0,
            move_budget: 0,
            swaps_made: 0,
            session_id: 0,
            seed: 0,
            status: SessionStatus::InProgress,
        };
        snapshot.clear();
        snapshot
    }
}
