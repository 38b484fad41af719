//! Shared types module - data structures and constants for the match engine
//!
//! This module defines the fundamental types used throughout the application.
//! All types are pure data structures with no external dependencies, making
//! them usable in any context (core logic, automation protocol, tooling).
//!
//! # Grid Dimensions
//!
//! Boards are square, `grid_size × grid_size`, row-major with row 0 at the
//! top. Gravity packs tiles toward the bottom (highest row index).
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `MIN_GRID_SIZE` | 3 | Smallest board a run of 3 fits on |
//! | `MAX_GRID_SIZE` | 10 | Largest supported board |
//! | `MIN_COLOR_COUNT` | 3 | Fewest kinds the generator can satisfy |
//! | `MAX_COLOR_COUNT` | 7 | Size of the tile palette |
//! | `MIN_RUN_LEN` | 3 | Shortest sequence that counts as a match |
//!
//! # Scoring Constants
//!
//! A cleared round of `n` tiles scores
//! `n * MATCH_TILE_POINTS + max(0, n - MIN_RUN_LEN) * EXTRA_TILE_BONUS`:
//! a flat per-tile reward plus an escalating bonus for rounds larger than
//! the minimum three tiles (long runs and L-shaped intersections).
//!
//! # Examples
//!
//! ```
//! use lumina_match_types::{LevelConfig, Pos, TileKind, MAX_COLOR_COUNT};
//!
//! // Tile kinds round-trip through indices and names
//! let kind = TileKind::Emerald;
//! assert_eq!(TileKind::from_index(kind.index()), Some(kind));
//! assert_eq!(TileKind::from_str("emerald"), Some(kind));
//! assert_eq!(TileKind::ALL.len(), MAX_COLOR_COUNT as usize);
//!
//! // Positions know 4-directional adjacency
//! let a = Pos::new(2, 2);
//! assert!(a.is_adjacent(Pos::new(2, 3)));
//! assert!(!a.is_adjacent(Pos::new(3, 3)));
//!
//! // Level parameters validate their ranges
//! let config = LevelConfig::new(6, 3, 1000, 15);
//! assert!(config.validate().is_ok());
//! ```

/// Smallest supported board edge (a run of 3 must fit).
pub const MIN_GRID_SIZE: u8 = 3;

/// Largest supported board edge.
pub const MAX_GRID_SIZE: u8 = 10;

/// Fewest tile kinds for which no-initial-match generation is satisfiable.
pub const MIN_COLOR_COUNT: u8 = 3;

/// Size of the tile palette; `color_count` may not exceed this.
pub const MAX_COLOR_COUNT: u8 = 7;

/// Cell capacity of the largest supported board.
pub const MAX_CELLS: usize = (MAX_GRID_SIZE as usize) * (MAX_GRID_SIZE as usize);

/// Shortest horizontal or vertical sequence that counts as a match.
pub const MIN_RUN_LEN: usize = 3;

/// Points awarded per matched tile in a round.
pub const MATCH_TILE_POINTS: u32 = 10;

/// Bonus points per matched tile beyond the first three in a round.
pub const EXTRA_TILE_BONUS: u32 = 20;

/// The seven tile kinds (gem colors).
///
/// Levels use a prefix of the palette: a `color_count` of `n` draws from the
/// first `n` entries of [`TileKind::ALL`]. Kind order is load-bearing for
/// deterministic seeds and for the wire encoding (index + 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TileKind {
    Ruby,
    Amber,
    Citrine,
    Emerald,
    Sapphire,
    Amethyst,
    Pearl,
}

impl TileKind {
    /// Every kind, in palette order.
    pub const ALL: [TileKind; MAX_COLOR_COUNT as usize] = [
        TileKind::Ruby,
        TileKind::Amber,
        TileKind::Citrine,
        TileKind::Emerald,
        TileKind::Sapphire,
        TileKind::Amethyst,
        TileKind::Pearl,
    ];

    /// Palette index of this kind (0-based).
    ///
    /// # Examples
    ///
    /// ```
    /// use lumina_match_types::TileKind;
    ///
    /// assert_eq!(TileKind::Ruby.index(), 0);
    /// assert_eq!(TileKind::Pearl.index(), 6);
    /// ```
    pub fn index(&self) -> u8 {
        match self {
            TileKind::Ruby => 0,
            TileKind::Amber => 1,
            TileKind::Citrine => 2,
            TileKind::Emerald => 3,
            TileKind::Sapphire => 4,
            TileKind::Amethyst => 5,
            TileKind::Pearl => 6,
        }
    }

    /// Kind at a palette index, `None` if out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumina_match_types::TileKind;
    ///
    /// assert_eq!(TileKind::from_index(0), Some(TileKind::Ruby));
    /// assert_eq!(TileKind::from_index(7), None);
    /// ```
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Parse a kind from its name (case-insensitive).
    ///
    /// # Examples
    ///
    /// ```
    /// use lumina_match_types::TileKind;
    ///
    /// assert_eq!(TileKind::from_str("ruby"), Some(TileKind::Ruby));
    /// assert_eq!(TileKind::from_str("Sapphire"), Some(TileKind::Sapphire));
    /// assert_eq!(TileKind::from_str("quartz"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ruby" => Some(TileKind::Ruby),
            "amber" => Some(TileKind::Amber),
            "citrine" => Some(TileKind::Citrine),
            "emerald" => Some(TileKind::Emerald),
            "sapphire" => Some(TileKind::Sapphire),
            "amethyst" => Some(TileKind::Amethyst),
            "pearl" => Some(TileKind::Pearl),
            _ => None,
        }
    }

    /// Lowercase name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TileKind::Ruby => "ruby",
            TileKind::Amber => "amber",
            TileKind::Citrine => "citrine",
            TileKind::Emerald => "emerald",
            TileKind::Sapphire => "sapphire",
            TileKind::Amethyst => "amethyst",
            TileKind::Pearl => "pearl",
        }
    }
}

/// A cell on the grid
///
/// - `None`: empty cell (legal only transiently, mid-resolution)
/// - `Some(TileKind)`: cell occupied by a tile of the given kind
///
/// Used internally by the grid as a flat array of cells.
pub type Cell = Option<TileKind>;

/// A position on the grid, row-major, row 0 at the top.
///
/// Ordering is row-major (row first, then column), so sorting a list of
/// positions yields scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub row: u8,
    pub col: u8,
}

impl Pos {
    pub fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// True when `other` is exactly one cell away horizontally or vertically.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumina_match_types::Pos;
    ///
    /// assert!(Pos::new(1, 1).is_adjacent(Pos::new(0, 1)));
    /// assert!(Pos::new(1, 1).is_adjacent(Pos::new(1, 2)));
    /// assert!(!Pos::new(1, 1).is_adjacent(Pos::new(2, 2))); // diagonal
    /// assert!(!Pos::new(1, 1).is_adjacent(Pos::new(1, 1))); // same cell
    /// ```
    pub fn is_adjacent(&self, other: Pos) -> bool {
        let dr = (self.row as i16 - other.row as i16).abs();
        let dc = (self.col as i16 - other.col as i16).abs();
        dr + dc == 1
    }
}

/// Per-level parameters, immutable for the life of a level.
///
/// Read-only input to grid generation and the session; the engine never
/// mutates a config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelConfig {
    /// Board edge length (`MIN_GRID_SIZE..=MAX_GRID_SIZE`).
    pub grid_size: u8,
    /// Number of tile kinds in play (`MIN_COLOR_COUNT..=MAX_COLOR_COUNT`).
    pub color_count: u8,
    /// Score at which the level is cleared.
    pub target_score: u32,
    /// Number of committed swaps the player may spend.
    pub move_budget: u32,
}

impl LevelConfig {
    pub fn new(grid_size: u8, color_count: u8, target_score: u32, move_budget: u32) -> Self {
        Self {
            grid_size,
            color_count,
            target_score,
            move_budget,
        }
    }

    /// Check the range constraints that grid generation depends on.
    ///
    /// A `color_count` below 3 can make the no-initial-match constraint
    /// unsatisfiable (the sampler would loop), so malformed configs are
    /// rejected here, before any generation runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size < MIN_GRID_SIZE || self.grid_size > MAX_GRID_SIZE {
            return Err(ConfigError::GridSizeOutOfRange(self.grid_size));
        }
        if self.color_count < MIN_COLOR_COUNT || self.color_count > MAX_COLOR_COUNT {
            return Err(ConfigError::ColorCountOutOfRange(self.color_count));
        }
        Ok(())
    }
}

impl Default for LevelConfig {
    /// A small starter level: 6×6 board, 3 kinds, 1000 points in 15 moves.
    fn default() -> Self {
        Self::new(6, 3, 1000, 15)
    }
}

/// Fatal configuration errors, raised before a session or grid exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `grid_size` outside `MIN_GRID_SIZE..=MAX_GRID_SIZE`.
    GridSizeOutOfRange(u8),
    /// `color_count` outside `MIN_COLOR_COUNT..=MAX_COLOR_COUNT`.
    ColorCountOutOfRange(u8),
    /// A pre-built grid does not match the config's `grid_size`.
    GridSizeMismatch { config: u8, grid: u8 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::GridSizeOutOfRange(size) => write!(
                f,
                "grid_size {} outside supported range {}..={}",
                size, MIN_GRID_SIZE, MAX_GRID_SIZE
            ),
            ConfigError::ColorCountOutOfRange(count) => write!(
                f,
                "color_count {} outside supported range {}..={}",
                count, MIN_COLOR_COUNT, MAX_COLOR_COUNT
            ),
            ConfigError::GridSizeMismatch { config, grid } => write!(
                f,
                "grid size {} does not match configured grid_size {}",
                grid, config
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Lifecycle state of a level session.
///
/// Terminal states are absorbing: once a session is `Cleared` or `Failed`,
/// further swaps are rejected until a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Swaps are accepted; neither end condition has been reached.
    InProgress,
    /// The score reached the target within the move budget.
    Cleared,
    /// The move budget ran out before the target was reached.
    Failed,
}

impl SessionStatus {
    /// Wire/name form, snake_case.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Cleared => "cleared",
            SessionStatus::Failed => "failed",
        }
    }

    /// Parse from the snake_case name (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "in_progress" => Some(SessionStatus::InProgress),
            "cleared" => Some(SessionStatus::Cleared),
            "failed" => Some(SessionStatus::Failed),
            _ => None,
        }
    }
}
