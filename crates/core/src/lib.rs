//! Core match-resolution engine - pure, deterministic, and testable
//!
//! This crate holds all the board rules and session bookkeeping. It has
//! **zero dependencies** on networking or I/O, making it:
//!
//! - **Deterministic**: same seed, same board, same refill stream
//! - **Testable**: every rule covered by unit tests, refills scriptable
//! - **Portable**: runs headless, behind a wire adapter, or in a bench
//! - **Fast**: fixed-capacity storage, zero allocation in the swap path
//!
//! # Module Structure
//!
//! - [`grid`]: square tile board with no-initial-match generation
//! - [`matches`]: run detection with set semantics for overlapping runs
//! - [`gravity`]: column collapse and top refill after a clear
//! - [`resolve`]: swap validation and the cascade loop
//! - [`scoring`]: points per cleared round, with the long-run bonus
//! - [`session`]: level lifecycle, move accounting, and restart
//! - [`snapshot`]: heap-free session copy for renderers and adapters
//! - [`rng`]: seeded LCG tile source plus a scripted test double
//!
//! # Board Rules
//!
//! - Runs are three or more same-kind tiles in a row or column
//! - A swap must be between adjacent occupied cells and must create a run,
//!   otherwise it is rejected and the board is restored exactly
//! - An accepted swap clears, collapses, and refills until the board is
//!   stable again; every round's points are banked together
//! - Generated boards are always full and never start with a live run
//!
//! # Example
//!
//! ```
//! use lumina_match_core::session::LevelSession;
//! use lumina_match_types::{LevelConfig, Pos};
//!
//! let config = LevelConfig::default();
//! let mut session = LevelSession::new(config, 12345)?;
//! assert!(session.playable());
//! assert_eq!(session.moves_left(), config.move_budget);
//!
//! // A swap either banks its cascade points or costs nothing
//! match session.attempt_swap(Pos::new(0, 0), Pos::new(0, 1)) {
//!     Ok(resolution) => println!("cleared {} tiles", resolution.tiles_cleared()),
//!     Err(err) => println!("rejected: {}", err.message()),
//! }
//! # Ok::<(), lumina_match_types::ConfigError>(())
//! ```

pub mod gravity;
pub mod grid;
pub mod matches;
pub mod resolve;
pub mod rng;
pub mod scoring;
pub mod session;
pub mod snapshot;

pub use lumina_match_types as types;

// Re-export commonly used types for convenience
pub use grid::Grid;
pub use matches::{find_matches, has_live_match, MatchSet};
pub use resolve::{attempt_swap, Resolution, Round, SwapError};
pub use rng::{ScriptedTiles, SimpleRng, TileSource};
pub use scoring::{round_points, RoundPoints};
pub use session::LevelSession;
pub use snapshot::SessionSnapshot;
