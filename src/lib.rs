//! Lumina Match (workspace facade crate).
//!
//! This package keeps the `lumina_match::{core,adapter,types}` public API
//! stable while the implementation lives in dedicated crates under `crates/`.

pub use lumina_match_adapter as adapter;
pub use lumina_match_core as core;
pub use lumina_match_types as types;
