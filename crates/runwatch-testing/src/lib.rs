//! Testing infrastructure for runwatch integration tests.
//!
//! - `ScriptedProvider`: in-memory provider that records calls and emits events on demand
//! - `fixtures`: snapshot, phase and output line builders
//! - `assertions`: checks over drained deliveries and CLI JSON output
//! - `TestWorld`: isolated data directory for CLI runs

pub mod assertions;
pub mod fixtures;
pub mod providers;
pub mod world;

pub use fixtures::{PhaseBuilder, SnapshotBuilder};
pub use providers::{Call, ScriptedProvider};
pub use world::TestWorld;
