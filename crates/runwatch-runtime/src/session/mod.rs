//! Per-screen controllers.
//!
//! Each session owns its bridge and subscription for the lifetime of one
//! screen and is only touched from the render loop.

mod board;
mod dashboard;
mod instance;
mod selector;
mod tables;

pub use board::{BoardOptions, EndedPolicy, RunBoard};
pub use dashboard::{DashboardSession, DashboardSummary};
pub use instance::{Banner, InstanceSession, Notice, ScreenState};
pub use selector::{SelectorMode, SelectorSession};
pub use tables::RunTables;
