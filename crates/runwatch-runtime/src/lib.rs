//! Event-driven state synchronization between job providers and a
//! single-threaded render loop.

pub mod bridge;
pub mod config;
pub mod error;
pub mod navigator;
pub mod output;
pub mod provider;
pub mod reconcile;
pub mod session;
pub mod subscription;

pub use bridge::{BridgeStats, Closed, Delivery, EventBridge, Publisher, SubscriptionToken};
pub use config::{Config, SimulationConfig, resolve_data_dir};
pub use error::{Error, Result};
pub use navigator::{Direction, LinkedNavigator, Position, TableId};
pub use output::OutputBuffer;
pub use provider::{InstanceTarget, ListenerId, Provider, Scope};
pub use reconcile::{PhaseRow, PhaseViewState, reconcile};
pub use session::{
    DashboardSession, DashboardSummary, InstanceSession, RunBoard, RunTables, ScreenState,
    SelectorMode, SelectorSession,
};
pub use subscription::Subscription;
