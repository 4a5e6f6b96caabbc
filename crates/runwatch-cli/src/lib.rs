mod args;
mod commands;
mod context;
mod handlers;
mod logging;
pub mod presentation;
pub mod simulation;
pub mod types;

pub use args::{Cli, Commands};
pub use commands::run;
