//! # Presentation Layer
//!
//! ```text
//! [ Handler ] --> [ Presenter ] --> [ ViewModel ] --> [ Renderer ]
//!  (sessions)      (converter)        (raw data)      console / tui
//! ```
//!
//! View models carry raw values (seconds, timestamps, enums). Formatting and
//! colors are decided by the renderers, using the [`theme::Theme`] handed to
//! them.

pub mod presenters;
pub mod renderers;
pub mod theme;
pub mod view_models;
