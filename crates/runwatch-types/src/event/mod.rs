mod event;
mod output;

pub use event::Event;
pub use output::{OutputLine, RawOutputLine};
