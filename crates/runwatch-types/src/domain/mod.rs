pub mod instance;
pub mod lifecycle;
pub mod phase;
pub mod snapshot;

pub use instance::*;
pub use lifecycle::*;
pub use phase::*;
pub use snapshot::*;
