pub mod criteria;
pub mod domain;
pub mod error;
pub mod event;
mod util;

pub use criteria::RunCriteria;
pub use domain::*;
pub use error::{Error, Result};
pub use event::*;
pub use util::*;
