//! Emergence Core - Entity types, clocks, and error handling

pub mod clock;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use types::*;
