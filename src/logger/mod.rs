//! Bootstrap logging with a reloadable filter. See `bin/logger_demo.rs`
//! for a test binary demonstrating the bootstrap/reload cycle.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
