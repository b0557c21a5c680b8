mod cookie;
mod error;
mod handler;
mod router;

pub use cookie::*;
pub use error::recover_error;
pub use router::routes;
