mod identity_provider;
mod session_store;
mod user_repo;

pub use identity_provider::*;
pub use session_store::*;
pub use user_repo::*;
