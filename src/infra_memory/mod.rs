mod identity_provider_fake;
mod session_store_memory;
mod user_repo_memory;

pub use identity_provider_fake::*;
pub use session_store_memory::*;
pub use user_repo_memory::*;
