mod auth_service_impl;
mod password_hasher;
mod token_minter_impl;
mod user_service_impl;

pub use auth_service_impl::*;
pub use password_hasher::*;
pub use token_minter_impl::*;
pub use user_service_impl::*;
