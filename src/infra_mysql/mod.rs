mod user_repo_mysql;
mod util;

pub use user_repo_mysql::*;
