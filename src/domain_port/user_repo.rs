use crate::domain_model::{User, UserId, UserPatch};

#[derive(Debug, thiserror::Error)]
pub enum UserRepoError {
    #[error("user not found")]
    NotFound,
    #[error("email already registered")]
    AlreadyExists,
    #[error("store error: {0}")]
    Store(String),
}

#[async_trait::async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), UserRepoError>;

    async fn find_by_id(&self, id: UserId) -> Result<User, UserRepoError>;

    async fn find_by_email(&self, email: &str) -> Result<User, UserRepoError>;

    async fn find_all(&self) -> Result<Vec<User>, UserRepoError>;

    /// Apply the non-`None` fields of `patch` and return the updated user.
    async fn update(&self, id: UserId, patch: &UserPatch) -> Result<User, UserRepoError>;

    async fn delete(&self, id: UserId) -> Result<(), UserRepoError>;
}
