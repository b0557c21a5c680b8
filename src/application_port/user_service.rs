use crate::application_port::AuthError;
use crate::domain_model::{User, UserId, UserPatch};

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<User, AuthError>;

    async fn find_all(&self) -> Result<Vec<User>, AuthError>;

    async fn update(&self, id: UserId, patch: &UserPatch) -> Result<User, AuthError>;

    async fn delete(&self, id: UserId) -> Result<(), AuthError>;
}
