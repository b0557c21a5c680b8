use crate::application_port::{AuthError, UserService};
use crate::domain_model::{User, UserId, UserPatch};
use crate::domain_port::{UserRepo, UserRepoError};
use std::sync::Arc;

pub struct RealUserService {
    user_repo: Arc<dyn UserRepo>,
}

impl RealUserService {
    pub fn new(user_repo: Arc<dyn UserRepo>) -> Self {
        Self { user_repo }
    }

    fn map_err(e: UserRepoError) -> AuthError {
        match e {
            UserRepoError::NotFound => AuthError::UserNotFound,
            UserRepoError::AlreadyExists => AuthError::EmailTaken,
            UserRepoError::Store(e) => AuthError::Store(e),
        }
    }
}

#[async_trait::async_trait]
impl UserService for RealUserService {
    async fn find_by_id(&self, id: UserId) -> Result<User, AuthError> {
        self.user_repo.find_by_id(id).await.map_err(Self::map_err)
    }

    async fn find_all(&self) -> Result<Vec<User>, AuthError> {
        self.user_repo.find_all().await.map_err(Self::map_err)
    }

    async fn update(&self, id: UserId, patch: &UserPatch) -> Result<User, AuthError> {
        if patch.is_empty() {
            return Err(AuthError::InvalidData("empty update".to_string()));
        }
        self.user_repo
            .update(id, patch)
            .await
            .map_err(Self::map_err)
    }

    async fn delete(&self, id: UserId) -> Result<(), AuthError> {
        self.user_repo.delete(id).await.map_err(Self::map_err)
    }
}
