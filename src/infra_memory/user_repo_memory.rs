use crate::domain_model::{User, UserId, UserPatch};
use crate::domain_port::{UserRepo, UserRepoError};
use dashmap::DashMap;

/// In-memory `UserRepo` for tests and the `memory` backend.
#[derive(Default)]
pub struct MemoryUserRepo {
    users: DashMap<UserId, User>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, user: &User) -> Result<(), UserRepoError> {
        if self.users.iter().any(|u| u.email == user.email) {
            return Err(UserRepoError::AlreadyExists);
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, UserRepoError> {
        self.users
            .get(&id)
            .map(|u| u.clone())
            .ok_or(UserRepoError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, UserRepoError> {
        self.users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.clone())
            .ok_or(UserRepoError::NotFound)
    }

    async fn find_all(&self) -> Result<Vec<User>, UserRepoError> {
        Ok(self.users.iter().map(|u| u.clone()).collect())
    }

    async fn update(&self, id: UserId, patch: &UserPatch) -> Result<User, UserRepoError> {
        let mut user = self.users.get_mut(&id).ok_or(UserRepoError::NotFound)?;
        patch.apply(&mut user);
        Ok(user.clone())
    }

    async fn delete(&self, id: UserId) -> Result<(), UserRepoError> {
        self.users.remove(&id).ok_or(UserRepoError::NotFound)?;
        Ok(())
    }
}
