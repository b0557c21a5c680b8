use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(pub uuid::Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(UserId)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// PHC-format argon2 hash; empty for identities created via an OAuth
    /// provider (they have no local password).
    pub password_hash: String,
    pub name: String,
    pub given_name: String,
    pub family_name: String,
    pub picture_url: String,
    pub created_at: DateTime<Utc>,
}

/// Typed partial update for a user's mutable profile fields. `None` leaves
/// the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture_url: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.given_name.is_none()
            && self.family_name.is_none()
            && self.picture_url.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(given_name) = &self.given_name {
            user.given_name = given_name.clone();
        }
        if let Some(family_name) = &self.family_name {
            user.family_name = family_name.clone();
        }
        if let Some(picture_url) = &self.picture_url {
            user.picture_url = picture_url.clone();
        }
    }
}
