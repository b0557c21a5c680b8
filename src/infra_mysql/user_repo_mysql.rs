use super::util::is_dup_key;
use crate::domain_model::{User, UserId, UserPatch};
use crate::domain_port::{UserRepo, UserRepoError};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row};

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }
}

const USER_COLUMNS: &str =
    "user_id, email, password_hash, name, given_name, family_name, picture_url, created_at";

fn row_to_user(row: &sqlx::mysql::MySqlRow) -> User {
    User {
        id: row.get::<UserId, _>("user_id"),
        email: row.get::<String, _>("email"),
        password_hash: row.get::<String, _>("password_hash"),
        name: row.get::<String, _>("name"),
        given_name: row.get::<String, _>("given_name"),
        family_name: row.get::<String, _>("family_name"),
        picture_url: row.get::<String, _>("picture_url"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn create(&self, user: &User) -> Result<(), UserRepoError> {
        let result = sqlx::query(
            r#"
INSERT INTO user (user_id, email, password_hash, name, given_name, family_name, picture_url, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.given_name)
        .bind(&user.family_name)
        .bind(&user.picture_url)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_dup_key(&e) => Err(UserRepoError::AlreadyExists),
            Err(e) => Err(UserRepoError::Store(e.to_string())),
        }
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, UserRepoError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM user WHERE user_id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| UserRepoError::Store(format!("query user by id: {e}")))?;

        row.as_ref().map(row_to_user).ok_or(UserRepoError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, UserRepoError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM user WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| UserRepoError::Store(format!("query user by email: {e}")))?;

        row.as_ref().map(row_to_user).ok_or(UserRepoError::NotFound)
    }

    async fn find_all(&self) -> Result<Vec<User>, UserRepoError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM user ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| UserRepoError::Store(format!("query users: {e}")))?;

        Ok(rows.iter().map(row_to_user).collect())
    }

    async fn update(&self, id: UserId, patch: &UserPatch) -> Result<User, UserRepoError> {
        if !patch.is_empty() {
            let mut sets = Vec::new();
            if patch.name.is_some() {
                sets.push("name = ?");
            }
            if patch.given_name.is_some() {
                sets.push("given_name = ?");
            }
            if patch.family_name.is_some() {
                sets.push("family_name = ?");
            }
            if patch.picture_url.is_some() {
                sets.push("picture_url = ?");
            }
            let sql = format!("UPDATE user SET {} WHERE user_id = ?", sets.join(", "));

            let mut query = sqlx::query(&sql);
            for value in [
                &patch.name,
                &patch.given_name,
                &patch.family_name,
                &patch.picture_url,
            ]
            .into_iter()
            .flatten()
            {
                query = query.bind(value);
            }
            // rows_affected is 0 both for a missing row and for a no-op
            // write, so existence is settled by the read-back below.
            query
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| UserRepoError::Store(format!("update user: {e}")))?;
        }

        self.find_by_id(id).await
    }

    async fn delete(&self, id: UserId) -> Result<(), UserRepoError> {
        let result = sqlx::query("DELETE FROM user WHERE user_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| UserRepoError::Store(format!("delete user: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(UserRepoError::NotFound);
        }
        Ok(())
    }
}
