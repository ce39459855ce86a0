//! Credential store: account creation and login verification.

use super::DbError;
use crate::security::{password, policy};
use sqlx::SqlitePool;

/// A registered account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: i64,
}

/// Repository for account operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new account.
    ///
    /// Policy runs before hashing, so a rejected attempt never persists a
    /// row. Uniqueness is the INSERT's UNIQUE constraint; two concurrent
    /// registrations of the same name cannot both succeed.
    pub async fn create_user(&self, username: &str, password: &str) -> Result<User, DbError> {
        policy::validate_username(username)?;
        policy::validate_password(password)?;

        let password_hash = password::hash(password).map_err(|_| DbError::Hash)?;
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return DbError::UserExists(username.to_string());
            }
            DbError::from(e)
        })?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            created_at: now,
        })
    }

    /// Verify a login attempt and return the account if the password matches.
    pub async fn verify(&self, username: &str, password: &str) -> Result<User, DbError> {
        let row = sqlx::query_as::<_, (i64, String, i64)>(
            r#"
            SELECT id, password_hash, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        let Some((id, password_hash, created_at)) = row else {
            // Unknown user still burns a full verification so the miss is
            // not observable through response timing.
            password::burn_verification(password);
            return Err(DbError::UserNotFound(username.to_string()));
        };

        // An unparsable stored hash counts as a failed check.
        if !password::verify(password, &password_hash).unwrap_or(false) {
            return Err(DbError::BadCredentials);
        }

        Ok(User {
            id,
            username: username.to_string(),
            created_at,
        })
    }
}
