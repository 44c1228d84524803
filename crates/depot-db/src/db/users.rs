//! User account repository. Plain registration only; authentication is an
//! external collaborator.

use depot_core::models::UserAccount;
use depot_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserAccount, AppError> {
        let user = sqlx::query_as::<_, UserAccount>(
            "INSERT INTO users (id, username, email, password_hash) VALUES ($1, $2, $3, $4) \
             RETURNING id, username, email, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let unique = e
                .as_database_error()
                .map(|d| d.kind() == sqlx::error::ErrorKind::UniqueViolation)
                .unwrap_or(false);
            if unique {
                AppError::BadRequest("Username or email already taken".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(user)
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Option<UserAccount>, AppError> {
        let user = sqlx::query_as::<_, UserAccount>(
            "SELECT id, username, email, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
