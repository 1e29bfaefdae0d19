//! User entity and repository
//!
//! Handles user data synchronized from the identity provider. A user row is
//! created on first sign-in together with the user's cart and saved
//! subscriptions list.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{PgStore, StoreError, UserRepository};

/// User entity from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO for creating or refreshing a user
#[derive(Debug, Clone, Deserialize)]
pub struct SyncUser {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

/// User response DTO (excludes internal fields)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    /// User unique identifier
    #[schema(value_type = String, example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    /// User email address
    #[schema(example = "user@example.com")]
    pub email: String,
    /// User display name
    #[schema(example = "Jane Doe")]
    pub name: Option<String>,
    /// Account creation timestamp
    #[schema(value_type = String, example = "2026-01-08T10:00:00Z")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

#[derive(FromRow)]
struct SyncedUserRow {
    #[sqlx(flatten)]
    user: User,
    inserted: bool,
}

impl PgStore {
    /// SQL for upserting a user; `xmax = 0` only holds for freshly inserted rows
    const UPSERT_USER_SQL: &'static str = r#"
        INSERT INTO users (subject, email, name)
        VALUES ($1, $2, $3)
        ON CONFLICT (subject)
        DO UPDATE SET
            email = EXCLUDED.email,
            name = COALESCE(EXCLUDED.name, users.name),
            updated_at = NOW()
        RETURNING id, subject, email, name, created_at, updated_at, (xmax = 0) AS inserted
    "#;
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, subject, email, name, created_at, updated_at
            FROM users
            WHERE subject = $1
            "#,
        )
        .bind(subject)
        .fetch_optional(self.pool())
        .await?;

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, subject, email, name, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(user)
    }

    async fn sync_user(&self, input: SyncUser) -> Result<(User, bool), StoreError> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query_as::<_, SyncedUserRow>(Self::UPSERT_USER_SQL)
            .bind(&input.subject)
            .bind(&input.email)
            .bind(&input.name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| StoreError::from_sqlx(e, "Email address is already registered"))?;

        // Idempotent: existing users already own both rows
        sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(row.user.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO saved_subscriptions (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(row.user.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((row.user, row.inserted))
    }
}
