//! User Repository Implementation
//!
//! `UserLookup` over the `users` table.

use async_trait::async_trait;
use sqlx::PgPool;

use super::parse_id;
use crate::domain::{UserLookup, UserProfile};
use crate::shared::error::ServiceError;

/// Database row representation of the public user columns.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: Option<String>,
}

impl UserRow {
    fn into_profile(self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username,
            email: self.email,
        }
    }
}

/// PostgreSQL user lookups.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserLookup for PgUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserProfile>, ServiceError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id::text AS id, username, email
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_profile))
    }
}
