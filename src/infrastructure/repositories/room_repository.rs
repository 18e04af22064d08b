//! Room Repository Implementation
//!
//! `RoomLookup` over the `rooms` and `room_members` tables.

use async_trait::async_trait;
use sqlx::PgPool;

use super::parse_id;
use crate::domain::RoomLookup;
use crate::shared::error::ServiceError;

/// PostgreSQL room membership lookups.
#[derive(Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    /// Create a new PgRoomRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomLookup for PgRoomRepository {
    async fn is_member(&self, room_id: &str, user_id: &str) -> Result<bool, ServiceError> {
        let (Some(room_id), Some(user_id)) = (parse_id(room_id), parse_id(user_id)) else {
            return Ok(false);
        };

        let member = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM room_members
                WHERE room_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(member)
    }

    async fn exists(&self, room_id: &str) -> Result<bool, ServiceError> {
        let Some(room_id) = parse_id(room_id) else {
            return Ok(false);
        };

        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM rooms WHERE id = $1)
            "#,
        )
        .bind(room_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
