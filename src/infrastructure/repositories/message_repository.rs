//! Message Repository Implementation
//!
//! `MessageStore` inserting into the `messages` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::parse_id;
use crate::domain::{Message, MessageStore};
use crate::shared::error::ServiceError;

/// Database row representation of a stored message.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: String,
    room_id: String,
    user_id: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            room_id: row.room_id,
            user_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL message store.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageRepository {
    async fn create(
        &self,
        user_id: &str,
        room_id: &str,
        content: &str,
    ) -> Result<Message, ServiceError> {
        let not_found = || ServiceError::NotFound(format!("room {} or user {}", room_id, user_id));
        let (Some(room), Some(user)) = (parse_id(room_id), parse_id(user_id)) else {
            return Err(not_found());
        };

        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (room_id, user_id, content)
            SELECT r.id, u.id, $3
            FROM rooms r, users u
            WHERE r.id = $1 AND u.id = $2
            RETURNING id::text AS id, room_id::text AS room_id, user_id::text AS user_id,
                      content, created_at, updated_at
            "#,
        )
        .bind(room)
        .bind(user)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Message::from).ok_or_else(not_found)
    }
}
