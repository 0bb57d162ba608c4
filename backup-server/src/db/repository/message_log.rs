//! Message Log Repository

use super::{RepoError, RepoResult};
use shared::models::{MessageLog, MessageLogCreate, MessageStatus};
use sqlx::SqlitePool;

pub async fn append(pool: &SqlitePool, data: MessageLogCreate) -> RepoResult<MessageLog> {
    let now = shared::util::now_millis();
    let sent_at = (data.status == MessageStatus::Sent).then_some(now);
    let id = sqlx::query(
        "INSERT INTO message_log (client_id, phone, message_content, status, sent_at, error_message, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(data.client_id)
    .bind(&data.phone)
    .bind(&data.message_content)
    .bind(data.status)
    .bind(sent_at)
    .bind(&data.error_message)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    sqlx::query_as::<_, MessageLog>(
        "SELECT id, client_id, phone, message_content, status, sent_at, error_message, provider_message_id, created_at FROM message_log WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| RepoError::Database("Failed to append message log".into()))
}

/// Most recent logs first, at most `limit`
pub async fn find_recent<'e, E>(executor: E, limit: usize) -> RepoResult<Vec<MessageLog>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = sqlx::query_as::<_, MessageLog>(
        "SELECT id, client_id, phone, message_content, status, sent_at, error_message, provider_message_id, created_at FROM message_log ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}
