//! Notifier Config Repository (Singleton)

use super::{RepoError, RepoResult};
use shared::models::{NotifierConfig, NotifierConfigUpdate};
use sqlx::SqlitePool;

const SINGLETON_ID: i64 = 1;

pub async fn get_or_create(pool: &SqlitePool) -> RepoResult<NotifierConfig> {
    if let Some(config) = get(pool).await? {
        return Ok(config);
    }

    let now = shared::util::now_millis();
    let defaults = NotifierConfig::with_defaults(SINGLETON_ID, now);
    sqlx::query(
        "INSERT OR IGNORE INTO notifier_config (id, connection_status, auto_send_enabled, working_hours_start, working_hours_end, message_interval_seconds, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
    )
    .bind(SINGLETON_ID)
    .bind(&defaults.connection_status)
    .bind(defaults.auto_send_enabled)
    .bind(&defaults.working_hours_start)
    .bind(&defaults.working_hours_end)
    .bind(defaults.message_interval_seconds)
    .bind(now)
    .execute(pool)
    .await?;

    get(pool)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create notifier config".into()))
}

pub async fn get<'e, E>(executor: E) -> RepoResult<Option<NotifierConfig>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let config = sqlx::query_as::<_, NotifierConfig>(
        "SELECT id, connection_status, qr_code, session_data, auto_send_enabled, working_hours_start, working_hours_end, message_interval_seconds, last_connected, last_disconnected, created_at, updated_at FROM notifier_config WHERE id = ?",
    )
    .bind(SINGLETON_ID)
    .fetch_optional(executor)
    .await?;
    Ok(config)
}

pub async fn update(pool: &SqlitePool, data: NotifierConfigUpdate) -> RepoResult<NotifierConfig> {
    get_or_create(pool).await?;
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE notifier_config SET connection_status = COALESCE(?1, connection_status), qr_code = COALESCE(?2, qr_code), session_data = COALESCE(?3, session_data), auto_send_enabled = COALESCE(?4, auto_send_enabled), working_hours_start = COALESCE(?5, working_hours_start), working_hours_end = COALESCE(?6, working_hours_end), message_interval_seconds = COALESCE(?7, message_interval_seconds), updated_at = ?8 WHERE id = ?9",
    )
    .bind(&data.connection_status)
    .bind(&data.qr_code)
    .bind(&data.session_data)
    .bind(data.auto_send_enabled)
    .bind(&data.working_hours_start)
    .bind(&data.working_hours_end)
    .bind(data.message_interval_seconds)
    .bind(now)
    .bind(SINGLETON_ID)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::Database("Failed to update notifier config".into()));
    }
    get(pool)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to read notifier config after update".into()))
}
