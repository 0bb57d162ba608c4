//! Subscription Repository

use super::{RepoError, RepoResult};
use crate::utils::time::parse_time_of_day;
use shared::models::{DEFAULT_NOTIFICATION_TIME, Subscription, SubscriptionCreate};
use sqlx::SqlitePool;

/// All subscriptions in insertion order
pub async fn find_all<'e, E>(executor: E) -> RepoResult<Vec<Subscription>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let rows = sqlx::query_as::<_, Subscription>(
        "SELECT id, name, phone, product_type, plan, value, expiry_date, notification_time, custom_message, status, created_at, updated_at, last_notification_sent FROM subscription ORDER BY id",
    )
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Subscription>> {
    let row = sqlx::query_as::<_, Subscription>(
        "SELECT id, name, phone, product_type, plan, value, expiry_date, notification_time, custom_message, status, created_at, updated_at, last_notification_sent FROM subscription WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: SubscriptionCreate) -> RepoResult<Subscription> {
    if data.name.trim().is_empty() {
        return Err(RepoError::Validation("name must not be empty".into()));
    }
    if !data.value.is_finite() || data.value < 0.0 {
        return Err(RepoError::Validation(format!(
            "value must be a non-negative number, got {}",
            data.value
        )));
    }
    let notification_time = data
        .notification_time
        .unwrap_or_else(|| DEFAULT_NOTIFICATION_TIME.to_string());
    if parse_time_of_day(&notification_time).is_err() {
        return Err(RepoError::Validation(format!(
            "notification_time must be HH:MM, got {notification_time}"
        )));
    }

    let now = shared::util::now_millis();
    let id = sqlx::query(
        "INSERT INTO subscription (name, phone, product_type, plan, value, expiry_date, notification_time, custom_message, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
    )
    .bind(&data.name)
    .bind(&data.phone)
    .bind(data.product_type)
    .bind(&data.plan)
    .bind(data.value)
    .bind(data.expiry_date)
    .bind(&notification_time)
    .bind(&data.custom_message)
    .bind(data.status.unwrap_or_default())
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create subscription".into()))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM subscription WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}
