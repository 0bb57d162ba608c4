//! Record source: read side of the record store as seen by the snapshot

use async_trait::async_trait;
use shared::models::{MessageLog, NotifierConfig, Subscription};
use sqlx::SqlitePool;

use crate::db::repository::{RepoResult, message_log, notifier_config, subscription};

/// Everything a snapshot copies out of the record store
#[derive(Debug, Clone)]
pub struct SourceRecords {
    /// Capture order
    pub subscriptions: Vec<Subscription>,
    pub config: NotifierConfig,
    /// Newest first
    pub message_logs: Vec<MessageLog>,
}

/// Read access to subscription and configuration records
///
/// Implementations never write back, except for lazily creating the
/// configuration singleton.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn read_records(&self, log_limit: usize) -> RepoResult<SourceRecords>;
}

/// SQLite-backed source
#[derive(Clone)]
pub struct SqliteRecordSource {
    pool: SqlitePool,
}

impl SqliteRecordSource {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSource for SqliteRecordSource {
    async fn read_records(&self, log_limit: usize) -> RepoResult<SourceRecords> {
        // 单例配置可能需要先写入，放在只读事务之外
        notifier_config::get_or_create(&self.pool).await?;

        // One transaction so all three reads see the same database state
        let mut tx = self.pool.begin().await?;
        let subscriptions = subscription::find_all(&mut *tx).await?;
        let config = notifier_config::get(&mut *tx).await?.ok_or_else(|| {
            crate::db::repository::RepoError::NotFound("notifier config".into())
        })?;
        let message_logs = message_log::find_recent(&mut *tx, log_limit).await?;
        tx.commit().await?;

        Ok(SourceRecords {
            subscriptions,
            config,
            message_logs,
        })
    }
}
