use std::sync::Arc;

use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::backup::{
    BackupJob, BackupSynchronizer, Clock, GitHubFileStore, RemoteFileStore, SqliteRecordSource,
    StateSnapshot, SyncHandle, SyncScheduler, SyncTrigger, SystemClock,
};
use crate::core::Config;
use crate::db::DbService;
use crate::utils::{AppError, AppResult};

/// 服务器状态 - 持有所有服务的共享引用
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | 记录存储 |
/// | backup | SyncHandle | 备份调度器句柄 |
///
/// 所有字段都是浅拷贝 (Arc / channel handle)，可以直接作为 axum State。
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub pool: SqlitePool,
    pub backup: SyncHandle,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 打开数据库、构建远端存储客户端和备份调度器。返回的
    /// [`SyncScheduler`] 需要由调用方注册为后台任务。
    ///
    /// 远端凭证缺失不是错误：调度器以禁用模式运行。
    pub async fn initialize(
        config: &Config,
        shutdown: CancellationToken,
    ) -> AppResult<(Self, SyncScheduler)> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::internal(format!("Failed to create work dir: {e}")))?;

        let db_path = config.database_path();
        let db = DbService::new(&db_path.to_string_lossy()).await?;

        let remote: Option<Arc<dyn RemoteFileStore>> = match config.backup.remote_settings() {
            Ok(settings) => {
                tracing::info!(
                    repo = %settings.repo,
                    branch = %settings.branch,
                    "Backup remote configured"
                );
                let store = GitHubFileStore::new(settings)
                    .map_err(|e| AppError::internal(e.to_string()))?;
                Some(Arc::new(store))
            }
            Err(e) => {
                tracing::warn!("{e}; backup synchronizer disabled");
                None
            }
        };

        Ok(Self::assemble(
            config.clone(),
            db.pool,
            remote,
            Arc::new(SystemClock),
            shutdown,
        ))
    }

    /// 用已有组件组装状态 (测试可注入内存远端和固定时钟)
    pub fn assemble(
        config: Config,
        pool: SqlitePool,
        remote: Option<Arc<dyn RemoteFileStore>>,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> (Self, SyncScheduler) {
        let policy = config.backup.schedule_policy();

        let job = remote.map(|remote| {
            let snapshot = StateSnapshot::new(
                Arc::new(SqliteRecordSource::new(pool.clone())),
                policy.timezone,
                config.backup.message_log_limit,
            );
            let synchronizer = BackupSynchronizer::new(remote, config.backup.sync_options());
            BackupJob::new(snapshot, synchronizer)
        });

        let (scheduler, backup) = SyncScheduler::new(job, policy, clock, shutdown);
        let state = Self {
            config,
            pool,
            backup,
        };
        (state, scheduler)
    }

    /// 数据变更完成后调用：请求一次备份 (fire-and-forget)
    pub fn notify_mutation(&self) {
        self.backup.request_run(SyncTrigger::Mutation);
    }
}
