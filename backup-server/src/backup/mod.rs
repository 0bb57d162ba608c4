//! Backup synchronization
//!
//! - [`StateSnapshot`] - 从记录存储生成不可变快照
//! - [`RemoteFileStore`] - 远端版本化文件存储 (GitHub contents API)
//! - [`BackupSynchronizer`] - 单次同步：渲染文件并逐个 upsert
//! - [`SyncScheduler`] - 后台 actor：定时、每日、变更触发，合并并发请求

pub mod clock;
pub mod error;
pub mod remote;
pub mod render;
pub mod scheduler;
pub mod snapshot;
pub mod source;
pub mod synchronizer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{RemoteError, SyncError};
pub use remote::{GitHubFileStore, RemoteFileStore, RemoteSettings, Revision};
pub use render::{BackupFile, render_files};
pub use scheduler::{
    BackupJob, SchedulePolicy, SchedulerPhase, SchedulerStatus, SyncHandle, SyncScheduler,
    SyncTrigger,
};
pub use snapshot::{Snapshot, SnapshotSummary, StateSnapshot};
pub use source::{RecordSource, SourceRecords, SqliteRecordSource};
pub use synchronizer::{BackupSynchronizer, FileOutcome, FileStatus, RunReport, SyncOptions};
