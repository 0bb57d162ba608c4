//! BackupSynchronizer: one synchronization run
//!
//! For every rendered file: read the current remote revision, then upsert
//! the full content against it. Paths are processed one at a time and each
//! outcome is recorded independently; a failed path never skips or retries
//! its siblings within the same run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::error::{RemoteError, SyncError};
use super::remote::{RemoteFileStore, Revision};
use super::render::{BackupFile, render_files};
use super::scheduler::SyncTrigger;
use super::snapshot::{Snapshot, SnapshotSummary};

/// Outcome of one path
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Ok { revision: Revision },
    Conflict { message: String },
    TransportError { message: String },
}

impl FileStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, FileStatus::Ok { .. })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: String,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    /// The failure as a [`SyncError`], `None` when the path succeeded
    pub fn as_error(&self) -> Option<SyncError> {
        match &self.status {
            FileStatus::Ok { .. } => None,
            FileStatus::Conflict { .. } => Some(SyncError::PathConflict {
                path: self.path.clone(),
            }),
            FileStatus::TransportError { message } => Some(SyncError::Transport {
                path: self.path.clone(),
                message: message.clone(),
            }),
        }
    }
}

/// Result of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub trigger: SyncTrigger,
    pub captured_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Upload order
    pub files: Vec<FileOutcome>,
    /// True only when every path succeeded
    pub overall_ok: bool,
    pub summary: SnapshotSummary,
}

impl RunReport {
    pub fn status_of(&self, path: &str) -> Option<&FileStatus> {
        self.files
            .iter()
            .find(|f| f.path == path)
            .map(|f| &f.status)
    }

    pub fn failures(&self) -> impl Iterator<Item = SyncError> + '_ {
        self.files.iter().filter_map(FileOutcome::as_error)
    }
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Deadline for revision lookup plus upsert of a single path
    pub path_timeout: Duration,
    pub include_message_logs: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            path_timeout: Duration::from_secs(30),
            include_message_logs: false,
        }
    }
}

/// Uploads a snapshot's files to a [`RemoteFileStore`]
#[derive(Clone)]
pub struct BackupSynchronizer {
    remote: Arc<dyn RemoteFileStore>,
    options: SyncOptions,
}

impl BackupSynchronizer {
    pub fn new(remote: Arc<dyn RemoteFileStore>, options: SyncOptions) -> Self {
        Self { remote, options }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Upload every file of `snapshot`
    ///
    /// Only rendering can fail the whole run; remote failures are per-path
    /// entries of the report.
    pub async fn run(
        &self,
        snapshot: &Snapshot,
        trigger: SyncTrigger,
    ) -> Result<RunReport, SyncError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let files = render_files(snapshot, self.options.include_message_logs)?;

        let mut outcomes = Vec::with_capacity(files.len());
        for file in &files {
            let status = self.sync_file(file).await;
            match &status {
                FileStatus::Ok { revision } => {
                    tracing::debug!(%run_id, path = file.path, %revision, "Backup file uploaded");
                }
                FileStatus::Conflict { message } => {
                    tracing::warn!(%run_id, path = file.path, error = %message, "Backup file revision conflict");
                }
                FileStatus::TransportError { message } => {
                    tracing::warn!(%run_id, path = file.path, error = %message, "Backup file upload failed");
                }
            }
            outcomes.push(FileOutcome {
                path: file.path.to_string(),
                status,
            });
        }

        let overall_ok = outcomes.iter().all(|o| o.status.is_ok());
        Ok(RunReport {
            run_id,
            trigger,
            captured_at: snapshot.captured_at(),
            started_at,
            finished_at: Utc::now(),
            files: outcomes,
            overall_ok,
            summary: snapshot.summary().clone(),
        })
    }

    async fn sync_file(&self, file: &BackupFile) -> FileStatus {
        let attempt = async {
            let revision = self.remote.get_revision(file.path).await?;
            self.remote
                .upsert(file.path, &file.content, revision.as_ref(), &file.message)
                .await
        };

        match tokio::time::timeout(self.options.path_timeout, attempt).await {
            Ok(Ok(revision)) => FileStatus::Ok { revision },
            Ok(Err(RemoteError::Conflict(message))) => FileStatus::Conflict { message },
            Ok(Err(RemoteError::Transport(message) | RemoteError::InvalidResponse(message))) => {
                FileStatus::TransportError { message }
            }
            Err(_) => FileStatus::TransportError {
                message: format!(
                    "Timed out after {}s",
                    self.options.path_timeout.as_secs_f64()
                ),
            },
        }
    }
}
