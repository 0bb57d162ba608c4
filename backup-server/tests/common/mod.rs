//! In-process fakes shared by the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backup_server::backup::{
    BackupJob, BackupSynchronizer, RecordSource, RemoteError, RemoteFileStore, Revision,
    SourceRecords, StateSnapshot, SyncOptions,
};
use backup_server::db::repository::{RepoError, RepoResult};
use chrono::NaiveDate;
use parking_lot::Mutex;
use shared::models::{
    NotifierConfig, ProductCategory, Subscription, SubscriptionStatus,
};
use tokio::sync::watch;

/// One recorded upsert call
#[derive(Debug, Clone)]
pub struct UpsertCall {
    pub path: String,
    pub content: Vec<u8>,
    pub revision: Option<Revision>,
    pub message: String,
}

#[derive(Default)]
struct RemoteInner {
    files: HashMap<String, (Vec<u8>, Revision)>,
    next_revision: u64,
    failing_paths: HashSet<String>,
    /// Paths whose revision moves right after the next lookup
    racing_paths: HashSet<String>,
    upserts: Vec<UpsertCall>,
    lookups: Vec<String>,
}

impl RemoteInner {
    fn bump(&mut self) -> Revision {
        self.next_revision += 1;
        Revision(format!("rev-{}", self.next_revision))
    }
}

/// Versioned in-memory file store with scripted failures
pub struct MemoryRemote {
    inner: Mutex<RemoteInner>,
    gate: watch::Sender<bool>,
    /// Calls currently parked at the closed gate
    waiting: AtomicUsize,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RemoteInner::default()),
            gate: watch::channel(true).0,
            waiting: AtomicUsize::new(0),
        }
    }

    /// Every call on `path` fails with a transport error
    pub fn fail_path(&self, path: &str) {
        self.inner.lock().failing_paths.insert(path.to_string());
    }

    pub fn heal_path(&self, path: &str) {
        self.inner.lock().failing_paths.remove(path);
    }

    /// Another writer updates `path` right after our next revision lookup
    pub fn race_next_write(&self, path: &str) {
        self.inner.lock().racing_paths.insert(path.to_string());
    }

    /// Block every call until [`MemoryRemote::open_gate`]
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.lock().files.get(path).map(|(c, _)| c.clone())
    }

    pub fn revision(&self, path: &str) -> Option<Revision> {
        self.inner.lock().files.get(path).map(|(_, r)| r.clone())
    }

    pub fn upserts(&self) -> Vec<UpsertCall> {
        self.inner.lock().upserts.clone()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.inner.lock().lookups.clone()
    }

    async fn pass_gate(&self) {
        let mut rx = self.gate.subscribe();
        if !*rx.borrow() {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            let _ = rx.wait_for(|open| *open).await;
            self.waiting.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl RemoteFileStore for MemoryRemote {
    async fn get_revision(&self, path: &str) -> Result<Option<Revision>, RemoteError> {
        self.pass_gate().await;
        let mut inner = self.inner.lock();
        inner.lookups.push(path.to_string());
        if inner.failing_paths.contains(path) {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        let current = inner.files.get(path).map(|(_, r)| r.clone());
        if inner.racing_paths.remove(path) {
            let moved = inner.bump();
            let content = inner
                .files
                .get(path)
                .map(|(c, _)| c.clone())
                .unwrap_or_default();
            inner.files.insert(path.to_string(), (content, moved));
        }
        Ok(current)
    }

    async fn upsert(
        &self,
        path: &str,
        content: &[u8],
        revision: Option<&Revision>,
        message: &str,
    ) -> Result<Revision, RemoteError> {
        self.pass_gate().await;
        let mut inner = self.inner.lock();
        if inner.failing_paths.contains(path) {
            return Err(RemoteError::Transport("connection reset".into()));
        }
        let current = inner.files.get(path).map(|(_, r)| r.clone());
        if current.as_ref() != revision {
            return Err(RemoteError::Conflict(format!(
                "{path} is at {:?}, got {:?}",
                current, revision
            )));
        }
        inner.upserts.push(UpsertCall {
            path: path.to_string(),
            content: content.to_vec(),
            revision: revision.cloned(),
            message: message.to_string(),
        });
        let next = inner.bump();
        inner
            .files
            .insert(path.to_string(), (content.to_vec(), next.clone()));
        Ok(next)
    }
}

/// Record source backed by a fixed set of records
pub struct StaticSource {
    records: Mutex<SourceRecords>,
    unavailable: AtomicBool,
    reads: AtomicUsize,
}

impl StaticSource {
    pub fn new(records: SourceRecords) -> Self {
        Self {
            records: Mutex::new(records),
            unavailable: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn replace(&self, records: SourceRecords) {
        *self.records.lock() = records;
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for StaticSource {
    async fn read_records(&self, log_limit: usize) -> RepoResult<SourceRecords> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::Database("database is locked".into()));
        }
        let mut records = self.records.lock().clone();
        records.message_logs.truncate(log_limit);
        Ok(records)
    }
}

pub fn subscription(id: i64, category: ProductCategory) -> Subscription {
    Subscription {
        id,
        name: format!("holder-{id}"),
        phone: format!("+5511900000{id:03}"),
        product_type: category,
        plan: "Monthly".to_string(),
        value: 25.0,
        expiry_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
        notification_time: "09:00".to_string(),
        custom_message: None,
        status: SubscriptionStatus::Active,
        created_at: 1_767_225_600_000 + id,
        updated_at: 1_767_225_600_000 + id,
        last_notification_sent: None,
    }
}

pub fn records(subscriptions: Vec<Subscription>) -> SourceRecords {
    SourceRecords {
        subscriptions,
        config: NotifierConfig::with_defaults(1, 1_767_225_600_000),
        message_logs: Vec::new(),
    }
}

/// 2 IPTV + 3 VPN, interleaved
pub fn mixed_records() -> SourceRecords {
    records(vec![
        subscription(1, ProductCategory::Iptv),
        subscription(2, ProductCategory::Vpn),
        subscription(3, ProductCategory::Iptv),
        subscription(4, ProductCategory::Vpn),
        subscription(5, ProductCategory::Vpn),
    ])
}

pub fn snapshotter(source: Arc<StaticSource>) -> StateSnapshot {
    StateSnapshot::new(source, chrono_tz::UTC, 1000)
}

pub fn options() -> SyncOptions {
    SyncOptions {
        path_timeout: Duration::from_secs(5),
        include_message_logs: false,
    }
}

pub fn job(source: Arc<StaticSource>, remote: Arc<MemoryRemote>) -> BackupJob {
    BackupJob::new(
        snapshotter(source),
        BackupSynchronizer::new(remote, options()),
    )
}

/// Let spawned tasks run until they block
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
