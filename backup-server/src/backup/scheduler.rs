//! SyncScheduler: background actor that serializes backup runs
//!
//! 所有触发源 (定时器、每日定时、数据变更、手动 API) 通过同一个无界通道
//! 进入 actor。actor 独占 `Idle / Running / Shutdown` 状态和 pending 标记：
//!
//! - `Idle` 收到请求 → 立即开始一次运行
//! - `Running` 收到请求 → 只记录一个 pending (多个请求合并为一次后续运行)
//! - 运行结束 → 有 pending 则立即开始下一次，否则回到 `Idle`
//! - shutdown → 丢弃 pending，等待进行中的运行自然结束后退出
//!
//! 因为只有 actor 任务修改状态，"同一时刻最多一次运行" 不需要锁。

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::clock::Clock;
use super::error::SyncError;
use super::snapshot::StateSnapshot;
use super::synchronizer::{BackupSynchronizer, RunReport};
use crate::utils::time::duration_until_next_daily;

/// Default fixed period between runs (6 hours)
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(6 * 3600);

/// What caused a run request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// Fixed-period timer
    Interval,
    /// Daily wall-clock timer
    Daily,
    /// A record mutation completed
    Mutation,
    /// On-demand API call
    Manual,
    Startup,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTrigger::Interval => write!(f, "interval"),
            SyncTrigger::Daily => write!(f, "daily"),
            SyncTrigger::Mutation => write!(f, "mutation"),
            SyncTrigger::Manual => write!(f, "manual"),
            SyncTrigger::Startup => write!(f, "startup"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPhase {
    Idle,
    Running,
    /// Terminal
    Shutdown,
}

/// Observable scheduler state, published after every transition
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    /// False when the remote store is not configured
    pub enabled: bool,
    pub phase: SchedulerPhase,
    /// A follow-up run is queued behind the in-flight one
    pub pending: bool,
    pub requests_received: u64,
    pub runs_started: u64,
    pub runs_completed: u64,
    pub last_trigger: Option<SyncTrigger>,
    pub last_error: Option<String>,
    pub last_report: Option<RunReport>,
}

impl SchedulerStatus {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            phase: SchedulerPhase::Idle,
            pending: false,
            requests_received: 0,
            runs_started: 0,
            runs_completed: 0,
            last_trigger: None,
            last_error: None,
            last_report: None,
        }
    }
}

/// Timer configuration
#[derive(Debug, Clone)]
pub struct SchedulePolicy {
    pub interval: Duration,
    /// Local wall-clock time of the daily run
    pub daily_at: NaiveTime,
    pub timezone: Tz,
    pub run_on_startup: bool,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            daily_at: NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN),
            timezone: chrono_tz::UTC,
            run_on_startup: false,
        }
    }
}

/// Snapshot capture plus upload, i.e. one complete run
#[derive(Clone)]
pub struct BackupJob {
    snapshot: StateSnapshot,
    synchronizer: BackupSynchronizer,
}

impl BackupJob {
    pub fn new(snapshot: StateSnapshot, synchronizer: BackupSynchronizer) -> Self {
        Self {
            snapshot,
            synchronizer,
        }
    }

    pub async fn execute(
        &self,
        trigger: SyncTrigger,
        now: DateTime<Utc>,
    ) -> Result<RunReport, SyncError> {
        let snapshot = self.snapshot.capture(now).await?;
        self.synchronizer.run(&snapshot, trigger).await
    }
}

/// Cloneable handle for requesting runs and reading status
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<SyncTrigger>,
    status: watch::Receiver<SchedulerStatus>,
    shutdown: CancellationToken,
    enabled: bool,
}

impl SyncHandle {
    /// Ask for a run (fire-and-forget)
    ///
    /// Never blocks and never fails; after shutdown the request is dropped.
    pub fn request_run(&self, trigger: SyncTrigger) {
        if self.tx.send(trigger).is_err() {
            tracing::debug!(%trigger, "Backup scheduler stopped, request dropped");
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stop accepting new runs; an in-flight run still completes
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

struct RunOutcome {
    trigger: SyncTrigger,
    result: Result<RunReport, SyncError>,
}

/// The scheduler actor
///
/// Construct with [`SyncScheduler::new`], spawn [`SyncScheduler::run`], keep
/// the returned [`SyncHandle`].
pub struct SyncScheduler {
    job: Option<BackupJob>,
    policy: SchedulePolicy,
    clock: Arc<dyn Clock>,
    rx: mpsc::UnboundedReceiver<SyncTrigger>,
    status_tx: watch::Sender<SchedulerStatus>,
    shutdown: CancellationToken,
}

impl SyncScheduler {
    /// `job = None` builds a disabled scheduler: every trigger is a logged no-op
    pub fn new(
        job: Option<BackupJob>,
        policy: SchedulePolicy,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> (Self, SyncHandle) {
        let enabled = job.is_some();
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SchedulerStatus::new(enabled));
        let handle = SyncHandle {
            tx,
            status: status_rx,
            shutdown: shutdown.clone(),
            enabled,
        };
        let scheduler = Self {
            job,
            policy,
            clock,
            rx,
            status_tx,
            shutdown,
        };
        (scheduler, handle)
    }

    /// Actor main loop, returns after shutdown once the in-flight run finished
    pub async fn run(self) {
        let SyncScheduler {
            job,
            policy,
            clock,
            mut rx,
            status_tx,
            shutdown,
        } = self;

        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut actor = Actor {
            status: SchedulerStatus::new(job.is_some()),
            job,
            clock: clock.clone(),
            status_tx,
            done_tx,
            pending: None,
            in_flight: None,
        };

        tracing::info!(
            enabled = actor.status.enabled,
            interval_secs = policy.interval.as_secs(),
            daily_at = %policy.daily_at.format("%H:%M"),
            timezone = %policy.timezone,
            "Backup scheduler started"
        );

        // Missed ticks are not backfilled
        let mut interval = tokio::time::interval_at(Instant::now() + policy.interval, policy.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let next_daily = || {
            Instant::now() + duration_until_next_daily(policy.daily_at, policy.timezone, clock.now())
        };
        let daily = tokio::time::sleep_until(next_daily());
        tokio::pin!(daily);

        if policy.run_on_startup {
            actor.on_request(SyncTrigger::Startup);
        }

        let mut requests_open = true;
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                Some(outcome) = done_rx.recv() => actor.on_complete(outcome),

                request = rx.recv(), if requests_open => match request {
                    Some(trigger) => actor.on_request(trigger),
                    None => requests_open = false,
                },

                _ = interval.tick() => actor.on_request(SyncTrigger::Interval),

                () = &mut daily => {
                    actor.on_request(SyncTrigger::Daily);
                    daily.as_mut().reset(next_daily());
                }
            }
        }

        actor.shut_down(&mut done_rx).await;
        tracing::info!("Backup scheduler stopped");
    }
}

/// State owned by the actor task
struct Actor {
    status: SchedulerStatus,
    job: Option<BackupJob>,
    clock: Arc<dyn Clock>,
    status_tx: watch::Sender<SchedulerStatus>,
    done_tx: mpsc::UnboundedSender<RunOutcome>,
    pending: Option<SyncTrigger>,
    in_flight: Option<JoinHandle<()>>,
}

impl Actor {
    fn publish(&self) {
        self.status_tx.send_replace(self.status.clone());
    }

    fn on_request(&mut self, trigger: SyncTrigger) {
        self.status.requests_received += 1;

        if self.job.is_none() {
            tracing::warn!(%trigger, "Backup not configured (missing remote credential or repository), request ignored");
            self.publish();
            return;
        }

        match self.status.phase {
            SchedulerPhase::Idle => self.start(trigger),
            SchedulerPhase::Running => {
                if self.pending.replace(trigger).is_some() {
                    tracing::debug!(%trigger, "Backup request coalesced into queued follow-up");
                } else {
                    tracing::debug!(%trigger, "Backup run in flight, follow-up queued");
                }
                self.status.pending = true;
            }
            SchedulerPhase::Shutdown => {}
        }
        self.publish();
    }

    fn start(&mut self, trigger: SyncTrigger) {
        let Some(job) = self.job.clone() else {
            return;
        };

        self.status.phase = SchedulerPhase::Running;
        self.status.runs_started += 1;
        self.status.last_trigger = Some(trigger);
        tracing::info!(%trigger, run = self.status.runs_started, "Backup run started");

        let now = self.clock.now();
        let done_tx = self.done_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let result = AssertUnwindSafe(job.execute(trigger, now))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic_info| Err(SyncError::Aborted(panic_message(panic_info))));
            let _ = done_tx.send(RunOutcome { trigger, result });
        }));
    }

    fn on_complete(&mut self, outcome: RunOutcome) {
        self.in_flight = None;
        self.status.runs_completed += 1;
        self.record(outcome);

        match self.pending.take() {
            Some(next) if self.status.phase == SchedulerPhase::Running => {
                self.status.pending = false;
                self.start(next);
            }
            _ => {
                self.status.pending = false;
                if self.status.phase == SchedulerPhase::Running {
                    self.status.phase = SchedulerPhase::Idle;
                }
            }
        }
        self.publish();
    }

    fn record(&mut self, outcome: RunOutcome) {
        let RunOutcome { trigger, result } = outcome;
        match result {
            Ok(report) => {
                let failed = report.files.iter().filter(|f| !f.status.is_ok()).count();
                if report.overall_ok {
                    tracing::info!(
                        %trigger,
                        run_id = %report.run_id,
                        files = report.files.len(),
                        subscriptions = report.summary.total_subscriptions,
                        "Backup run completed"
                    );
                } else {
                    tracing::warn!(
                        %trigger,
                        run_id = %report.run_id,
                        files = report.files.len(),
                        failed,
                        "Backup run completed with failures"
                    );
                }
                self.status.last_error = report.failures().next().map(|e| e.to_string());
                self.status.last_report = Some(report);
            }
            Err(e) => {
                tracing::error!(%trigger, error = %e, "Backup run failed");
                self.status.last_error = Some(e.to_string());
            }
        }
    }

    async fn shut_down(&mut self, done_rx: &mut mpsc::UnboundedReceiver<RunOutcome>) {
        self.status.phase = SchedulerPhase::Shutdown;
        if self.pending.take().is_some() {
            tracing::debug!("Queued backup follow-up dropped on shutdown");
        }
        self.status.pending = false;
        self.publish();

        if let Some(handle) = self.in_flight.take() {
            tracing::info!("Waiting for in-flight backup run to finish");
            let _ = handle.await;
        }
        while let Ok(outcome) = done_rx.try_recv() {
            self.status.runs_completed += 1;
            self.record(outcome);
        }
        self.publish();
    }
}

fn panic_message(panic_info: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
