//! StateSnapshot: immutable point-in-time copy of the record store
//!
//! A [`Snapshot`] owns copies of every record it carries, so mutations that
//! land while a run is uploading cannot change what that run writes.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use shared::models::{
    MessageLog, MessageStatus, ProductCategory, SanitizedNotifierConfig, Subscription,
    SubscriptionStatus,
};
use shared::util::millis_to_rfc3339;

use super::error::SyncError;
use super::source::{RecordSource, SourceRecords};
use crate::utils::time::business_date;

/// Subscription as written to backup files, with derived expiry fields
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionView {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub product_type: ProductCategory,
    pub plan: String,
    pub value: f64,
    pub expiry_date: NaiveDate,
    pub notification_time: String,
    pub custom_message: Option<String>,
    pub status: SubscriptionStatus,
    pub created_at: String,
    pub updated_at: String,
    pub last_notification_sent: Option<String>,
    pub days_until_expiry: i64,
    pub is_expired: bool,
}

impl SubscriptionView {
    fn new(sub: &Subscription, today: NaiveDate) -> Self {
        Self {
            id: sub.id,
            name: sub.name.clone(),
            phone: sub.phone.clone(),
            product_type: sub.product_type,
            plan: sub.plan.clone(),
            value: sub.value,
            expiry_date: sub.expiry_date,
            notification_time: sub.notification_time.clone(),
            custom_message: sub.custom_message.clone(),
            status: sub.status,
            created_at: millis_to_rfc3339(sub.created_at),
            updated_at: millis_to_rfc3339(sub.updated_at),
            last_notification_sent: sub.last_notification_sent.map(millis_to_rfc3339),
            days_until_expiry: sub.days_until_expiry(today),
            is_expired: sub.is_expired(today),
        }
    }
}

/// Notifier configuration as written to backup files (no session or pairing secrets)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfigView {
    pub id: i64,
    pub connection_status: String,
    pub auto_send_enabled: bool,
    pub working_hours_start: String,
    pub working_hours_end: String,
    pub message_interval_seconds: i64,
    pub last_connected: Option<String>,
    pub last_disconnected: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SanitizedNotifierConfig> for ConfigView {
    fn from(config: SanitizedNotifierConfig) -> Self {
        Self {
            id: config.id,
            connection_status: config.connection_status,
            auto_send_enabled: config.auto_send_enabled,
            working_hours_start: config.working_hours_start,
            working_hours_end: config.working_hours_end,
            message_interval_seconds: config.message_interval_seconds,
            last_connected: config.last_connected.map(millis_to_rfc3339),
            last_disconnected: config.last_disconnected.map(millis_to_rfc3339),
            created_at: millis_to_rfc3339(config.created_at),
            updated_at: millis_to_rfc3339(config.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MessageLogView {
    pub id: i64,
    pub client_id: Option<i64>,
    pub phone: String,
    pub message_content: String,
    pub status: MessageStatus,
    pub sent_at: Option<String>,
    pub error_message: Option<String>,
    pub provider_message_id: Option<String>,
    pub created_at: String,
}

impl From<&MessageLog> for MessageLogView {
    fn from(log: &MessageLog) -> Self {
        Self {
            id: log.id,
            client_id: log.client_id,
            phone: log.phone.clone(),
            message_content: log.message_content.clone(),
            status: log.status,
            sent_at: log.sent_at.map(millis_to_rfc3339),
            error_message: log.error_message.clone(),
            provider_message_id: log.provider_message_id.clone(),
            created_at: millis_to_rfc3339(log.created_at),
        }
    }
}

/// Summary statistics of one snapshot
#[derive(Debug, Clone, Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub captured_at: String,
    pub total_subscriptions: usize,
    /// Every known category is present, zero included
    pub by_category: BTreeMap<ProductCategory, usize>,
    pub total_logs: usize,
}

/// Immutable snapshot of subscription and configuration state
#[derive(Debug, Clone)]
pub struct Snapshot {
    captured_at: DateTime<Utc>,
    business_date: NaiveDate,
    subscriptions: Vec<SubscriptionView>,
    by_category: BTreeMap<ProductCategory, Vec<SubscriptionView>>,
    config: ConfigView,
    message_logs: Vec<MessageLogView>,
    summary: SnapshotSummary,
}

impl Snapshot {
    /// Build a snapshot from already-read records
    ///
    /// `today` for the derived expiry fields is `now` in the business time zone.
    pub fn from_records(records: SourceRecords, now: DateTime<Utc>, tz: Tz) -> Self {
        let today = business_date(now, tz);

        let subscriptions: Vec<SubscriptionView> = records
            .subscriptions
            .iter()
            .map(|sub| SubscriptionView::new(sub, today))
            .collect();

        let mut by_category: BTreeMap<ProductCategory, Vec<SubscriptionView>> =
            ProductCategory::ALL.iter().map(|c| (*c, Vec::new())).collect();
        for view in &subscriptions {
            by_category
                .entry(view.product_type)
                .or_default()
                .push(view.clone());
        }

        let message_logs: Vec<MessageLogView> =
            records.message_logs.iter().map(MessageLogView::from).collect();

        let summary = SnapshotSummary {
            captured_at: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            total_subscriptions: subscriptions.len(),
            by_category: by_category.iter().map(|(c, v)| (*c, v.len())).collect(),
            total_logs: message_logs.len(),
        };

        Self {
            captured_at: now,
            business_date: today,
            subscriptions,
            by_category,
            config: records.config.sanitized().into(),
            message_logs,
            summary,
        }
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn business_date(&self) -> NaiveDate {
        self.business_date
    }

    /// Every subscription in capture order
    pub fn subscriptions(&self) -> &[SubscriptionView] {
        &self.subscriptions
    }

    /// One category's subscriptions in capture order
    pub fn category(&self, category: ProductCategory) -> &[SubscriptionView] {
        self.by_category
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn config(&self) -> &ConfigView {
        &self.config
    }

    pub fn message_logs(&self) -> &[MessageLogView] {
        &self.message_logs
    }

    pub fn summary(&self) -> &SnapshotSummary {
        &self.summary
    }
}

/// Captures snapshots from a [`RecordSource`]
#[derive(Clone)]
pub struct StateSnapshot {
    source: Arc<dyn RecordSource>,
    timezone: Tz,
    log_limit: usize,
}

impl StateSnapshot {
    pub fn new(source: Arc<dyn RecordSource>, timezone: Tz, log_limit: usize) -> Self {
        Self {
            source,
            timezone,
            log_limit,
        }
    }

    /// Read every record once and freeze them into a [`Snapshot`]
    ///
    /// Fails with [`SyncError::DataUnavailable`] only when the source cannot
    /// be read; an empty store yields an empty snapshot.
    pub async fn capture(&self, current_time: DateTime<Utc>) -> Result<Snapshot, SyncError> {
        let records = self
            .source
            .read_records(self.log_limit)
            .await
            .map_err(|e| SyncError::DataUnavailable(e.to_string()))?;
        Ok(Snapshot::from_records(records, current_time, self.timezone))
    }
}
