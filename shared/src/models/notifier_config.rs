//! Notifier Configuration Model (Singleton)
//!
//! 通知通道配置，全系统只有一条记录，首次访问时惰性创建

use serde::{Deserialize, Serialize};

/// Notifier configuration entity
///
/// `qr_code` and `session_data` are pairing/session secrets and must never be
/// serialized outside the process; backups use [`SanitizedNotifierConfig`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct NotifierConfig {
    pub id: i64,
    /// connected | disconnected | connecting
    pub connection_status: String,
    /// One-time pairing code
    #[serde(skip_serializing)]
    pub qr_code: Option<String>,
    /// Session credentials
    #[serde(skip_serializing)]
    pub session_data: Option<String>,
    pub auto_send_enabled: bool,
    /// "HH:MM"
    pub working_hours_start: String,
    /// "HH:MM"
    pub working_hours_end: String,
    /// Minimum interval between dispatched messages
    pub message_interval_seconds: i64,
    pub last_connected: Option<i64>,
    pub last_disconnected: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl NotifierConfig {
    /// Default singleton values, as created on first access
    pub fn with_defaults(id: i64, now: i64) -> Self {
        Self {
            id,
            connection_status: "disconnected".to_string(),
            qr_code: None,
            session_data: None,
            auto_send_enabled: true,
            working_hours_start: "08:00".to_string(),
            working_hours_end: "22:00".to_string(),
            message_interval_seconds: 5,
            last_connected: None,
            last_disconnected: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Strip session and pairing secrets
    pub fn sanitized(&self) -> SanitizedNotifierConfig {
        SanitizedNotifierConfig {
            id: self.id,
            connection_status: self.connection_status.clone(),
            auto_send_enabled: self.auto_send_enabled,
            working_hours_start: self.working_hours_start.clone(),
            working_hours_end: self.working_hours_end.clone(),
            message_interval_seconds: self.message_interval_seconds,
            last_connected: self.last_connected,
            last_disconnected: self.last_disconnected,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Configuration without secrets (safe to leave the process)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SanitizedNotifierConfig {
    pub id: i64,
    pub connection_status: String,
    pub auto_send_enabled: bool,
    pub working_hours_start: String,
    pub working_hours_end: String,
    pub message_interval_seconds: i64,
    pub last_connected: Option<i64>,
    pub last_disconnected: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Update notifier config payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotifierConfigUpdate {
    pub connection_status: Option<String>,
    pub qr_code: Option<String>,
    pub session_data: Option<String>,
    pub auto_send_enabled: Option<bool>,
    pub working_hours_start: Option<String>,
    pub working_hours_end: Option<String>,
    pub message_interval_seconds: Option<i64>,
}
