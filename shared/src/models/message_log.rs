//! Message Log Model

use serde::{Deserialize, Serialize};

/// Outbound message delivery status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum MessageStatus {
    #[default]
    Pending,
    Sent,
    Failed,
    Scheduled,
}

/// Message log entity (通知发送记录)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MessageLog {
    pub id: i64,
    pub client_id: Option<i64>,
    pub phone: String,
    pub message_content: String,
    pub status: MessageStatus,
    pub sent_at: Option<i64>,
    pub error_message: Option<String>,
    pub provider_message_id: Option<String>,
    pub created_at: i64,
}

/// Create message log payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLogCreate {
    pub client_id: Option<i64>,
    pub phone: String,
    pub message_content: String,
    pub status: MessageStatus,
    pub error_message: Option<String>,
}
