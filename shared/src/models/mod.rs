//! Data models
//!
//! Shared between backup-server and the host application's mutation handlers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (snowflake), timestamps are Unix millis.

pub mod message_log;
pub mod notifier_config;
pub mod subscription;

// Re-exports
pub use message_log::*;
pub use notifier_config::*;
pub use subscription::*;
