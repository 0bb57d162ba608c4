//! Shared types for the subscription backup system
//!
//! Domain records read by the backup synchronizer and written by the
//! host application's mutation handlers.

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
