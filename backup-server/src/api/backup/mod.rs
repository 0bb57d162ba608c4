//! Backup API Module
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/backup/run | POST | 请求一次手动备份 (202) |
//! | /api/backup/status | GET | 调度器状态和最近一次运行结果 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/backup", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/run", post(handler::run))
        .route("/status", get(handler::status))
}
