//! Backup Server - 订阅数据远端备份服务
//!
//! # 架构概述
//!
//! - **记录存储** (`db`): 嵌入式 SQLite，订阅、通知配置、消息日志
//! - **备份** (`backup`): 快照 → 渲染 → 逐文件 upsert 到远端版本化存储
//! - **调度** (`backup::scheduler`): 定时 / 每日 / 变更 / 手动触发，合并并发请求
//! - **HTTP API** (`api`): 健康检查、手动触发、状态查询
//!
//! # 模块结构
//!
//! ```text
//! backup-server/src/
//! ├── core/          # 配置、状态、后台任务、HTTP 服务器
//! ├── backup/        # 快照、远端存储、同步器、调度器
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 数据库层
//! └── utils/         # 错误、日志、时间工具
//! ```

pub mod api;
pub mod backup;
pub mod core;
pub mod db;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{BackgroundTasks, Config, Server, ServerState};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 加载 `.env` 并初始化日志
pub fn setup_environment(config: &Config) -> anyhow::Result<()> {
    let log_dir = config.log_dir();
    init_logger_with_file(
        &config.log_level,
        config.log_json,
        config.is_production().then_some(log_dir.as_path()),
    )
}

pub fn print_banner() {
    println!(
        r#"
    ____             __
   / __ )____ ______/ /____  ______
  / __  / __ `/ ___/ //_/ / / / __ \
 / /_/ / /_/ / /__/ ,< / /_/ / /_/ /
/_____/\__,_/\___/_/|_|\__,_/ .___/
                           /_/
    "#
    );
}
