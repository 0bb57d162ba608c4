use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;

use crate::backup::scheduler::DEFAULT_INTERVAL;
use crate::backup::{RemoteSettings, SchedulePolicy, SyncError, SyncOptions};
use crate::utils::time::{parse_time_of_day, parse_timezone};

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖 (支持 `.env` 文件)：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./work_dir | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | 控制台 JSON 日志 |
/// | BACKUP_GITHUB_TOKEN | - | 远端仓库访问凭证 (缺失则禁用备份) |
/// | BACKUP_GITHUB_REPO | - | 远端仓库 "owner/name" (缺失则禁用备份) |
/// | BACKUP_BRANCH | main | 目标分支 |
/// | BACKUP_API_URL | https://api.github.com | API 地址 |
/// | BACKUP_INTERVAL_SECS | 21600 | 定时备份周期 (秒) |
/// | BACKUP_DAILY_AT | 02:00 | 每日备份时刻 |
/// | BACKUP_TIMEZONE | UTC | 业务时区 |
/// | BACKUP_PATH_TIMEOUT_SECS | 30 | 单个文件上传超时 (秒) |
/// | BACKUP_MESSAGE_LOG_LIMIT | 1000 | 快照包含的最近消息日志条数 |
/// | BACKUP_INCLUDE_MESSAGE_LOGS | false | 是否上传消息日志文件 |
/// | BACKUP_ON_STARTUP | false | 启动时立即备份一次 |
///
/// # 示例
///
/// ```ignore
/// BACKUP_GITHUB_TOKEN=ghp_xxx BACKUP_GITHUB_REPO=acme/backups cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    /// 备份配置
    pub backup: BackupConfig,
}

/// 备份子系统配置
#[derive(Clone)]
pub struct BackupConfig {
    pub token: Option<String>,
    pub repo: Option<String>,
    pub branch: String,
    pub api_url: String,
    pub interval_secs: u64,
    /// "HH:MM"
    pub daily_at: String,
    /// IANA 时区名
    pub timezone: String,
    pub path_timeout_secs: u64,
    pub message_log_limit: usize,
    pub include_message_logs: bool,
    pub run_on_startup: bool,
}

impl fmt::Debug for BackupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_url", &self.api_url)
            .field("interval_secs", &self.interval_secs)
            .field("daily_at", &self.daily_at)
            .field("timezone", &self.timezone)
            .field("path_timeout_secs", &self.path_timeout_secs)
            .field("message_log_limit", &self.message_log_limit)
            .field("include_message_logs", &self.include_message_logs)
            .field("run_on_startup", &self.run_on_startup)
            .finish()
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// 空字符串视为未设置
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意 key → value 查找函数加载配置 (测试用)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            work_dir: lookup("WORK_DIR").unwrap_or_else(|| "./work_dir".into()),
            http_port: parse_or(lookup("HTTP_PORT"), 3000),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: parse_or(lookup("LOG_JSON"), false),
            backup: BackupConfig {
                token: non_empty(lookup("BACKUP_GITHUB_TOKEN")),
                repo: non_empty(lookup("BACKUP_GITHUB_REPO")),
                branch: non_empty(lookup("BACKUP_BRANCH")).unwrap_or_else(|| "main".into()),
                api_url: non_empty(lookup("BACKUP_API_URL"))
                    .unwrap_or_else(|| "https://api.github.com".into()),
                interval_secs: parse_or(lookup("BACKUP_INTERVAL_SECS"), DEFAULT_INTERVAL.as_secs()),
                daily_at: lookup("BACKUP_DAILY_AT").unwrap_or_else(|| "02:00".into()),
                timezone: lookup("BACKUP_TIMEZONE").unwrap_or_else(|| "UTC".into()),
                path_timeout_secs: parse_or(lookup("BACKUP_PATH_TIMEOUT_SECS"), 30),
                message_log_limit: parse_or(lookup("BACKUP_MESSAGE_LOG_LIMIT"), 1000),
                include_message_logs: parse_or(lookup("BACKUP_INCLUDE_MESSAGE_LOGS"), false),
                run_on_startup: parse_or(lookup("BACKUP_ON_STARTUP"), false),
            },
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 数据库文件路径
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir)
            .join("database")
            .join("backup.db")
    }

    /// 日志目录
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(PathBuf::from(&self.work_dir).join("database"))?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl BackupConfig {
    /// 远端仓库连接设置；凭证或仓库缺失时返回 `ConfigurationMissing`
    pub fn remote_settings(&self) -> Result<RemoteSettings, SyncError> {
        let token = self
            .token
            .clone()
            .ok_or_else(|| SyncError::ConfigurationMissing("BACKUP_GITHUB_TOKEN not set".into()))?;
        let repo = self
            .repo
            .clone()
            .ok_or_else(|| SyncError::ConfigurationMissing("BACKUP_GITHUB_REPO not set".into()))?;
        Ok(RemoteSettings {
            api_url: self.api_url.clone(),
            repo,
            branch: self.branch.clone(),
            token,
        })
    }

    /// 调度策略；非法值回退到默认值并记录警告
    pub fn schedule_policy(&self) -> SchedulePolicy {
        let defaults = SchedulePolicy::default();

        let interval = if self.interval_secs == 0 {
            tracing::warn!("BACKUP_INTERVAL_SECS must be positive, using default");
            defaults.interval
        } else {
            Duration::from_secs(self.interval_secs)
        };

        let daily_at: NaiveTime = parse_time_of_day(&self.daily_at).unwrap_or_else(|e| {
            tracing::warn!(value = %self.daily_at, error = %e, "Invalid BACKUP_DAILY_AT, using default");
            defaults.daily_at
        });

        let timezone = parse_timezone(&self.timezone).unwrap_or_else(|e| {
            tracing::warn!(value = %self.timezone, error = %e, "Invalid BACKUP_TIMEZONE, using UTC");
            defaults.timezone
        });

        SchedulePolicy {
            interval,
            daily_at,
            timezone,
            run_on_startup: self.run_on_startup,
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            path_timeout: Duration::from_secs(self.path_timeout_secs.max(1)),
            include_message_logs: self.include_message_logs,
        }
    }
}
