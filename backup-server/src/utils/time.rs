//! 时间工具函数 (业务时区转换)
//!
//! 调度器的每日触发时间和快照的"今天"都按业务时区计算。

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// 解析时刻字符串 (HH:MM)
pub fn parse_time_of_day(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| AppError::validation(format!("Invalid time of day: {}", value)))
}

/// 解析 IANA 时区名 (e.g. "Europe/Madrid")
pub fn parse_timezone(value: &str) -> AppResult<Tz> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|_| AppError::validation(format!("Invalid time zone: {}", value)))
}

/// `now` 在业务时区下的日期
pub fn business_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// 计算距离下一次每日触发时刻的 Duration
///
/// 当前时间 >= 触发时刻 → 等到明天；否则今天。
/// 距离不足 1 秒视为已触发 (计时器提前唤醒)，同样顺延到明天。
pub fn duration_until_next_daily(
    daily_at: NaiveTime,
    tz: Tz,
    now: DateTime<Utc>,
) -> std::time::Duration {
    let local_now = now.with_timezone(&tz);
    let today = local_now.date_naive();

    let mut target_date = if local_now.time() >= daily_at {
        today + chrono::Duration::days(1)
    } else {
        today
    };

    let mut target = resolve_local(target_date, daily_at, tz);
    if target.signed_duration_since(local_now) < chrono::Duration::seconds(1) {
        target_date = target_date + chrono::Duration::days(1);
        target = resolve_local(target_date, daily_at, tz);
    }

    let duration = target.signed_duration_since(local_now);
    if duration <= chrono::Duration::zero() {
        return std::time::Duration::from_secs(60);
    }
    duration
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(60))
}

/// 把本地日期 + 时刻解析为时区内的时间点
///
/// 重复时刻 (夏令时回拨) 取较早的一次；不存在的时刻 (夏令时跳过) 向后顺延一小时。
fn resolve_local(date: NaiveDate, at: NaiveTime, tz: Tz) -> DateTime<Tz> {
    let naive = date.and_time(at);
    naive
        .and_local_timezone(tz)
        .earliest()
        .or_else(|| (naive + chrono::Duration::hours(1)).and_local_timezone(tz).earliest())
        .unwrap_or_else(|| {
            tracing::error!(%naive, "Cannot resolve local time for daily backup, treating as UTC");
            Utc.from_utc_datetime(&naive).with_timezone(&tz)
        })
}
