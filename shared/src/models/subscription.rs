//! Subscription Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Product category (订阅产品分类)
///
/// Each category owns one partitioned backup file. Adding a variant means
/// adding it to [`ProductCategory::ALL`] as well.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "UPPERCASE"))]
pub enum ProductCategory {
    Iptv,
    Vpn,
}

impl ProductCategory {
    /// All known categories, in backup file order
    pub const ALL: [ProductCategory; 2] = [ProductCategory::Iptv, ProductCategory::Vpn];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Iptv => "IPTV",
            ProductCategory::Vpn => "VPN",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Expired,
    Renewed,
    Suspended,
}

/// Subscription entity (订阅记录)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Subscription {
    pub id: i64,
    /// Holder name
    pub name: String,
    /// Contact handle (phone number)
    pub phone: String,
    pub product_type: ProductCategory,
    /// Plan label, e.g. "Monthly"
    pub plan: String,
    /// Monetary value, never negative
    pub value: f64,
    pub expiry_date: NaiveDate,
    /// Notification time of day "HH:MM"
    pub notification_time: String,
    pub custom_message: Option<String>,
    pub status: SubscriptionStatus,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_notification_sent: Option<i64>,
}

impl Subscription {
    /// Days from `today` until expiry (negative when past due)
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry_date - today).num_days()
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }
}

/// Create subscription payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionCreate {
    pub name: String,
    pub phone: String,
    pub product_type: ProductCategory,
    pub plan: String,
    pub value: f64,
    pub expiry_date: NaiveDate,
    pub notification_time: Option<String>,
    pub custom_message: Option<String>,
    pub status: Option<SubscriptionStatus>,
}

/// Default notification time of day
pub const DEFAULT_NOTIFICATION_TIME: &str = "09:00";
