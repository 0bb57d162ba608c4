//! Backup file rendering
//!
//! Turns a [`Snapshot`] into the fixed set of remote files. Rendering is a
//! pure function of the snapshot: the same snapshot always yields the same
//! bytes for every path.

use std::fmt::Write as _;

use serde::Serialize;
use shared::models::ProductCategory;

use super::error::SyncError;
use super::snapshot::Snapshot;

pub const IPTV_CLIENTS_PATH: &str = "data/clients/iptv_clients.json";
pub const VPN_CLIENTS_PATH: &str = "data/clients/vpn_clients.json";
pub const ALL_CLIENTS_PATH: &str = "data/clients/all_clients.json";
pub const NOTIFIER_CONFIG_PATH: &str = "data/config/notifier_config.json";
pub const README_PATH: &str = "README.md";
/// Only written when message logs are included
pub const MESSAGE_LOGS_PATH: &str = "data/logs/recent_message_logs.json";

/// Partition file of one category
pub fn category_path(category: ProductCategory) -> &'static str {
    match category {
        ProductCategory::Iptv => IPTV_CLIENTS_PATH,
        ProductCategory::Vpn => VPN_CLIENTS_PATH,
    }
}

/// One file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub path: &'static str,
    pub content: Vec<u8>,
    /// Commit message
    pub message: String,
}

/// Pretty JSON (2-space indent) with trailing newline
pub fn to_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, SyncError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text.into_bytes())
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "client" } else { "clients" }
}

/// Render every backup file of `snapshot`, in upload order
pub fn render_files(
    snapshot: &Snapshot,
    include_message_logs: bool,
) -> Result<Vec<BackupFile>, SyncError> {
    let mut files = Vec::with_capacity(6);

    for category in ProductCategory::ALL {
        let list = snapshot.category(category);
        files.push(BackupFile {
            path: category_path(category),
            content: to_canonical_json(list)?,
            message: format!(
                "Automatic backup - {category} clients ({} {})",
                list.len(),
                plural(list.len())
            ),
        });
    }

    let all = snapshot.subscriptions();
    files.push(BackupFile {
        path: ALL_CLIENTS_PATH,
        content: to_canonical_json(all)?,
        message: format!(
            "Automatic backup - all clients ({} {})",
            all.len(),
            plural(all.len())
        ),
    });

    files.push(BackupFile {
        path: NOTIFIER_CONFIG_PATH,
        content: to_canonical_json(snapshot.config())?,
        message: "Automatic backup - notifier configuration".to_string(),
    });

    if include_message_logs {
        let logs = snapshot.message_logs();
        files.push(BackupFile {
            path: MESSAGE_LOGS_PATH,
            content: to_canonical_json(logs)?,
            message: format!("Automatic backup - message logs ({} entries)", logs.len()),
        });
    }

    files.push(BackupFile {
        path: README_PATH,
        content: render_readme(snapshot, include_message_logs)?.into_bytes(),
        message: "Automatic backup - status summary".to_string(),
    });

    Ok(files)
}

/// Human-readable status note for the repository root
pub fn render_readme(snapshot: &Snapshot, include_message_logs: bool) -> Result<String, SyncError> {
    let summary = snapshot.summary();
    let summary_json = serde_json::to_string_pretty(summary)?;

    // fmt::Write on String is infallible
    let mut out = String::new();
    let _ = writeln!(out, "# Subscription Backup");
    let _ = writeln!(out);
    let _ = writeln!(out, "Automatic backup of the subscription management system.");
    let _ = writeln!(out);
    let _ = writeln!(out, "## Status");
    let _ = writeln!(out);
    let _ = writeln!(out, "- **Last backup:** {}", summary.captured_at);
    let _ = writeln!(out, "- **Business date:** {}", snapshot.business_date());
    let _ = writeln!(out, "- **Total clients:** {}", summary.total_subscriptions);
    for (category, count) in &summary.by_category {
        let _ = writeln!(out, "- **{} clients:** {}", category, count);
    }
    let _ = writeln!(out, "- **Message logs considered:** {}", summary.total_logs);
    let _ = writeln!(out);
    let _ = writeln!(out, "## Layout");
    let _ = writeln!(out);
    let _ = writeln!(out, "```");
    let _ = writeln!(out, "data/");
    let _ = writeln!(out, "├── clients/");
    let _ = writeln!(out, "│   ├── iptv_clients.json");
    let _ = writeln!(out, "│   ├── vpn_clients.json");
    let _ = writeln!(out, "│   └── all_clients.json");
    if include_message_logs {
        let _ = writeln!(out, "├── config/");
        let _ = writeln!(out, "│   └── notifier_config.json");
        let _ = writeln!(out, "└── logs/");
        let _ = writeln!(out, "    └── recent_message_logs.json");
    } else {
        let _ = writeln!(out, "└── config/");
        let _ = writeln!(out, "    └── notifier_config.json");
    }
    let _ = writeln!(out, "```");
    let _ = writeln!(out);
    let _ = writeln!(out, "## Summary");
    let _ = writeln!(out);
    let _ = writeln!(out, "```json");
    let _ = writeln!(out, "{summary_json}");
    let _ = writeln!(out, "```");

    Ok(out)
}
