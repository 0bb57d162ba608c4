mod common;

use std::sync::Arc;
use std::time::Duration;

use backup_server::backup::render::{
    ALL_CLIENTS_PATH, IPTV_CLIENTS_PATH, MESSAGE_LOGS_PATH, NOTIFIER_CONFIG_PATH, README_PATH,
    VPN_CLIENTS_PATH,
};
use backup_server::backup::{
    BackupSynchronizer, FileStatus, SqliteRecordSource, StateSnapshot, SyncError, SyncOptions,
    SyncTrigger,
};
use backup_server::db::DbService;
use backup_server::db::repository::{notifier_config, subscription};
use chrono::{NaiveDate, TimeZone, Utc};
use common::{MemoryRemote, StaticSource, mixed_records, options, records, snapshotter};
use shared::models::{
    MessageLog, MessageStatus, NotifierConfig, NotifierConfigUpdate, ProductCategory,
    SubscriptionCreate,
};

const DEFAULT_PATHS: [&str; 5] = [
    IPTV_CLIENTS_PATH,
    VPN_CLIENTS_PATH,
    ALL_CLIENTS_PATH,
    NOTIFIER_CONFIG_PATH,
    README_PATH,
];

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 2, 0, 0).unwrap()
}

fn json_ids(bytes: &[u8]) -> Vec<i64> {
    let value: serde_json::Value = serde_json::from_slice(bytes).unwrap();
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_two_iptv_three_vpn_uploads_five_files() {
    let source = Arc::new(StaticSource::new(mixed_records()));
    let remote = Arc::new(MemoryRemote::new());
    let synchronizer = BackupSynchronizer::new(remote.clone(), options());

    let snapshot = snapshotter(source).capture(now()).await.unwrap();
    let report = synchronizer.run(&snapshot, SyncTrigger::Manual).await.unwrap();

    assert!(report.overall_ok);
    assert_eq!(report.files.len(), 5);
    let uploaded: Vec<_> = remote.upserts().iter().map(|u| u.path.clone()).collect();
    assert_eq!(uploaded, DEFAULT_PATHS);

    assert_eq!(report.summary.total_subscriptions, 5);
    assert_eq!(report.summary.by_category[&ProductCategory::Iptv], 2);
    assert_eq!(report.summary.by_category[&ProductCategory::Vpn], 3);

    // Full list keeps capture order
    assert_eq!(json_ids(&remote.content(ALL_CLIENTS_PATH).unwrap()), vec![1, 2, 3, 4, 5]);
    assert_eq!(json_ids(&remote.content(IPTV_CLIENTS_PATH).unwrap()), vec![1, 3]);
    assert_eq!(json_ids(&remote.content(VPN_CLIENTS_PATH).unwrap()), vec![2, 4, 5]);

    let readme = String::from_utf8(remote.content(README_PATH).unwrap()).unwrap();
    assert!(readme.contains("- **Total clients:** 5"));
    assert!(readme.contains("- **IPTV clients:** 2"));
    assert!(readme.contains("- **VPN clients:** 3"));
    assert!(readme.contains("2026-06-01T02:00:00.000Z"));

    let messages: Vec<_> = remote.upserts().iter().map(|u| u.message.clone()).collect();
    assert_eq!(messages[0], "Automatic backup - IPTV clients (2 clients)");
    assert_eq!(messages[1], "Automatic backup - VPN clients (3 clients)");
}

#[tokio::test]
async fn test_unchanged_snapshot_produces_identical_content() {
    let source = Arc::new(StaticSource::new(mixed_records()));
    let remote = Arc::new(MemoryRemote::new());
    let synchronizer = BackupSynchronizer::new(remote.clone(), options());
    let snapshotter = snapshotter(source);

    let first = synchronizer
        .run(&snapshotter.capture(now()).await.unwrap(), SyncTrigger::Interval)
        .await
        .unwrap();
    let second = synchronizer
        .run(&snapshotter.capture(now()).await.unwrap(), SyncTrigger::Interval)
        .await
        .unwrap();
    assert!(first.overall_ok && second.overall_ok);

    let upserts = remote.upserts();
    assert_eq!(upserts.len(), 10);
    for (a, b) in upserts[..5].iter().zip(&upserts[5..]) {
        assert_eq!(a.path, b.path);
        assert_eq!(a.content, b.content, "content drifted for {}", a.path);
    }

    // Revisions still advance
    for path in DEFAULT_PATHS {
        assert_ne!(first.status_of(path), second.status_of(path));
        // Second write was made against the first write's revision
        let FileStatus::Ok { revision } = first.status_of(path).unwrap() else {
            panic!("{path} failed on first run");
        };
        let second_call = upserts[5..].iter().find(|u| u.path == path).unwrap();
        assert_eq!(second_call.revision.as_ref(), Some(revision));
    }
}

#[tokio::test]
async fn test_transport_error_on_one_path_does_not_skip_others() {
    let source = Arc::new(StaticSource::new(mixed_records()));
    let remote = Arc::new(MemoryRemote::new());
    remote.fail_path(VPN_CLIENTS_PATH);
    let synchronizer = BackupSynchronizer::new(remote.clone(), options());

    let snapshot = snapshotter(source).capture(now()).await.unwrap();
    let report = synchronizer.run(&snapshot, SyncTrigger::Mutation).await.unwrap();

    assert!(!report.overall_ok);
    assert!(matches!(
        report.status_of(VPN_CLIENTS_PATH),
        Some(FileStatus::TransportError { .. })
    ));
    for path in [IPTV_CLIENTS_PATH, ALL_CLIENTS_PATH, NOTIFIER_CONFIG_PATH, README_PATH] {
        assert!(report.status_of(path).unwrap().is_ok(), "{path} should succeed");
    }
    // Paths after the failed one were still attempted, in order
    assert_eq!(remote.lookups(), DEFAULT_PATHS);
    assert_eq!(remote.upserts().len(), 4);

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(&failures[0], SyncError::Transport { path, .. } if path == VPN_CLIENTS_PATH));
}

#[tokio::test]
async fn test_configuration_file_never_contains_secrets() {
    let secrets = [
        ("session-token-abc", "2@QRPAIRING=="),
        ("{\"creds\":{\"noiseKey\":\"xyz\"}}", "pairing-777"),
        ("", ""),
    ];

    for (session, qr) in secrets {
        let mut config = NotifierConfig::with_defaults(1, 0);
        config.session_data = Some(session.to_string());
        config.qr_code = Some(qr.to_string());
        config.connection_status = "connected".to_string();
        let mut input = records(Vec::new());
        input.config = config;

        let source = Arc::new(StaticSource::new(input));
        let remote = Arc::new(MemoryRemote::new());
        let synchronizer = BackupSynchronizer::new(remote.clone(), options());
        let snapshot = snapshotter(source).capture(now()).await.unwrap();
        synchronizer.run(&snapshot, SyncTrigger::Manual).await.unwrap();

        let body = String::from_utf8(remote.content(NOTIFIER_CONFIG_PATH).unwrap()).unwrap();
        assert!(!body.contains("session_data"));
        assert!(!body.contains("qr_code"));
        if !session.is_empty() {
            assert!(!body.contains(session));
            assert!(!body.contains(qr));
        }
        assert!(body.contains("\"connection_status\": \"connected\""));

        // No other file leaks them either
        for upsert in remote.upserts() {
            let text = String::from_utf8(upsert.content).unwrap();
            assert!(!text.contains("session_data"), "{} leaked", upsert.path);
        }
    }
}

#[tokio::test]
async fn test_conflict_heals_on_next_run() {
    let source = Arc::new(StaticSource::new(mixed_records()));
    let remote = Arc::new(MemoryRemote::new());
    let synchronizer = BackupSynchronizer::new(remote.clone(), options());
    let snapshotter = snapshotter(source);

    // Seed the remote so the path exists
    let seeded = synchronizer
        .run(&snapshotter.capture(now()).await.unwrap(), SyncTrigger::Startup)
        .await
        .unwrap();
    assert!(seeded.overall_ok);

    // Run K: another writer moves the revision between lookup and upsert
    remote.race_next_write(ALL_CLIENTS_PATH);
    let run_k = synchronizer
        .run(&snapshotter.capture(now()).await.unwrap(), SyncTrigger::Interval)
        .await
        .unwrap();
    assert!(!run_k.overall_ok);
    assert!(matches!(
        run_k.status_of(ALL_CLIENTS_PATH),
        Some(FileStatus::Conflict { .. })
    ));
    assert!(matches!(
        run_k.failures().next(),
        Some(SyncError::PathConflict { path }) if path == ALL_CLIENTS_PATH
    ));
    assert!(run_k.status_of(README_PATH).unwrap().is_ok());

    // Run K+1 re-reads the current revision
    let run_k1 = synchronizer
        .run(&snapshotter.capture(now()).await.unwrap(), SyncTrigger::Interval)
        .await
        .unwrap();
    assert!(run_k1.overall_ok);
    assert_eq!(
        run_k1.status_of(ALL_CLIENTS_PATH),
        Some(&FileStatus::Ok {
            revision: remote.revision(ALL_CLIENTS_PATH).unwrap()
        })
    );
}

#[tokio::test]
async fn test_empty_system_uploads_valid_files() {
    let source = Arc::new(StaticSource::new(records(Vec::new())));
    let remote = Arc::new(MemoryRemote::new());
    let synchronizer = BackupSynchronizer::new(remote.clone(), options());

    let snapshot = snapshotter(source).capture(now()).await.unwrap();
    assert!(snapshot.subscriptions().is_empty());
    assert_eq!(snapshot.summary().total_subscriptions, 0);
    assert_eq!(snapshot.summary().total_logs, 0);

    let report = synchronizer.run(&snapshot, SyncTrigger::Manual).await.unwrap();
    assert!(report.overall_ok);
    assert_eq!(report.files.len(), 5);

    for path in [IPTV_CLIENTS_PATH, VPN_CLIENTS_PATH, ALL_CLIENTS_PATH] {
        let body = remote.content(path).unwrap();
        assert_eq!(body, b"[]\n");
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed.as_array().unwrap().is_empty());
    }
    let config: serde_json::Value =
        serde_json::from_slice(&remote.content(NOTIFIER_CONFIG_PATH).unwrap()).unwrap();
    assert!(config.is_object());
    let readme = String::from_utf8(remote.content(README_PATH).unwrap()).unwrap();
    assert!(readme.contains("- **Total clients:** 0"));
}

#[tokio::test]
async fn test_unreadable_source_aborts_before_upload() {
    let source = Arc::new(StaticSource::new(mixed_records()));
    source.set_unavailable(true);

    let err = snapshotter(source).capture(now()).await.unwrap_err();
    assert!(matches!(err, SyncError::DataUnavailable(_)));
}

#[tokio::test(start_paused = true)]
async fn test_path_deadline_expiry_is_transport_error() {
    let source = Arc::new(StaticSource::new(mixed_records()));
    let remote = Arc::new(MemoryRemote::new());
    remote.close_gate();
    let synchronizer = BackupSynchronizer::new(
        remote.clone(),
        SyncOptions {
            path_timeout: Duration::from_millis(200),
            include_message_logs: false,
        },
    );

    let snapshot = snapshotter(source).capture(now()).await.unwrap();
    let report = synchronizer.run(&snapshot, SyncTrigger::Manual).await.unwrap();

    assert!(!report.overall_ok);
    assert_eq!(report.files.len(), 5);
    for outcome in &report.files {
        match &outcome.status {
            FileStatus::TransportError { message } => assert!(message.contains("Timed out")),
            other => panic!("{} unexpectedly {:?}", outcome.path, other),
        }
    }
    assert!(remote.upserts().is_empty());
}

#[tokio::test]
async fn test_message_logs_file_when_enabled() {
    let source = Arc::new(StaticSource::new(mixed_records()));
    let remote = Arc::new(MemoryRemote::new());
    let synchronizer = BackupSynchronizer::new(
        remote.clone(),
        SyncOptions {
            include_message_logs: true,
            ..options()
        },
    );

    let snapshot = snapshotter(source).capture(now()).await.unwrap();
    let report = synchronizer.run(&snapshot, SyncTrigger::Manual).await.unwrap();
    assert!(report.overall_ok);
    assert_eq!(report.files.len(), 6);
    assert_eq!(remote.content(MESSAGE_LOGS_PATH).unwrap(), b"[]\n");
}

#[tokio::test]
async fn test_backup_files_keep_every_non_secret_field() {
    let mut input = mixed_records();
    input.config.id = 9;
    input.config.session_data = Some("session-token-abc".to_string());
    input.message_logs = vec![MessageLog {
        id: 41,
        client_id: Some(1),
        phone: "+34600000001".to_string(),
        message_content: "Your plan expires tomorrow".to_string(),
        status: MessageStatus::Sent,
        sent_at: Some(1_767_225_660_000),
        error_message: None,
        provider_message_id: Some("wamid.HBgLMzQ2".to_string()),
        created_at: 1_767_225_600_000,
    }];

    let source = Arc::new(StaticSource::new(input));
    let remote = Arc::new(MemoryRemote::new());
    let synchronizer = BackupSynchronizer::new(
        remote.clone(),
        SyncOptions {
            include_message_logs: true,
            ..options()
        },
    );
    let snapshot = snapshotter(source).capture(now()).await.unwrap();
    synchronizer.run(&snapshot, SyncTrigger::Manual).await.unwrap();

    let config: serde_json::Value =
        serde_json::from_slice(&remote.content(NOTIFIER_CONFIG_PATH).unwrap()).unwrap();
    assert_eq!(config["id"], 9);
    assert_eq!(config["created_at"], "2026-01-01T00:00:00.000Z");
    assert!(config.get("session_data").is_none());

    let logs: serde_json::Value =
        serde_json::from_slice(&remote.content(MESSAGE_LOGS_PATH).unwrap()).unwrap();
    assert_eq!(logs[0]["id"], 41);
    assert_eq!(logs[0]["provider_message_id"], "wamid.HBgLMzQ2");
    assert_eq!(logs[0]["status"], "sent");
}

#[tokio::test]
async fn test_sqlite_source_end_to_end() {
    let db = DbService::in_memory().await.unwrap();
    for (name, category) in [
        ("Ana", ProductCategory::Iptv),
        ("Bruno", ProductCategory::Vpn),
        ("Carla", ProductCategory::Vpn),
    ] {
        subscription::create(
            &db.pool,
            SubscriptionCreate {
                name: name.to_string(),
                phone: "+5511987654321".to_string(),
                product_type: category,
                plan: "Monthly".to_string(),
                value: 35.0,
                expiry_date: NaiveDate::from_ymd_opt(2026, 6, 11).unwrap(),
                notification_time: Some("10:30".to_string()),
                custom_message: None,
                status: None,
            },
        )
        .await
        .unwrap();
    }
    notifier_config::update(
        &db.pool,
        NotifierConfigUpdate {
            session_data: Some("live-session-secret".to_string()),
            qr_code: Some("live-pairing-code".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let snapshotter = StateSnapshot::new(
        Arc::new(SqliteRecordSource::new(db.pool.clone())),
        chrono_tz::UTC,
        1000,
    );
    let remote = Arc::new(MemoryRemote::new());
    let synchronizer = BackupSynchronizer::new(remote.clone(), options());

    let snapshot = snapshotter.capture(now()).await.unwrap();
    let report = synchronizer.run(&snapshot, SyncTrigger::Manual).await.unwrap();
    assert!(report.overall_ok);
    assert_eq!(report.summary.total_subscriptions, 3);

    let all: serde_json::Value =
        serde_json::from_slice(&remote.content(ALL_CLIENTS_PATH).unwrap()).unwrap();
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0]["days_until_expiry"], 10);
    assert_eq!(all[0]["is_expired"], false);
    assert_eq!(all[0]["expiry_date"], "2026-06-11");

    let config = String::from_utf8(remote.content(NOTIFIER_CONFIG_PATH).unwrap()).unwrap();
    assert!(!config.contains("live-session-secret"));
    assert!(!config.contains("live-pairing-code"));
}
