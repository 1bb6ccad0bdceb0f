use sip_counter_lib::db::{Database, DB_FILE_NAME};
use sip_counter_lib::models::{SipMethod, DEFAULT_VOLUME_ML};
use sip_counter_lib::sips::{to_csv, SipLog, CLEAR_PROMPT, SIPS_KEY};
use std::cell::RefCell;
use std::path::Path;

fn open_db(dir: &Path) -> Database {
    Database::new(dir.join(DB_FILE_NAME)).unwrap()
}

#[tokio::test]
async fn appends_keep_call_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = SipLog::load(open_db(dir.path())).await;
    let methods = [
        SipMethod::Tap,
        SipMethod::Timer,
        SipMethod::Camera,
        SipMethod::Tap,
        SipMethod::Timer,
    ];

    let mut appended = Vec::new();
    for method in methods {
        appended.push(log.append(method, DEFAULT_VOLUME_ML).await.unwrap());
    }

    assert_eq!(log.len(), methods.len());
    assert_eq!(log.records(), appended.as_slice());
    assert_eq!(
        log.records().iter().map(|r| r.method).collect::<Vec<_>>(),
        methods.to_vec()
    );
    assert!(log
        .records()
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    for (i, a) in log.records().iter().enumerate() {
        for b in &log.records()[i + 1..] {
            assert_ne!(a.id, b.id);
        }
    }
}

#[tokio::test]
async fn reload_reproduces_the_log() {
    let dir = tempfile::tempdir().unwrap();

    let original = {
        let mut log = SipLog::load(open_db(dir.path())).await;
        log.append(SipMethod::Tap, 30).await.unwrap();
        log.append(SipMethod::Camera, 30).await.unwrap();
        log.append(SipMethod::Timer, 45).await.unwrap();
        log.records().to_vec()
    };

    let reloaded = SipLog::load(open_db(dir.path())).await;

    assert_eq!(reloaded.records(), original.as_slice());
    assert_eq!(to_csv(reloaded.records()), to_csv(&original));
}

#[tokio::test]
async fn declined_clear_keeps_everything() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = SipLog::load(open_db(dir.path())).await;
    log.append(SipMethod::Tap, 30).await.unwrap();
    log.append(SipMethod::Tap, 30).await.unwrap();
    let revision = log.revision();
    let asked = RefCell::new(Vec::new());

    let cleared = log
        .clear(&|prompt: &str| {
            asked.borrow_mut().push(prompt.to_string());
            false
        })
        .await
        .unwrap();

    assert!(!cleared);
    assert_eq!(asked.into_inner(), vec![CLEAR_PROMPT.to_string()]);
    assert_eq!(log.len(), 2);
    assert_eq!(log.revision(), revision);
}

#[tokio::test]
async fn confirmed_clear_empties_the_persisted_log() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut log = SipLog::load(open_db(dir.path())).await;
        log.append(SipMethod::Tap, 30).await.unwrap();

        assert!(log.clear(&|_: &str| true).await.unwrap());
        assert!(log.is_empty());
    }

    let db = open_db(dir.path());
    assert_eq!(db.kv_get(SIPS_KEY).await.unwrap().as_deref(), Some("[]"));
    assert!(SipLog::load(db).await.is_empty());
}

#[tokio::test]
async fn corrupt_storage_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path());
    db.kv_put(SIPS_KEY, "{\"not\": \"a list\"".to_string())
        .await
        .unwrap();

    let mut log = SipLog::load(db).await;
    assert!(log.is_empty());

    // The next append replaces the corrupt value.
    log.append(SipMethod::Tap, 30).await.unwrap();
    let reloaded = SipLog::load(open_db(dir.path())).await;
    assert_eq!(reloaded.len(), 1);
}

#[tokio::test]
async fn loads_records_written_by_the_browser_app() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(dir.path());
    db.kv_put(
        SIPS_KEY,
        r#"[{"id":1700000000000.731,"timestamp":1700000000000,"method":"tap","volumeEstimate":30},
            {"id":1700000005000.02,"timestamp":1700000005000,"method":"timer","volumeEstimate":30}]"#
            .to_string(),
    )
    .await
    .unwrap();

    let log = SipLog::load(db).await;

    assert_eq!(log.len(), 2);
    assert_eq!(log.records()[1].method, SipMethod::Timer);
    assert_eq!(
        log.recent(1).next().map(|r| r.timestamp),
        Some(1_700_000_005_000)
    );
}

#[tokio::test]
async fn zero_volume_uses_default_estimate() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = SipLog::load(open_db(dir.path())).await;

    let record = log.append(SipMethod::Tap, 0).await.unwrap();

    assert_eq!(record.volume_estimate, DEFAULT_VOLUME_ML);
}

#[tokio::test]
async fn hourly_buckets_follow_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = SipLog::load(open_db(dir.path())).await;
    assert!(log.hourly().is_empty());

    log.append(SipMethod::Tap, 30).await.unwrap();
    log.append(SipMethod::Timer, 30).await.unwrap();
    let total: usize = log.hourly().iter().map(|b| b.count).sum();
    assert_eq!(total, 2);

    log.clear(&|_: &str| true).await.unwrap();
    assert!(log.hourly().is_empty());
}

#[tokio::test]
async fn summary_counts_methods_and_volume() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = SipLog::load(open_db(dir.path())).await;
    log.append(SipMethod::Tap, 30).await.unwrap();
    log.append(SipMethod::Tap, 50).await.unwrap();
    log.append(SipMethod::Camera, 30).await.unwrap();

    let summary = log.summary();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.total_ml, 110);
    assert_eq!((summary.tap, summary.timer, summary.camera), (2, 0, 1));
}
