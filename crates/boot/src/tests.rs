use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use kindling_domain::{Component, Family, Format, Initializer, LoggerConfig};
use metrics::{
    atomics::AtomicU64, Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder,
    SharedString, Unit,
};
use tempfile::TempDir;

use crate::{BootError, BootSource, Kindling};

/// Keeps one atomic per counter series, keyed `name{label=value,...}`.
#[derive(Default)]
struct CountingRecorder {
    counters: Mutex<HashMap<String, Arc<AtomicU64>>>,
}

impl CountingRecorder {
    fn value(&self, name: &str, family: &str) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .get(&format!("{name}{{family={family}}}"))
            .map_or(0, |counter| counter.load(std::sync::atomic::Ordering::Acquire))
    }
}

impl Recorder for CountingRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        let labels: Vec<String> = key
            .labels()
            .map(|label| format!("{}={}", label.key(), label.value()))
            .collect();
        let series = format!("{}{{{}}}", key.name(), labels.join(","));
        let counter = Arc::clone(self.counters.lock().unwrap().entry(series).or_default());
        Counter::from_arc(counter)
    }

    fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

const FULL_DOC: &str = r#"
[kindling.redis.main]
addr = "127.0.0.1:6379"

[kindling.database.primary]
url = "sqlite::memory:"
max_connections = 1

[kindling.tdengine.metrics]
url = "http://127.0.0.1:6041"
"#;

#[tokio::test]
async fn empty_document_boots_with_no_components() {
    let mut kindling = Kindling::new();
    kindling
        .boot(BootSource::bytes(b"[kindling]\n".to_vec()))
        .await
        .expect("boot succeeds");

    assert!(kindling.is_booted());
    assert!(kindling.components().is_empty());
    for family in [Family::Logger, Family::Cache, Family::Relational, Family::TimeSeries] {
        assert_eq!(kindling.components().family_len(family), 0);
    }
}

#[tokio::test]
async fn registers_every_declared_component() {
    let mut kindling = Kindling::new();
    kindling
        .boot(BootSource::bytes(FULL_DOC))
        .await
        .expect("boot succeeds");

    assert_eq!(kindling.components().len(), 3);
    assert!(kindling.redis("main").is_some());
    assert!(kindling.database("primary").is_some());
    assert_eq!(
        kindling
            .tdengine("metrics")
            .map(|client| client.endpoint().as_str()),
        Some("http://127.0.0.1:6041/rest/sql")
    );
    kindling
        .database("primary")
        .unwrap()
        .ping()
        .await
        .expect("sqlite answers");

    kindling.shutdown().await.expect("shutdown succeeds");
}

#[tokio::test]
async fn unknown_keys_are_not_found() {
    let mut kindling = Kindling::new();
    kindling
        .boot(BootSource::bytes(FULL_DOC))
        .await
        .expect("boot succeeds");

    assert!(kindling.redis("missing").is_none());
    assert!(kindling.logger("main").is_none());
    assert!(kindling.components().get(Family::Cache, "primary").is_none());
}

#[tokio::test]
async fn relational_failure_keeps_earlier_stages_and_skips_later_ones() {
    let doc = r#"
[kindling.redis.main]
addr = "127.0.0.1:6379"

[kindling.database.primary]
url = "sqlite::memory:"

[kindling.database.broken]
url = "bogus://nowhere"

[kindling.tdengine.metrics]
url = "http://127.0.0.1:6041"
"#;
    let mut kindling = Kindling::new();
    let err = kindling
        .boot(BootSource::bytes(doc))
        .await
        .unwrap_err();

    match &err {
        BootError::Init { family, key, .. } => {
            assert_eq!(*family, Family::Relational);
            assert_eq!(key, "broken");
        }
        other => panic!("unexpected error {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("init relational error"), "{message}");
    assert!(message.contains("`broken`"), "{message}");

    assert!(!kindling.is_booted());
    assert!(kindling.redis("main").is_some());
    assert!(kindling.database("broken").is_none());
    assert_eq!(kindling.components().family_len(Family::TimeSeries), 0);
}

#[tokio::test]
async fn reboot_keeps_components_from_previous_boot() {
    let mut kindling = Kindling::new();
    kindling
        .boot(BootSource::bytes("[kindling.redis.first]\naddr = \"h1:6379\"\n"))
        .await
        .expect("first boot");
    assert!(kindling.is_booted());

    kindling
        .boot(BootSource::bytes("[kindling.redis.second]\naddr = \"h2:6379\"\n"))
        .await
        .expect("second boot");

    assert!(kindling.is_booted());
    assert!(kindling.redis("first").is_some());
    assert!(kindling.redis("second").is_some());
    assert!(!kindling.config().kindling.redis.contains_key("first"));
}

#[tokio::test]
async fn failed_reboot_clears_flag_but_not_components() {
    let mut kindling = Kindling::new();
    kindling
        .boot(BootSource::bytes("[kindling.redis.main]\naddr = \"h1:6379\"\n"))
        .await
        .expect("first boot");

    let err = kindling
        .boot(BootSource::bytes("{{{ definitely not a config"))
        .await
        .unwrap_err();
    assert!(matches!(err, BootError::Decode(_)));

    assert!(!kindling.is_booted());
    assert!(kindling.redis("main").is_some());
    assert!(kindling.config().kindling.redis.contains_key("main"));
}

#[tokio::test]
async fn shutdown_before_boot_is_a_no_op() {
    let mut kindling = Kindling::new();
    kindling.shutdown().await.expect("nothing to shut down");
    assert!(!kindling.is_booted());
    assert!(kindling.components().is_empty());
}

#[tokio::test]
async fn shutdown_closes_components_and_keeps_flag() {
    let mut kindling = Kindling::new();
    kindling
        .boot(BootSource::bytes(FULL_DOC))
        .await
        .expect("boot succeeds");

    kindling.shutdown().await.expect("shutdown succeeds");
    assert!(kindling.components().is_empty());
    assert!(kindling.is_booted());

    kindling.shutdown().await.expect("second shutdown succeeds");
}

#[tokio::test]
async fn boots_from_file_path() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "kindling:\n  debug: true\n  redis:\n    main:\n      addr: h1:6379\n")
        .expect("write config");

    let mut kindling = Kindling::new();
    kindling.boot(path.as_path()).await.expect("boot succeeds");
    assert!(kindling.is_debug());
    assert!(kindling.redis("main").is_some());
}

#[tokio::test]
async fn missing_file_is_reported_distinctly() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("absent.toml");
    let mut kindling = Kindling::new();
    let err = kindling.boot(path.clone()).await.unwrap_err();
    assert!(matches!(err, BootError::MissingFile { path: ref missing } if *missing == path));
}

#[tokio::test]
async fn format_hint_disables_fallback() {
    let mut kindling = Kindling::new().with_format(Format::Json);
    let err = kindling
        .boot(BootSource::bytes("[kindling]\ndebug = true\n"))
        .await
        .unwrap_err();
    assert!(matches!(err, BootError::Format(_)));

    kindling
        .boot(BootSource::bytes(r#"{"kindling": {"debug": true}}"#))
        .await
        .expect("json boots");
    assert!(kindling.is_debug());
}

#[tokio::test]
async fn boots_logger_family() {
    let dir = TempDir::new().expect("temp dir");
    let log_path = dir.path().join("app.log");
    let doc = format!(
        "[kindling.logger.app]\ndebug = true\nlevel = \"info\"\npath = {:?}\n",
        log_path.to_string_lossy()
    );

    let mut kindling = Kindling::new();
    kindling
        .boot(BootSource::bytes(doc))
        .await
        .expect("boot succeeds");

    let logger = kindling.logger("app").expect("logger registered");
    logger.in_scope(|| tracing::info!("booted through kindling"));
    kindling.shutdown().await.expect("shutdown succeeds");

    let contents = std::fs::read_to_string(&log_path).expect("log written");
    assert!(contents.contains("booted through kindling"), "{contents}");
}

#[tokio::test]
async fn debug_boot_log_masks_credentials() {
    let dir = TempDir::new().expect("temp dir");
    let log_path = dir.path().join("boot.log");
    let logger = LoggerConfig {
        debug: true,
        level: "debug".into(),
        path: log_path.to_string_lossy().into_owned(),
    }
    .init()
    .await
    .expect("logger inits");

    let doc = r#"
[kindling]
debug = true

[kindling.redis.main]
addr = "127.0.0.1:6379"
password = "s3cr3t-pass"

[kindling.tdengine.metrics]
url = "http://127.0.0.1:6041"
password = "td-secret"
"#;
    let mut kindling = Kindling::new();
    {
        let _default = tracing::dispatcher::set_default(logger.dispatch());
        kindling
            .boot(BootSource::bytes(doc))
            .await
            .expect("boot succeeds");
    }
    logger.close().await.expect("logger closes");

    let contents = std::fs::read_to_string(&log_path).expect("log written");
    assert!(contents.contains("decoded kindling configuration"), "{contents}");
    assert!(!contents.contains("s3cr3t-pass"), "{contents}");
    assert!(!contents.contains("td-secret"), "{contents}");
    assert!(contents.contains("***"), "{contents}");
}

// fsync on /dev/null fails with EINVAL, which makes the logger's close fail.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn shutdown_reports_close_failures_after_closing_everything() {
    let recorder = CountingRecorder::default();
    let _local = metrics::set_default_local_recorder(&recorder);

    let doc = r#"
[kindling.logger.sink]
path = "/dev/null"

[kindling.redis.main]
addr = "127.0.0.1:6379"
"#;
    let mut kindling = Kindling::new();
    kindling
        .boot(BootSource::bytes(doc))
        .await
        .expect("boot succeeds");
    assert_eq!(
        recorder.value("kindling_components_initialized_total", "logger"),
        1
    );
    assert_eq!(
        recorder.value("kindling_components_initialized_total", "cache"),
        1
    );

    let err = kindling.shutdown().await.unwrap_err();
    let BootError::Shutdown(close) = &err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(close.failures().len(), 1);
    assert_eq!(close.failures()[0].family, Family::Logger);
    assert_eq!(close.failures()[0].key, "sink");
    assert!(err.to_string().contains("logger `sink`"), "{err}");

    assert!(kindling.components().is_empty());
    assert!(kindling.is_booted());
    assert_eq!(
        recorder.value("kindling_component_close_failures_total", "logger"),
        1
    );
    assert_eq!(
        recorder.value("kindling_component_close_failures_total", "cache"),
        0
    );
}
