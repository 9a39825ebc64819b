use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reseed_core::config::{ConnectionConfig, SourceConfig};
use reseed_core::logging::capture::capture;
use reseed_core::{DatabaseName, RetryPolicy};
use reseed_database::{DatabaseController, SharedConnection, SqliteConnector};
use reseed_scheduler::Refresher;
use reseed_transfer::{DisabledSnapshots, FileTransfer, SnapshotProvider};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    source: PathBuf,
    destination_dir: PathBuf,
    connection: Arc<SharedConnection>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("exports").join("reporting.db");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        write_source(&source, 3);

        let destination_dir = dir.path().join("live");
        let connection = Arc::new(SharedConnection::new(SqliteConnector::new(
            ConnectionConfig::default(),
        )));
        Self {
            _dir: dir,
            source,
            destination_dir,
            connection,
        }
    }

    fn refresher(&self, snapshots: Arc<dyn SnapshotProvider>) -> Refresher {
        let retry = RetryPolicy::new(2, Duration::from_millis(1));
        let database = DatabaseController::new(
            Arc::clone(&self.connection),
            DatabaseName::new("reporting").unwrap(),
            retry,
        );
        let transfer = FileTransfer::new(snapshots, retry).with_verification(true);
        Refresher::new(
            database,
            transfer,
            &SourceConfig {
                file: self.source.clone(),
                destination_dir: self.destination_dir.clone(),
            },
        )
    }
}

fn write_source(path: &Path, rows: u32) {
    let _ = std::fs::remove_file(path);
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch("CREATE TABLE readings (id INTEGER PRIMARY KEY, value TEXT);")
        .unwrap();
    for i in 0..rows {
        conn.execute("INSERT INTO readings (value) VALUES (?1)", [format!("r{i}")])
            .unwrap();
    }
}

fn row_count(path: &Path) -> i64 {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.query_row("SELECT count(*) FROM readings", [], |r| r.get(0))
        .unwrap()
}

#[tokio::test]
async fn first_refresh_creates_destination_and_attaches() {
    let fx = Fixture::new();
    let refresher = fx.refresher(Arc::new(DisabledSnapshots));

    assert!(!fx.destination_dir.exists());
    assert!(refresher.refresh().await);

    let live = fx.destination_dir.join("reporting.db");
    assert_eq!(refresher.destination(), live.as_path());
    assert_eq!(row_count(&live), 3);
    assert!(refresher.database().exists().await.unwrap());
    assert!(!refresher.state().is_in_progress());
}

#[tokio::test]
async fn repeated_refresh_picks_up_new_source_contents() {
    let fx = Fixture::new();
    let refresher = fx.refresher(Arc::new(DisabledSnapshots));

    assert!(refresher.refresh().await);
    write_source(&fx.source, 7);
    assert!(refresher.refresh().await);

    assert_eq!(row_count(&fx.destination_dir.join("reporting.db")), 7);
    assert!(refresher.database().exists().await.unwrap());
}

#[tokio::test]
async fn missing_source_leaves_database_dropped() {
    let fx = Fixture::new();
    let refresher = fx.refresher(Arc::new(DisabledSnapshots));
    assert!(refresher.refresh().await);

    std::fs::remove_file(&fx.source).unwrap();
    let (logs, _guard) = capture();
    assert!(!refresher.refresh().await);

    assert!(!refresher.database().exists().await.unwrap());
    assert!(!refresher.state().is_in_progress());
    assert_eq!(logs.count("Database refresh failed"), 1);
    assert_eq!(
        logs.count(" - ERROR - Fallback copy operation failed after 2 attempts"),
        1
    );
    assert_eq!(logs.count("Database creation"), 0);
}

#[tokio::test]
async fn trigger_while_running_is_a_no_op() {
    let fx = Fixture::new();
    let refresher = fx.refresher(Arc::new(DisabledSnapshots));

    let guard = refresher.state().try_begin().unwrap();
    let (logs, _log_guard) = capture();
    assert!(!refresher.refresh().await);
    drop(guard);

    assert_eq!(logs.count("Refresh already in progress"), 1);
    assert!(!fx.destination_dir.exists());
    assert!(!refresher.database().exists().await.unwrap());
}

#[cfg(unix)]
#[tokio::test]
async fn command_snapshot_is_used_when_available() {
    use reseed_transfer::command::CommandSnapshotProvider;

    let fx = Fixture::new();
    let snapshots = CommandSnapshotProvider::new(
        r#"printf '%s\n' "$RESEED_SNAPSHOT_DIR""#.to_string(),
        None,
        Duration::from_secs(10),
    );
    let refresher = fx.refresher(Arc::new(snapshots));

    let (logs, _guard) = capture();
    assert!(refresher.refresh().await);
    assert_eq!(logs.count("VSS copy operation succeeded on attempt 1"), 1);
    assert_eq!(logs.count("Fallback copy operation"), 0);
    assert!(logs.count("method=snapshot") >= 1);
}

#[cfg(unix)]
#[tokio::test]
async fn failing_snapshot_falls_back_to_direct_copy() {
    use reseed_transfer::command::CommandSnapshotProvider;

    let fx = Fixture::new();
    let snapshots =
        CommandSnapshotProvider::new("exit 3".to_string(), None, Duration::from_secs(10));
    let refresher = fx.refresher(Arc::new(snapshots));

    let (logs, _guard) = capture();
    assert!(refresher.refresh().await);
    assert_eq!(
        logs.count(" - ERROR - VSS copy operation failed after 2 attempts"),
        1
    );
    assert_eq!(logs.count("Fallback copy operation succeeded on attempt 1"), 1);
    assert!(logs.count("method=direct") >= 1);
    assert_eq!(row_count(&fx.destination_dir.join("reporting.db")), 3);
}
