//! SQLite backend: the "server" is a catalog connection and the managed
//! database is a schema attached from the data file.
//!
//! | Statement         | SQL                                                  |
//! |-------------------|------------------------------------------------------|
//! | `DatabaseExists`  | `SELECT name FROM pragma_database_list WHERE name = ?1` |
//! | `DropDatabase`    | `ROLLBACK` (if a transaction is open), `DETACH DATABASE ?1` |
//! | `AttachDatabase`  | `ATTACH DATABASE ?1 AS ?2`, then a schema read        |
//!
//! SQLite replays a hot journal or WAL when it opens a file, which is the
//! standard log rebuild. The forced mode deletes the sidecar log files first.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reseed_core::config::ConnectionConfig;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::client::{Connector, DatabaseClient};
use crate::error::{DbError, DbErrorKind};
use crate::statement::{AttachMode, Recordset, Statement};

/// Sidecar files SQLite keeps next to a database.
const LOG_SUFFIXES: &[&str] = &["-wal", "-shm", "-journal"];

pub struct SqliteClient {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteClient {
    /// Open the catalog connection described by `config`.
    pub fn open(config: &ConnectionConfig) -> Result<Self, DbError> {
        let conn = Connection::open(&config.catalog)
            .map_err(|e| DbError::new(DbErrorKind::Connection, e.to_string()))?;
        conn.busy_timeout(config.busy_timeout())?;
        info!(catalog = %config.catalog, "opened SQLite catalog connection");
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn execute(&self, statement: &Statement) -> Result<Recordset, DbError> {
        let conn = Arc::clone(&self.conn);
        let statement = statement.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| DbError::new(DbErrorKind::Connection, "catalog connection lock poisoned"))?;
            let conn = guard.as_ref().ok_or_else(DbError::closed)?;
            run_statement(conn, &statement)
        })
        .await
        .map_err(|e| DbError::new(DbErrorKind::Connection, format!("statement task failed: {e}")))?
    }

    async fn close(&self) -> Result<(), DbError> {
        // The lock may be held by a statement running on a blocking thread.
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let taken = conn
                .lock()
                .map_err(|_| DbError::new(DbErrorKind::Connection, "catalog connection lock poisoned"))?
                .take();
            if let Some(conn) = taken {
                conn.close().map_err(|(_, e)| DbError::from(e))?;
                info!("closed SQLite catalog connection");
            }
            Ok(())
        })
        .await
        .map_err(|e| DbError::new(DbErrorKind::Connection, format!("close task failed: {e}")))?
    }
}

fn run_statement(conn: &Connection, statement: &Statement) -> Result<Recordset, DbError> {
    debug!(?statement, "executing");
    match statement {
        Statement::DatabaseExists { name } => {
            let mut stmt =
                conn.prepare_cached("SELECT name FROM pragma_database_list WHERE name = ?1")?;
            let rows = stmt
                .query_map([name.as_str()], |row| row.get::<_, String>(0))?
                .map(|r| r.map(|name| vec![name]))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Recordset { rows })
        }

        Statement::DropDatabase { name } => {
            // DETACH refuses to run inside a transaction.
            if !conn.is_autocommit() {
                warn!("rolling back open transaction before dropping {name}");
                conn.execute_batch("ROLLBACK")?;
            }
            conn.execute("DETACH DATABASE ?1", [name.as_str()])?;
            Ok(Recordset::default())
        }

        Statement::AttachDatabase { name, file, mode } => {
            if *mode == AttachMode::ForceRebuildLog {
                discard_log_files(file)?;
            }
            let path = file.to_string_lossy();
            conn.execute(
                "ATTACH DATABASE ?1 AS ?2",
                rusqlite::params![path.as_ref(), name.as_str()],
            )?;

            // ATTACH is lazy about the file header; read the schema so an
            // unusable file fails here rather than on first use.
            let check = conn.query_row(
                &format!("SELECT count(*) FROM \"{name}\".sqlite_master"),
                [],
                |row| row.get::<_, i64>(0),
            );
            if let Err(e) = check {
                if let Err(detach) = conn.execute("DETACH DATABASE ?1", [name.as_str()]) {
                    warn!("could not detach {name} after failed attach: {detach}");
                }
                return Err(e.into());
            }
            Ok(Recordset::default())
        }
    }
}

/// Delete `file`'s WAL, shared-memory and rollback journal files.
fn discard_log_files(file: &Path) -> Result<(), DbError> {
    for suffix in LOG_SUFFIXES {
        let mut sidecar = OsString::from(file.as_os_str());
        sidecar.push(suffix);
        let sidecar = PathBuf::from(sidecar);
        match std::fs::remove_file(&sidecar) {
            Ok(()) => info!("discarded log file {}", sidecar.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DbError::new(
                    DbErrorKind::Query,
                    format!("could not remove {}: {e}", sidecar.display()),
                ))
            }
        }
    }
    Ok(())
}

/// Opens [`SqliteClient`]s on a blocking thread.
pub struct SqliteConnector {
    config: ConnectionConfig,
}

impl SqliteConnector {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for SqliteConnector {
    async fn connect(&self) -> Result<Arc<dyn DatabaseClient>, DbError> {
        let config = self.config.clone();
        let client = tokio::task::spawn_blocking(move || SqliteClient::open(&config))
            .await
            .map_err(|e| DbError::new(DbErrorKind::Connection, format!("connect task failed: {e}")))??;
        Ok(Arc::new(client))
    }
}
