//! Lifecycle of the one managed database: probe, drop, create.
//!
//! Observed states are `ABSENT` and `ATTACHED`; [`DatabaseController::exists`]
//! is the probe. Each public operation is a single retried unit, so a
//! failure part-way through replays the whole operation from the top.

use std::path::Path;
use std::sync::Arc;

use reseed_core::fs::is_accessible;
use reseed_core::{DatabaseName, RetryPolicy};
use tracing::{error, info};

use crate::client::DatabaseClient;
use crate::connection::SharedConnection;
use crate::error::{DatabaseError, Result};
use crate::statement::{AttachMode, Statement};

pub const EXISTENCE_CHECK: &str = "Database existence check";
pub const DATABASE_DROP: &str = "Database drop";
pub const DATABASE_CREATION: &str = "Database creation";

pub struct DatabaseController {
    connection: Arc<SharedConnection>,
    name: DatabaseName,
    retry: RetryPolicy,
}

impl DatabaseController {
    pub fn new(connection: Arc<SharedConnection>, name: DatabaseName, retry: RetryPolicy) -> Self {
        Self {
            connection,
            name,
            retry,
        }
    }

    pub fn name(&self) -> &DatabaseName {
        &self.name
    }

    /// True if the catalog lists a database with the configured name.
    pub async fn exists(&self) -> Result<bool> {
        let present = self.retry.run(EXISTENCE_CHECK, move || self.probe()).await?;
        Ok(present)
    }

    /// Drop the database if it exists; a no-op when it is already absent.
    pub async fn drop_database(&self) -> Result<()> {
        self.retry.run(DATABASE_DROP, move || self.drop_once()).await?;
        Ok(())
    }

    /// Attach `file` as the database, falling back to a forced log rebuild
    /// when the server cannot open it.
    pub async fn create(&self, file: &Path) -> Result<()> {
        self.retry
            .run(DATABASE_CREATION, move || self.create_once(file))
            .await?;
        Ok(())
    }

    async fn client(&self) -> Result<Arc<dyn DatabaseClient>> {
        Ok(self.connection.client().await?)
    }

    async fn probe(&self) -> Result<bool> {
        let rows = self
            .client()
            .await?
            .execute(&Statement::DatabaseExists {
                name: self.name.clone(),
            })
            .await?;
        Ok(!rows.is_empty())
    }

    async fn drop_once(&self) -> Result<()> {
        if !self.probe().await? {
            info!("Database {} does not exist, nothing to drop", self.name);
            return Ok(());
        }
        info!("Dropping database {}", self.name);
        self.client()
            .await?
            .execute(&Statement::DropDatabase {
                name: self.name.clone(),
            })
            .await?;
        info!("Database {} dropped", self.name);
        Ok(())
    }

    async fn create_once(&self, file: &Path) -> Result<()> {
        if !is_accessible(file).await {
            return Err(DatabaseError::FileInaccessible {
                path: file.to_path_buf(),
            });
        }

        let client = self.client().await?;
        info!("Creating database {} from {}", self.name, file.display());
        match client.execute(&self.attach(file, AttachMode::RebuildLog)).await {
            Ok(_) => {}
            Err(e) if e.is_cannot_open() => {
                error!(
                    "Standard attach of {} failed ({e}), retrying with forced log rebuild",
                    self.name
                );
                client
                    .execute(&self.attach(file, AttachMode::ForceRebuildLog))
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }
        info!("Database {} created", self.name);
        Ok(())
    }

    fn attach(&self, file: &Path, mode: AttachMode) -> Statement {
        Statement::AttachDatabase {
            name: self.name.clone(),
            file: file.to_path_buf(),
            mode,
        }
    }
}
