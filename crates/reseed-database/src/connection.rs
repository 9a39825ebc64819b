use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::client::{Connector, DatabaseClient};
use crate::error::DbError;

/// Process-wide, lazily-opened connection shared by every refresh cycle.
///
/// The first [`client`](Self::client) call connects; later calls reuse the
/// same client. [`close`](Self::close) is for shutdown only: it closes the
/// client at most once and every later `client` call fails with
/// [`DbErrorKind::Closed`](crate::error::DbErrorKind::Closed).
pub struct SharedConnection {
    connector: Box<dyn Connector>,
    client: Mutex<Option<Arc<dyn DatabaseClient>>>,
    closed: AtomicBool,
}

impl SharedConnection {
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            client: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub async fn client(&self) -> Result<Arc<dyn DatabaseClient>, DbError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DbError::closed());
        }
        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }
        let client = self.connector.connect().await?;
        info!("Database connection established");
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Close the shared client. Safe to call more than once.
    pub async fn close(&self) -> Result<(), DbError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let client = self.client.lock().await.take();
        match client {
            Some(client) => {
                client.close().await?;
                info!("Database connection closed");
            }
            None => info!("Database connection was never opened"),
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
