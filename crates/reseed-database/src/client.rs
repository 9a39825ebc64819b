use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DbError;
use crate::statement::{Recordset, Statement};

/// An open connection to the database server.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    async fn execute(&self, statement: &Statement) -> Result<Recordset, DbError>;

    async fn close(&self) -> Result<(), DbError>;
}

/// Opens connections; held by [`crate::connection::SharedConnection`].
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn DatabaseClient>, DbError>;
}
