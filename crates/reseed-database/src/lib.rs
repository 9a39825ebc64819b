//! `reseed-database`: the managed database and the collaborator it talks to.
//!
//! [`controller::DatabaseController`] checks, drops and (re)creates one named
//! database through a [`client::DatabaseClient`] obtained from the
//! process-wide [`connection::SharedConnection`]. The bundled backend is
//! SQLite ([`sqlite::SqliteClient`]), which attaches the data file to a
//! catalog connection.

pub mod client;
pub mod connection;
pub mod controller;
pub mod error;
pub mod sqlite;
pub mod statement;

pub use client::{Connector, DatabaseClient};
pub use connection::SharedConnection;
pub use controller::DatabaseController;
pub use error::{DatabaseError, DbError, DbErrorKind};
pub use sqlite::{SqliteClient, SqliteConnector};
pub use statement::{AttachMode, Recordset, Statement};
