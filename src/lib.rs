//! Synchronous SQL Server client facade.
//!
//! [`DatabaseManager`] holds one connection and runs raw or parameterized SQL,
//! projecting rows into JSON documents. Connectivity is pluggable through the
//! [`driver`] traits; the `mssql` feature provides a tiberius backend and the
//! `odbc` feature an ODBC one.
//!
//! ```rust,no_run
//! # #[cfg(feature = "mssql")]
//! # fn demo() -> Result<(), mssql_connection::MssqlConnectionError> {
//! use mssql_connection::prelude::*;
//!
//! let mut manager = DatabaseManager::new(TiberiusDriver::new()?);
//! manager.connect("localhost", "master", "sa", "secret", "15")?;
//! let json = manager.get_data("SELECT name FROM sys.databases")?;
//! println!("{json}");
//! manager.disconnect()?;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod manager;
pub mod prelude;
pub mod results;
pub mod text;
pub mod translation;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "odbc")]
pub mod odbc;

pub use config::{ConnectOptions, ConnectOptionsBuilder, FieldEscaping};
pub use diagnostics::DiagnosticRecord;
pub use error::{ErrorKind, MssqlConnectionError};
pub use manager::{ConnectionState, DatabaseManager};
pub use results::{CustomDbRow, ResultSet, StatementResult, WriteResult};
pub use types::RowValues;
