//! Convenient imports for common functionality.
//!
//! This module re-exports the types most callers need to open a connection, run
//! statements and interpret the results.

pub use crate::config::{ConnectOptions, ConnectOptionsBuilder, FieldEscaping};
pub use crate::diagnostics::{DiagnosticRecord, HandleKind};
pub use crate::driver::{Driver, DriverConnection};
pub use crate::error::{ErrorKind, MssqlConnectionError};
pub use crate::manager::{ConnectionState, DatabaseManager};
pub use crate::results::{CustomDbRow, ResultSet, StatementResult, WriteResult};
pub use crate::translation::{BoundStatement, PlaceholderStyle, bind_placeholders};
pub use crate::types::RowValues;

pub use crate::bridge::{BridgeWorker, HandlerRegistry, MethodCall, MethodResponse};

#[cfg(feature = "mssql")]
pub use crate::mssql::TiberiusDriver;
#[cfg(feature = "odbc")]
pub use crate::odbc::OdbcDriver;
