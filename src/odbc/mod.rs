// ODBC module - SQL Server connectivity through the platform driver manager
//
// - environment: process-wide environment handle and connection setup
// - params: parameter conversion to wide-character ODBC inputs
// - cursor: metadata, row fetch and chunked text reads

mod cursor;
mod environment;
mod params;

use std::panic::{self, AssertUnwindSafe};

use odbc_api::Connection;

pub use cursor::TEXT_CHUNK_UNITS;

use crate::config::ConnectOptions;
use crate::diagnostics::{DiagnosticRecord, HandleKind, report_error};
use crate::driver::{CursorVisitor, Driver, DriverConnection};
use crate::error::MssqlConnectionError;
use crate::text::decode_sql_text;
use crate::types::{Completion, RowValues};

use cursor::OdbcCursor;
use environment::open_connection;
use params::convert_params;

/// Connects through the ODBC driver named in [`ConnectOptions::driver_name`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OdbcDriver;

impl OdbcDriver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Driver for OdbcDriver {
    type Connection = OdbcConnection;

    fn connect(&self, options: &ConnectOptions) -> Result<OdbcConnection, MssqlConnectionError> {
        let connection = open_connection(options)?;
        tracing::debug!(server = %options.server, "odbc connection established");
        Ok(OdbcConnection { connection })
    }
}

/// One live ODBC connection. Each call allocates a statement and frees it on return.
pub struct OdbcConnection {
    connection: Connection<'static>,
}

impl OdbcConnection {
    fn run(
        &mut self,
        sql: &str,
        params: &[RowValues],
        visit: Option<&mut CursorVisitor<'_>>,
    ) -> Result<Completion, MssqlConnectionError> {
        let params = convert_params(params);
        let mut statement = self
            .connection
            .preallocate()
            .map_err(|e| report_error(HandleKind::Connection, diagnostic_from_odbc(&e)))?;

        let cursor = statement
            .execute(sql, params.as_slice())
            .map_err(|e| report_error(HandleKind::Statement, diagnostic_from_odbc(&e)))?;
        if let Some(cursor) = cursor {
            if let Some(visit) = visit {
                visit(&mut OdbcCursor::new(cursor))?;
                return Ok(Completion::Rows);
            }
        }

        let count = statement
            .row_count()
            .map_err(|e| report_error(HandleKind::Statement, diagnostic_from_odbc(&e)))?;
        Ok(Completion::Affected(count.and_then(|n| u64::try_from(n).ok())))
    }
}

impl DriverConnection for OdbcConnection {
    fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
        visit: &mut CursorVisitor<'_>,
    ) -> Result<Completion, MssqlConnectionError> {
        self.run(sql, params, Some(visit))
    }

    fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<u64>, MssqlConnectionError> {
        match self.run(sql, params, None)? {
            Completion::Affected(count) => Ok(count),
            Completion::Rows => Ok(None),
        }
    }

    fn close(self) -> Result<(), MssqlConnectionError> {
        let OdbcConnection { connection } = self;
        // odbc-api panics when SQLDisconnect fails during drop.
        panic::catch_unwind(AssertUnwindSafe(move || drop(connection))).map_err(|payload| {
            let detail = payload
                .downcast_ref::<String>()
                .map_or("disconnect failed", String::as_str);
            MssqlConnectionError::Unknown(format!("An error occurred in disconnect: {detail}"))
        })
    }
}

/// Extract the first diagnostic record from an odbc-api error, if it carries one.
pub(crate) fn diagnostic_from_odbc(err: &odbc_api::Error) -> Option<DiagnosticRecord> {
    match err {
        odbc_api::Error::Diagnostics { record, .. } => Some(DiagnosticRecord::new(
            record.state.as_str(),
            record.native_error,
            decode_sql_text(&record.message),
        )),
        odbc_api::Error::NoDiagnostics { .. } => None,
        other => Some(DiagnosticRecord::new("HY000", 0, other.to_string())),
    }
}
