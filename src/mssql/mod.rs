// MSSQL module - SQL Server connectivity through tiberius
//
// This module is split into several sub-modules:
// - config: facade options to tiberius `Config`
// - client: TCP/TLS connection setup
// - params: parameter binding
// - query: result cursor, row reader and type classification

pub mod client;
mod config;
mod params;
mod query;

use std::sync::Arc;
use std::time::Duration;

use tiberius::error::Error as TdsError;
use tokio::runtime::{Builder, Runtime};

pub use client::MssqlClient;

use crate::config::ConnectOptions;
use crate::diagnostics::{DiagnosticRecord, HandleKind, report_error};
use crate::driver::{CursorVisitor, Driver, DriverConnection};
use crate::error::MssqlConnectionError;
use crate::translation::{PlaceholderStyle, is_row_free_write};
use crate::types::{Completion, RowValues};

use client::create_mssql_client;
use config::build_tiberius_config;
use params::bind_query_params;
use query::TiberiusCursor;

/// Connects to SQL Server over TDS.
///
/// Calls are synchronous: each one drives the async tiberius client to completion on a
/// private current-thread runtime shared by all connections of this driver. Do not call
/// it from inside another tokio runtime.
#[derive(Clone)]
pub struct TiberiusDriver {
    runtime: Arc<Runtime>,
}

impl TiberiusDriver {
    /// # Errors
    /// Returns `MssqlConnectionError::Unknown` if the runtime cannot be created.
    pub fn new() -> Result<Self, MssqlConnectionError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| MssqlConnectionError::Unknown(format!("Failed to start runtime: {e}")))?;
        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }
}

impl std::fmt::Debug for TiberiusDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiberiusDriver").finish_non_exhaustive()
    }
}

impl Driver for TiberiusDriver {
    type Connection = TiberiusConnection;

    fn connect(&self, options: &ConnectOptions) -> Result<TiberiusConnection, MssqlConnectionError> {
        let config = build_tiberius_config(options);
        let timeout = options
            .login_timeout()
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::from_secs(u64::from(secs)));
        let client = self
            .runtime
            .block_on(create_mssql_client(config, timeout))?;
        tracing::debug!(server = %options.server, "tiberius client connected");
        Ok(TiberiusConnection {
            runtime: Arc::clone(&self.runtime),
            client,
        })
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Ordinal
    }
}

/// One live TDS connection.
pub struct TiberiusConnection {
    runtime: Arc<Runtime>,
    client: MssqlClient,
}

impl DriverConnection for TiberiusConnection {
    fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
        visit: &mut CursorVisitor<'_>,
    ) -> Result<Completion, MssqlConnectionError> {
        if is_row_free_write(sql) {
            // The query stream hides DONE row counts; execute reports them.
            return self.execute(sql, params).map(Completion::Affected);
        }

        let runtime: &Runtime = &self.runtime;
        let query = bind_query_params(sql, params);
        let mut stream = runtime
            .block_on(query.query(&mut self.client))
            .map_err(statement_error)?;

        let columns = runtime
            .block_on(stream.columns())
            .map_err(statement_error)?
            .map(<[tiberius::Column]>::to_vec);

        match columns {
            Some(columns) => {
                let mut cursor = TiberiusCursor {
                    runtime,
                    columns,
                    rows: stream.into_row_stream(),
                };
                visit(&mut cursor)?;
                Ok(Completion::Rows)
            }
            None => {
                runtime
                    .block_on(stream.into_results())
                    .map_err(statement_error)?;
                // Batches and procedures: the query stream does not surface DONE row counts.
                Ok(Completion::Affected(None))
            }
        }
    }

    fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<u64>, MssqlConnectionError> {
        let query = bind_query_params(sql, params);
        let result = self
            .runtime
            .block_on(query.execute(&mut self.client))
            .map_err(statement_error)?;
        Ok(Some(result.total()))
    }

    fn close(self) -> Result<(), MssqlConnectionError> {
        let TiberiusConnection { runtime, client } = self;
        runtime
            .block_on(client.close())
            .map_err(|err| report_error(HandleKind::Connection, Some(diagnostic_from_tds(&err))))
    }
}

fn statement_error(err: TdsError) -> MssqlConnectionError {
    report_error(HandleKind::Statement, Some(diagnostic_from_tds(&err)))
}

/// Express a tiberius failure as a diagnostic record.
///
/// Server errors keep their error number as the native code under the generic
/// SQLSTATE `42000`. Transport failures use the ODBC link-failure states so the
/// reconnect logic treats both backends alike.
pub(crate) fn diagnostic_from_tds(err: &TdsError) -> DiagnosticRecord {
    match err {
        TdsError::Server(token) => DiagnosticRecord::new(
            "42000",
            i32::try_from(token.code()).unwrap_or(i32::MAX),
            token.message(),
        ),
        TdsError::Io { message, .. } => DiagnosticRecord::new("08S01", 0, message.clone()),
        TdsError::Tls(message) => DiagnosticRecord::new("08001", 0, message.clone()),
        TdsError::Routing { host, port } => DiagnosticRecord::new(
            "08001",
            0,
            format!("Server requested routing to {host}:{port}"),
        ),
        TdsError::Conversion(message) | TdsError::Encoding(message) => {
            DiagnosticRecord::new("22018", 0, message.to_string())
        }
        other => DiagnosticRecord::new("HY000", 0, other.to_string()),
    }
}
