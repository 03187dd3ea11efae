use std::sync::OnceLock;

use odbc_api::{Connection, ConnectionOptions, Environment};

use super::diagnostic_from_odbc;
use crate::config::ConnectOptions;
use crate::diagnostics::{HandleKind, report_error};
use crate::error::MssqlConnectionError;

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

/// The process-wide ODBC environment, created on first use.
///
/// # Errors
/// Returns `MssqlConnectionError::Database` if the driver manager refuses to allocate
/// an environment handle.
pub(crate) fn environment() -> Result<&'static Environment, MssqlConnectionError> {
    if let Some(env) = ENVIRONMENT.get() {
        return Ok(env);
    }
    let env = Environment::new()
        .map_err(|err| report_error(HandleKind::Environment, diagnostic_from_odbc(&err)))?;
    // A concurrent first call may have won the race; its handle is kept and ours dropped.
    Ok(ENVIRONMENT.get_or_init(|| env))
}

/// Open a connection described by `options`.
pub(crate) fn open_connection(
    options: &ConnectOptions,
) -> Result<Connection<'static>, MssqlConnectionError> {
    let env = environment()?;
    let connection_string = options.odbc_connection_string();
    let connect_options = ConnectionOptions {
        login_timeout_sec: options.login_timeout(),
        ..ConnectionOptions::default()
    };
    env.connect_with_connection_string(&connection_string, connect_options)
        .map_err(|err| report_error(HandleKind::Connection, diagnostic_from_odbc(&err)))
}
