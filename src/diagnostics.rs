use std::fmt;

use crate::error::MssqlConnectionError;

/// Which handle a diagnostic was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Environment,
    Connection,
    Statement,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleKind::Environment => "environment",
            HandleKind::Connection => "connection",
            HandleKind::Statement => "statement",
        };
        f.write_str(name)
    }
}

/// SQLSTATEs that mean the connection itself is unusable.
const CONNECTION_LOST_STATES: [&str; 4] = ["08S01", "08003", "08007", "HY010"];

/// First diagnostic record of a failed driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Five character SQLSTATE (or the closest equivalent the driver exposes)
    pub state: String,
    /// Driver or server specific error number
    pub native_error: i32,
    /// Message text, already decoded to UTF-8
    pub message: String,
}

impl DiagnosticRecord {
    #[must_use]
    pub fn new(state: impl Into<String>, native_error: i32, message: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            native_error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        CONNECTION_LOST_STATES
            .iter()
            .any(|state| self.state.eq_ignore_ascii_case(state))
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SQL Error State: {}, Native Error Code: {}, Message: {}",
            self.state, self.native_error, self.message
        )
    }
}

/// Turn a diagnostic read from `handle` into the facade's database error.
///
/// Every failing driver path funnels through here so the message format and the
/// logging stay identical across backends.
pub fn report_error(handle: HandleKind, record: Option<DiagnosticRecord>) -> MssqlConnectionError {
    let err = match record {
        Some(record) => MssqlConnectionError::Database(record),
        None => MssqlConnectionError::DiagnosticsUnavailable,
    };
    tracing::warn!(handle = %handle, "{err}");
    err
}
