use thiserror::Error;

use crate::diagnostics::DiagnosticRecord;

/// Every failure the facade can surface.
///
/// Each variant belongs to exactly one [`ErrorKind`]; callers that only care about the
/// coarse category (for example a bridge mapping errors onto response codes) should
/// match on [`MssqlConnectionError::kind`] instead of the variants.
#[derive(Debug, Error)]
pub enum MssqlConnectionError {
    /// A query or write was attempted without an open connection.
    #[error("Not connected to the database.")]
    NotConnected,

    /// Parameters did not line up with the placeholders in the statement.
    #[error("Parameter error: {0}")]
    ParameterError(String),

    /// The connectivity layer reported a failure.
    #[error("{0}")]
    Database(DiagnosticRecord),

    /// The connectivity layer failed but left no diagnostic record to read.
    #[error("Failed to retrieve error information")]
    DiagnosticsUnavailable,

    /// Anything that could not be classified (panics, serialization, released handles).
    #[error("{0}")]
    Unknown(String),
}

/// Coarse classification of [`MssqlConnectionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Operation invoked in a state or with arguments that make it impossible to run.
    Precondition,
    /// The driver or the server rejected the operation.
    Database,
    /// Unclassified failure.
    Unknown,
}

impl ErrorKind {
    /// Stable response code used by the bridge.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Precondition => "PRECONDITION_ERROR",
            ErrorKind::Database => "DATABASE_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl MssqlConnectionError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            MssqlConnectionError::NotConnected | MssqlConnectionError::ParameterError(_) => {
                ErrorKind::Precondition
            }
            MssqlConnectionError::Database(_) | MssqlConnectionError::DiagnosticsUnavailable => {
                ErrorKind::Database
            }
            MssqlConnectionError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// The diagnostic record behind a database error, if any.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&DiagnosticRecord> {
        if let MssqlConnectionError::Database(record) = self {
            Some(record)
        } else {
            None
        }
    }

    /// True when the driver reported that the link to the server is gone.
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        self.diagnostic()
            .is_some_and(DiagnosticRecord::is_connection_lost)
    }
}

impl From<DiagnosticRecord> for MssqlConnectionError {
    fn from(record: DiagnosticRecord) -> Self {
        MssqlConnectionError::Database(record)
    }
}

impl From<serde_json::Error> for MssqlConnectionError {
    fn from(err: serde_json::Error) -> Self {
        MssqlConnectionError::Unknown(format!("Failed to serialize result: {err}"))
    }
}
