use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum BackendKind {
    /// Pure-Rust TDS client
    #[cfg(feature = "mssql")]
    Mssql,
    /// Platform ODBC driver manager
    #[cfg(feature = "odbc")]
    Odbc,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "JSON-lines bridge to a SQL Server connection",
    long_about = "Reads one method call per stdin line, e.g. \
                  {\"id\":1,\"method\":\"getData\",\"arguments\":{\"query\":\"SELECT 1 AS one\"}}, \
                  and writes one response per stdout line."
)]
pub(crate) struct Args {
    #[arg(long, value_enum, default_value_t = BackendKind::default())]
    pub(crate) backend: BackendKind,
    /// Also append log output to this file
    #[arg(long)]
    pub(crate) log: Option<PathBuf>,
    /// Log at debug level (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub(crate) verbose: u8,
}

impl Default for BackendKind {
    fn default() -> Self {
        #[cfg(feature = "mssql")]
        {
            BackendKind::Mssql
        }
        #[cfg(not(feature = "mssql"))]
        {
            BackendKind::Odbc
        }
    }
}

impl Args {
    pub(crate) fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
