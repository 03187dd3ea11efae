use std::time::Duration;

use tiberius::error::Error as TdsError;
use tiberius::{Client, Config as TiberiusConfig, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::diagnostic_from_tds;
use crate::diagnostics::{DiagnosticRecord, HandleKind, report_error};
use crate::error::MssqlConnectionError;

/// Type alias for SQL Server client
pub type MssqlClient = Client<Compat<TcpStream>>;

/// Open a client for `config`, giving up after `login_timeout` when one is set.
///
/// # Errors
/// Returns `MssqlConnectionError::Database` if the address cannot be reached, the
/// login is rejected or the timeout expires.
pub(crate) async fn create_mssql_client(
    config: TiberiusConfig,
    login_timeout: Option<Duration>,
) -> Result<MssqlClient, MssqlConnectionError> {
    let attempt = connect_following_redirect(config);
    let outcome = match login_timeout {
        Some(limit) => tokio::time::timeout(limit, attempt).await.map_err(|_| {
            report_error(
                HandleKind::Connection,
                Some(DiagnosticRecord::new("HYT00", 0, "Login timeout expired")),
            )
        })?,
        None => attempt.await,
    };
    outcome.map_err(|err| report_error(HandleKind::Connection, Some(diagnostic_from_tds(&err))))
}

/// Azure SQL may answer the first login with a routing token; follow it once.
async fn connect_following_redirect(mut config: TiberiusConfig) -> Result<MssqlClient, TdsError> {
    match open(config.clone()).await {
        Err(TdsError::Routing { host, port }) => {
            tracing::debug!(%host, port, "following server redirect");
            config.host(&host);
            config.port(port);
            open(config).await
        }
        other => other,
    }
}

async fn open(config: TiberiusConfig) -> Result<MssqlClient, TdsError> {
    // Resolves named instances through SQL Browser, otherwise connects to host:port.
    let tcp = TcpStream::connect_named(&config).await?;
    tcp.set_nodelay(true)?;
    Client::connect(config, tcp.compat_write()).await
}
