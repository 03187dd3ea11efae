#[cfg(not(any(feature = "mssql", feature = "odbc")))]
compile_error!("mssql-bridge needs a backend: enable the `mssql` or `odbc` feature");

mod args;
mod logging;

use clap::Parser;
use mssql_connection::bridge::{
    BridgeWorker, HandlerRegistry, INVALID_ARGUMENTS, MethodCall, MethodResponse, ResponseEnvelope,
};
use mssql_connection::{DatabaseManager, MssqlConnectionError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::args::{Args, BackendKind};
use crate::logging::LogWriter;

fn spawn_worker(backend: BackendKind) -> Result<BridgeWorker, MssqlConnectionError> {
    match backend {
        #[cfg(feature = "mssql")]
        BackendKind::Mssql => {
            use mssql_connection::mssql::TiberiusDriver;
            BridgeWorker::spawn(
                || Ok(DatabaseManager::new(TiberiusDriver::new()?)),
                HandlerRegistry::<TiberiusDriver>::standard(),
            )
        }
        #[cfg(feature = "odbc")]
        BackendKind::Odbc => {
            use mssql_connection::odbc::OdbcDriver;
            BridgeWorker::spawn(
                || Ok(DatabaseManager::new(OdbcDriver::new())),
                HandlerRegistry::<OdbcDriver>::standard(),
            )
        }
    }
}

fn parse_call(line: &str) -> Result<MethodCall, ResponseEnvelope> {
    serde_json::from_str::<MethodCall>(line).map_err(|err| {
        // Salvage the id so the host can still correlate the failure.
        let id = serde_json::from_str::<serde_json::Value>(line)
            .ok()
            .and_then(|value| value.get("id").cloned());
        ResponseEnvelope {
            id,
            response: MethodResponse::error(
                INVALID_ARGUMENTS,
                format!("Invalid Arguments: malformed method call: {err}"),
            ),
        }
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    let writer = LogWriter::new(args.log.clone()).unwrap_or_else(|err| {
        eprintln!("failed to open log file: {err}");
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(args.log_level())
        .init();

    let worker = match spawn_worker(args.backend) {
        Ok(worker) => worker,
        Err(err) => {
            tracing::error!("failed to start bridge: {err}");
            std::process::exit(1);
        }
    };
    tracing::info!(backend = ?args.backend, "bridge ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::error!("failed to read stdin: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let envelope = match parse_call(&line) {
            Ok(call) => {
                let id = call.id.clone();
                tracing::debug!(method = %call.method, "dispatching");
                ResponseEnvelope {
                    id,
                    response: worker.call(call).await,
                }
            }
            Err(envelope) => envelope,
        };

        let mut out = match serde_json::to_string(&envelope) {
            Ok(out) => out,
            Err(err) => {
                tracing::error!("failed to serialize response: {err}");
                continue;
            }
        };
        out.push('\n');
        if let Err(err) = stdout.write_all(out.as_bytes()).await {
            tracing::error!("failed to write stdout: {err}");
            break;
        }
        if let Err(err) = stdout.flush().await {
            tracing::error!("failed to flush stdout: {err}");
            break;
        }
    }

    drop(worker);
    tracing::info!("bridge stopped");
}
