use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tokio::sync::oneshot;

use super::protocol::{MethodCall, MethodResponse};
use super::registry::HandlerRegistry;
use crate::driver::Driver;
use crate::error::{ErrorKind, MssqlConnectionError};
use crate::manager::DatabaseManager;

enum Command {
    Call {
        call: MethodCall,
        respond_to: oneshot::Sender<MethodResponse>,
    },
    Shutdown,
}

/// Owns one [`DatabaseManager`] on a dedicated thread and serializes calls to it.
///
/// The manager is built on the worker thread by the factory passed to
/// [`BridgeWorker::spawn`], so driver handles never move between threads. Dropping the
/// worker stops the thread, which disconnects the manager.
pub struct BridgeWorker {
    sender: Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl BridgeWorker {
    /// Start the worker thread and wait until the factory has produced the manager.
    ///
    /// # Errors
    /// Returns the factory's error, or `MssqlConnectionError::Unknown` if the thread
    /// cannot be spawned.
    pub fn spawn<D, F>(factory: F, registry: HandlerRegistry<D>) -> Result<Self, MssqlConnectionError>
    where
        D: Driver + 'static,
        F: FnOnce() -> Result<DatabaseManager<D>, MssqlConnectionError> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), MssqlConnectionError>>(1);

        let thread = thread::Builder::new()
            .name("mssql-bridge-worker".into())
            .spawn(move || match factory() {
                Ok(mut manager) => {
                    let _ = ready_tx.send(Ok(()));
                    run_bridge_worker(&mut manager, &registry, &receiver);
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .map_err(|err| {
                MssqlConnectionError::Unknown(format!("failed to spawn bridge worker thread: {err}"))
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                sender,
                thread: Some(thread),
            }),
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            Err(_) => {
                let _ = thread.join();
                Err(MssqlConnectionError::Unknown(
                    "bridge worker exited during startup".into(),
                ))
            }
        }
    }

    /// Queue `call` and wait for its response.
    pub async fn call(&self, call: MethodCall) -> MethodResponse {
        match self.enqueue(call) {
            Ok(rx) => rx.await.unwrap_or_else(|_| worker_gone()),
            Err(response) => response,
        }
    }

    /// Blocking form of [`BridgeWorker::call`] for callers outside an async runtime.
    #[must_use]
    pub fn call_blocking(&self, call: MethodCall) -> MethodResponse {
        match self.enqueue(call) {
            Ok(rx) => rx.blocking_recv().unwrap_or_else(|_| worker_gone()),
            Err(response) => response,
        }
    }

    fn enqueue(&self, call: MethodCall) -> Result<oneshot::Receiver<MethodResponse>, MethodResponse> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Command::Call {
                call,
                respond_to: tx,
            })
            .map_err(|_| worker_gone())?;
        Ok(rx)
    }
}

impl fmt::Debug for BridgeWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeWorker")
            .field("running", &self.thread.is_some())
            .finish()
    }
}

impl Drop for BridgeWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("bridge worker panicked while shutting down");
        }
    }
}

fn worker_gone() -> MethodResponse {
    MethodResponse::error(ErrorKind::Unknown.code(), "bridge worker stopped")
}

fn run_bridge_worker<D: Driver>(
    manager: &mut DatabaseManager<D>,
    registry: &HandlerRegistry<D>,
    receiver: &Receiver<Command>,
) {
    tracing::debug!(methods = ?registry.methods(), "bridge worker started");
    while let Ok(command) = receiver.recv() {
        match command {
            Command::Call { call, respond_to } => {
                let response = registry.dispatch(manager, &call);
                let _ = respond_to.send(response);
            }
            Command::Shutdown => break,
        }
    }
    tracing::debug!("bridge worker stopping");
}
