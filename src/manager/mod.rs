//! The database client facade.
//!
//! [`DatabaseManager`] owns at most one connection and exposes the five operations
//! the host calls: `connect`, `disconnect`, `get_data`, `write_data` and
//! `execute_parameterized_query`. Every failure, including a panic inside driver
//! code, leaves through [`MssqlConnectionError`].

mod projection;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::config::ConnectOptions;
use crate::driver::{Driver, DriverConnection};
use crate::error::MssqlConnectionError;
use crate::results::{ResultSet, StatementResult, WriteResult};
use crate::translation::bind_placeholders;
use crate::types::{Completion, RowValues};

use projection::collect_rows;

/// Whether the facade currently holds a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Facade over a single connection of driver `D`.
///
/// Operations take `&mut self`; concurrent callers must serialize access themselves
/// (see [`crate::bridge::BridgeWorker`]). Dropping a connected manager disconnects it.
pub struct DatabaseManager<D: Driver> {
    driver: D,
    connection: Option<D::Connection>,
    options: Option<ConnectOptions>,
}

impl<D: Driver> DatabaseManager<D> {
    #[must_use]
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            connection: None,
            options: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if self.connection.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Connect using the five text fields the host supplies.
    ///
    /// # Errors
    /// Returns `MssqlConnectionError::Database` with the driver's diagnostic if the
    /// connection fails, or `MssqlConnectionError::Unknown` for anything unclassified.
    pub fn connect(
        &mut self,
        server: &str,
        database: &str,
        user: &str,
        password: &str,
        timeout_seconds: &str,
    ) -> Result<bool, MssqlConnectionError> {
        self.connect_with(ConnectOptions::new(
            server,
            database,
            user,
            password,
            timeout_seconds,
        ))
    }

    /// Connect using prepared [`ConnectOptions`]. An existing connection is released first.
    ///
    /// # Errors
    /// See [`DatabaseManager::connect`].
    pub fn connect_with(&mut self, options: ConnectOptions) -> Result<bool, MssqlConnectionError> {
        if self.connection.is_some()
            && let Err(err) = self.disconnect()
        {
            tracing::warn!("releasing previous connection failed: {err}");
        }

        tracing::debug!(
            server = %options.server,
            database = %options.database,
            "connecting"
        );
        let driver = &self.driver;
        let connection = guarded("connect", || driver.connect(&options))?;
        self.connection = Some(connection);
        self.options = Some(options);
        Ok(true)
    }

    /// Release the connection. Does nothing when already disconnected.
    ///
    /// # Errors
    /// Returns `MssqlConnectionError::Unknown` if the driver failed while releasing;
    /// the manager is disconnected afterwards regardless.
    pub fn disconnect(&mut self) -> Result<(), MssqlConnectionError> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };
        tracing::debug!("disconnecting");
        guarded("disconnect", move || connection.close()).map_err(|err| match err {
            MssqlConnectionError::Unknown(_) => err,
            other => MssqlConnectionError::Unknown(format!(
                "An error occurred in disconnect: {other}"
            )),
        })
    }

    /// Execute `query` and return its rows as a pretty-printed JSON array of objects.
    ///
    /// # Errors
    /// Returns `MssqlConnectionError::NotConnected` without touching the driver when
    /// disconnected, otherwise the driver or serialization failure.
    pub fn get_data(&mut self, query: &str) -> Result<String, MssqlConnectionError> {
        self.rows_with_retry("getData", query, &[])?.to_json_pretty()
    }

    /// Execute a write and return `{"affectedRows": n}`.
    ///
    /// # Errors
    /// Returns `MssqlConnectionError::NotConnected` when disconnected, otherwise the
    /// driver failure.
    pub fn write_data(&mut self, query: &str) -> Result<String, MssqlConnectionError> {
        self.run_write("writeData", query, &[])?.to_json()
    }

    /// Execute `sql` with text parameters bound to its placeholders.
    ///
    /// Placeholders are `?` (in order) or `@p1`..`@pN`; every value is bound as
    /// Unicode text. Statements producing rows return the `getData` document, others
    /// the `writeData` document.
    ///
    /// # Errors
    /// Returns `MssqlConnectionError::NotConnected` when disconnected,
    /// `MssqlConnectionError::ParameterError` when parameters and placeholders disagree,
    /// otherwise the driver failure.
    pub fn execute_parameterized_query(
        &mut self,
        sql: &str,
        params: &[String],
    ) -> Result<String, MssqlConnectionError> {
        let values: Vec<RowValues> = params.iter().map(|p| RowValues::Text(p.clone())).collect();
        self.execute_parameterized(sql, &values)?.to_json()
    }

    /// Typed form of [`DatabaseManager::execute_parameterized_query`].
    ///
    /// # Errors
    /// See [`DatabaseManager::execute_parameterized_query`].
    pub fn execute_parameterized(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<StatementResult, MssqlConnectionError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(MssqlConnectionError::NotConnected)?;
        let bound = bind_placeholders(sql, params, self.driver.placeholder_style())?;

        let outcome = guarded("executeParameterizedQuery", || {
            collect_rows(connection, &bound.sql, &bound.params)
        });
        self.restore_if_link_lost(&outcome);

        let (rows, completion) = outcome?;
        Ok(match completion {
            Completion::Rows => StatementResult::Rows(rows),
            Completion::Affected(count) => {
                StatementResult::Write(WriteResult::new(count.unwrap_or(0)))
            }
        })
    }

    /// Run a row-returning statement with typed parameters.
    ///
    /// # Errors
    /// Same as [`DatabaseManager::execute_parameterized`].
    pub fn query(&mut self, sql: &str, params: &[RowValues]) -> Result<ResultSet, MssqlConnectionError> {
        if self.connection.is_none() {
            return Err(MssqlConnectionError::NotConnected);
        }
        let bound = bind_placeholders(sql, params, self.driver.placeholder_style())?;
        self.rows_with_retry("query", &bound.sql, &bound.params)
    }

    /// Run a write statement with typed parameters.
    ///
    /// # Errors
    /// Same as [`DatabaseManager::execute_parameterized`].
    pub fn execute(&mut self, sql: &str, params: &[RowValues]) -> Result<WriteResult, MssqlConnectionError> {
        if self.connection.is_none() {
            return Err(MssqlConnectionError::NotConnected);
        }
        let bound = bind_placeholders(sql, params, self.driver.placeholder_style())?;
        self.run_write("execute", &bound.sql, &bound.params)
    }

    fn rows_with_retry(
        &mut self,
        operation: &str,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, MssqlConnectionError> {
        match self.run_rows(operation, sql, params) {
            Err(err) if self.should_reconnect(&err) => {
                tracing::info!(operation, "connection lost, reconnecting and retrying once");
                self.reconnect()?;
                self.run_rows(operation, sql, params)
            }
            other => other,
        }
    }

    fn run_rows(
        &mut self,
        operation: &str,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, MssqlConnectionError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(MssqlConnectionError::NotConnected)?;
        tracing::debug!(operation, sql, "executing");
        guarded(operation, || collect_rows(connection, sql, params)).map(|(rows, _)| rows)
    }

    fn run_write(
        &mut self,
        operation: &str,
        sql: &str,
        params: &[RowValues],
    ) -> Result<WriteResult, MssqlConnectionError> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(MssqlConnectionError::NotConnected)?;
        tracing::debug!(operation, sql, "executing");
        let outcome = guarded(operation, || connection.execute(sql, params));
        self.restore_if_link_lost(&outcome);
        Ok(WriteResult::new(outcome?.unwrap_or(0)))
    }

    fn should_reconnect(&self, err: &MssqlConnectionError) -> bool {
        self.options.as_ref().is_some_and(|opts| opts.reconnect) && err.is_connection_lost()
    }

    /// Writes are never retried, but a dead link is replaced so the next call can run.
    fn restore_if_link_lost<T>(&mut self, outcome: &Result<T, MssqlConnectionError>) {
        if let Err(err) = outcome
            && self.should_reconnect(err)
            && let Err(reconnect_err) = self.reconnect()
        {
            tracing::warn!("reconnect after lost connection failed: {reconnect_err}");
        }
    }

    fn reconnect(&mut self) -> Result<(), MssqlConnectionError> {
        let options = self
            .options
            .clone()
            .ok_or(MssqlConnectionError::NotConnected)?;
        if let Some(stale) = self.connection.take()
            && let Err(err) = guarded("disconnect", move || stale.close())
        {
            tracing::debug!("closing stale connection failed: {err}");
        }
        let driver = &self.driver;
        let connection = guarded("connect", || driver.connect(&options))?;
        self.connection = Some(connection);
        Ok(())
    }
}

impl<D: Driver> Drop for DatabaseManager<D> {
    fn drop(&mut self) {
        if let Err(err) = self.disconnect() {
            tracing::warn!("disconnect on drop failed: {err}");
        }
    }
}

/// Run `f`, turning a panic into `MssqlConnectionError::Unknown` naming `operation`.
fn guarded<T>(
    operation: &str,
    f: impl FnOnce() -> Result<T, MssqlConnectionError>,
) -> Result<T, MssqlConnectionError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = panic_detail(payload.as_ref());
            tracing::error!(operation, "driver panicked: {detail}");
            Err(MssqlConnectionError::Unknown(format!(
                "An unknown error occurred in {operation}: {detail}"
            )))
        }
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unexpected panic"
    }
}
