//! The seam between the facade and a connectivity layer.
//!
//! A driver owns connection negotiation, SQL execution and type metadata. The
//! facade only ever talks to these traits, so the projection rules, chunk
//! reassembly and error funnelling live in one place regardless of backend.

use crate::config::ConnectOptions;
use crate::error::MssqlConnectionError;
use crate::translation::PlaceholderStyle;
use crate::types::{ColumnDescription, Completion, RowValues, TextChunk};

/// Callback receiving the cursor of a statement that produced a result set.
pub type CursorVisitor<'v> =
    dyn FnMut(&mut dyn ResultCursor) -> Result<(), MssqlConnectionError> + 'v;

/// Callback receiving each fetched row.
pub type RowVisitor<'v> = dyn FnMut(&mut dyn RowReader) -> Result<(), MssqlConnectionError> + 'v;

/// Factory for connections.
pub trait Driver {
    type Connection: DriverConnection;

    /// Establish a link using `options`.
    ///
    /// # Errors
    /// Returns `MssqlConnectionError::Database` carrying the driver's diagnostic when
    /// the connection cannot be established.
    fn connect(&self, options: &ConnectOptions) -> Result<Self::Connection, MssqlConnectionError>;

    /// Placeholder syntax the driver expects in parameterized statements.
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Positional
    }
}

/// One live connection. Every call allocates its own statement and releases it before
/// returning, on success and failure alike.
pub trait DriverConnection {
    /// Execute `sql` with `params` bound positionally. If the statement produced a
    /// result set, `visit` is called with its cursor before the statement is released.
    ///
    /// # Errors
    /// Returns the driver failure, or whatever `visit` returned.
    fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
        visit: &mut CursorVisitor<'_>,
    ) -> Result<Completion, MssqlConnectionError>;

    /// Execute `sql` without enumerating rows and report the affected-row count.
    /// `Ok(None)` means the statement succeeded but the driver has no count.
    ///
    /// # Errors
    /// Returns the driver failure.
    fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<u64>, MssqlConnectionError>;

    /// Release the connection.
    ///
    /// # Errors
    /// Returns the failure reported while disconnecting. The connection is gone either way.
    fn close(self) -> Result<(), MssqlConnectionError>;
}

/// Cursor over the rows of one result set.
pub trait ResultCursor {
    /// Names and projection classes of the columns, left to right.
    ///
    /// # Errors
    /// Returns the driver failure while reading metadata.
    fn describe_columns(&mut self) -> Result<Vec<ColumnDescription>, MssqlConnectionError>;

    /// Fetch rows until exhausted, calling `visit` for each.
    ///
    /// # Errors
    /// Returns the driver failure while fetching, or whatever `visit` returned.
    fn for_each_row(&mut self, visit: &mut RowVisitor<'_>) -> Result<(), MssqlConnectionError>;
}

/// Column access for the current row. Columns are 1-based.
pub trait RowReader {
    /// # Errors
    /// Returns the driver failure while reading the column.
    fn get_i64(&mut self, column: u16) -> Result<Option<i64>, MssqlConnectionError>;

    /// # Errors
    /// Returns the driver failure while reading the column.
    fn get_f64(&mut self, column: u16) -> Result<Option<f64>, MssqlConnectionError>;

    /// Read the next fixed-size chunk of a text column. Repeated calls continue where
    /// the previous one stopped.
    ///
    /// # Errors
    /// Returns the driver failure while reading the column.
    fn read_text_chunk(&mut self, column: u16) -> Result<TextChunk, MssqlConnectionError>;
}
