use std::sync::Arc;

use serde::Serialize;

use super::row::CustomDbRow;
use crate::error::MssqlConnectionError;
use crate::types::RowValues;

/// A result set from a query
///
/// Produced fresh for each call and handed to the caller; the facade keeps no copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// Column names shared by all rows (to avoid duplicating in each row)
    #[serde(skip)]
    column_names: Option<Arc<Vec<String>>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            column_names: None,
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row to the result set.
    ///
    /// # Errors
    /// Returns `MssqlConnectionError::Unknown` if column names have not been set or the
    /// value count does not match them.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) -> Result<(), MssqlConnectionError> {
        let column_names = self.column_names.as_ref().ok_or_else(|| {
            MssqlConnectionError::Unknown("No column names available".to_string())
        })?;
        if column_names.len() != row_values.len() {
            return Err(MssqlConnectionError::Unknown(format!(
                "Row has {} values for {} columns",
                row_values.len(),
                column_names.len()
            )));
        }
        self.results
            .push(CustomDbRow::new(Arc::clone(column_names), row_values));
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Render as the pretty-printed array-of-objects document returned by `getData`.
    ///
    /// # Errors
    /// Returns `MssqlConnectionError::Unknown` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, MssqlConnectionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
