mod result_set;
mod row;

use serde::Serialize;

use crate::error::MssqlConnectionError;

pub use result_set::ResultSet;
pub use row::CustomDbRow;

/// Outcome of a write statement, serialized as `{"affectedRows": n}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub affected_rows: u64,
}

impl WriteResult {
    #[must_use]
    pub fn new(affected_rows: u64) -> Self {
        Self { affected_rows }
    }

    /// # Errors
    /// Returns `MssqlConnectionError::Unknown` if serialization fails.
    pub fn to_json(&self) -> Result<String, MssqlConnectionError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Outcome of a statement whose shape is only known after it runs.
#[derive(Debug, Clone)]
pub enum StatementResult {
    Rows(ResultSet),
    Write(WriteResult),
}

impl StatementResult {
    /// Render as the `getData` document for rows, or the `writeData` document otherwise.
    ///
    /// # Errors
    /// Returns `MssqlConnectionError::Unknown` if serialization fails.
    pub fn to_json(&self) -> Result<String, MssqlConnectionError> {
        match self {
            StatementResult::Rows(rows) => rows.to_json_pretty(),
            StatementResult::Write(write) => write.to_json(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::RowValues;

    fn names(cols: &[&str]) -> Arc<Vec<String>> {
        Arc::new(cols.iter().map(|c| (*c).to_string()).collect())
    }

    #[test]
    fn empty_result_set_is_empty_array() {
        let rs = ResultSet::default();
        assert_eq!(rs.to_json_pretty().unwrap(), "[]");
    }

    #[test]
    fn rows_keep_column_order_and_nulls() {
        let mut rs = ResultSet::with_capacity(1);
        rs.set_column_names(names(&["z", "a", "m"]));
        rs.add_row_values(vec![
            RowValues::Int(1),
            RowValues::Null,
            RowValues::Text("x".into()),
        ])
        .unwrap();
        let json = serde_json::to_string(&rs).unwrap();
        assert_eq!(json, r#"[{"z":1,"a":null,"m":"x"}]"#);
    }

    #[test]
    fn duplicate_column_names_are_not_merged() {
        let mut rs = ResultSet::with_capacity(1);
        rs.set_column_names(names(&["id", "id"]));
        rs.add_row_values(vec![RowValues::Int(1), RowValues::Int(2)])
            .unwrap();
        assert_eq!(serde_json::to_string(&rs).unwrap(), r#"[{"id":1,"id":2}]"#);
        assert_eq!(rs.results[0].get("id"), Some(&RowValues::Int(1)));
        assert_eq!(rs.results[0].get_by_index(1), Some(&RowValues::Int(2)));
    }

    #[test]
    fn mismatched_row_is_rejected() {
        let mut rs = ResultSet::with_capacity(1);
        assert!(rs.add_row_values(vec![RowValues::Null]).is_err());
        rs.set_column_names(names(&["a", "b"]));
        assert!(rs.add_row_values(vec![RowValues::Null]).is_err());
        assert!(rs.is_empty());
    }

    #[test]
    fn write_result_uses_camel_case_key() {
        assert_eq!(WriteResult::new(3).to_json().unwrap(), r#"{"affectedRows":3}"#);
    }
}
