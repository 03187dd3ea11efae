use serde::Serialize;

/// Values that can be stored in a result row or bound as a statement parameter.
///
/// ```rust
/// use mssql_connection::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Null,
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// NULL value
    Null,
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_owned())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

/// How a column's declared SQL type is projected into a [`RowValues`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlTypeClass {
    /// INT, TINYINT, SMALLINT, BIT, BIGINT
    Integral,
    /// FLOAT, REAL, DOUBLE, DECIMAL, NUMERIC, MONEY
    Floating,
    /// Everything else, fetched as text
    Text,
}

/// Column metadata as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    pub class: SqlTypeClass,
}

impl ColumnDescription {
    #[must_use]
    pub fn new(name: impl Into<String>, class: SqlTypeClass) -> Self {
        Self {
            name: name.into(),
            class,
        }
    }
}

/// One fixed-size read of a text column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextChunk {
    /// The column is NULL (or the driver stopped returning data).
    Null,
    /// A chunk with more data still pending in the driver.
    More(Vec<u16>),
    /// The final chunk of the value.
    Last(Vec<u16>),
}

/// What a statement produced once it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// A result set was produced and handed to the visitor.
    Rows,
    /// No result set; the driver's affected-row count if it had one.
    Affected(Option<u64>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_serialize_as_plain_json_scalars() {
        let values = vec![
            RowValues::Int(7),
            RowValues::Float(1.5),
            RowValues::Text("x".into()),
            RowValues::Null,
        ];
        assert_eq!(
            serde_json::to_value(&values).unwrap(),
            json!([7, 1.5, "x", null])
        );
    }

    #[test]
    fn accessors_only_match_their_variant() {
        assert_eq!(RowValues::Int(3).as_int(), Some(&3));
        assert_eq!(RowValues::Int(3).as_text(), None);
        assert_eq!(RowValues::from("abc").as_text(), Some("abc"));
        assert!(RowValues::Null.is_null());
        assert_eq!(RowValues::Float(2.0).as_float(), Some(2.0));
    }
}
