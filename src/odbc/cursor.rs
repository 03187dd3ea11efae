use odbc_api::parameter::VarWCharArray;
use odbc_api::{Cursor, CursorRow, DataType, Nullable, ResultSetMetadata};

use super::diagnostic_from_odbc;
use crate::diagnostics::{HandleKind, report_error};
use crate::driver::{ResultCursor, RowReader, RowVisitor};
use crate::error::MssqlConnectionError;
use crate::types::{ColumnDescription, SqlTypeClass, TextChunk};

/// Wide characters fetched per `SQLGetData` call on a text column.
pub const TEXT_CHUNK_UNITS: usize = 1024;

fn statement_error(err: &odbc_api::Error) -> MssqlConnectionError {
    report_error(HandleKind::Statement, diagnostic_from_odbc(err))
}

pub(crate) struct OdbcCursor<C> {
    cursor: C,
}

impl<C: Cursor> OdbcCursor<C> {
    pub(crate) fn new(cursor: C) -> Self {
        Self { cursor }
    }
}

impl<C: Cursor> ResultCursor for OdbcCursor<C> {
    fn describe_columns(&mut self) -> Result<Vec<ColumnDescription>, MssqlConnectionError> {
        let count = self
            .cursor
            .num_result_cols()
            .map_err(|e| statement_error(&e))?;
        let count = u16::try_from(count).unwrap_or(0);
        let mut columns = Vec::with_capacity(usize::from(count));
        for column in 1..=count {
            let name = self
                .cursor
                .col_name(column)
                .map_err(|e| statement_error(&e))?;
            let data_type = self
                .cursor
                .col_data_type(column)
                .map_err(|e| statement_error(&e))?;
            columns.push(ColumnDescription::new(name, classify(data_type)));
        }
        Ok(columns)
    }

    fn for_each_row(&mut self, visit: &mut RowVisitor<'_>) -> Result<(), MssqlConnectionError> {
        while let Some(row) = self.cursor.next_row().map_err(|e| statement_error(&e))? {
            let mut reader = OdbcRow { row };
            visit(&mut reader)?;
        }
        Ok(())
    }
}

/// Projection class for an ODBC SQL data type.
pub(crate) fn classify(data_type: DataType) -> SqlTypeClass {
    match data_type {
        DataType::Integer
        | DataType::SmallInt
        | DataType::TinyInt
        | DataType::BigInt
        | DataType::Bit => SqlTypeClass::Integral,
        DataType::Float { .. }
        | DataType::Real
        | DataType::Double
        | DataType::Decimal { .. }
        | DataType::Numeric { .. } => SqlTypeClass::Floating,
        _ => SqlTypeClass::Text,
    }
}

struct OdbcRow<'a> {
    row: CursorRow<'a>,
}

impl RowReader for OdbcRow<'_> {
    fn get_i64(&mut self, column: u16) -> Result<Option<i64>, MssqlConnectionError> {
        let mut value = Nullable::<i64>::null();
        self.row
            .get_data(column, &mut value)
            .map_err(|e| statement_error(&e))?;
        Ok(value.into_opt())
    }

    fn get_f64(&mut self, column: u16) -> Result<Option<f64>, MssqlConnectionError> {
        let mut value = Nullable::<f64>::null();
        self.row
            .get_data(column, &mut value)
            .map_err(|e| statement_error(&e))?;
        Ok(value.into_opt())
    }

    fn read_text_chunk(&mut self, column: u16) -> Result<TextChunk, MssqlConnectionError> {
        let mut buffer = VarWCharArray::<TEXT_CHUNK_UNITS>::NULL;
        self.row
            .get_data(column, &mut buffer)
            .map_err(|e| statement_error(&e))?;
        Ok(match buffer.as_slice() {
            None => TextChunk::Null,
            Some(units) if buffer.is_complete() => TextChunk::Last(units.to_vec()),
            Some(units) => TextChunk::More(units.to_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_odbc_types() {
        assert_eq!(classify(DataType::BigInt), SqlTypeClass::Integral);
        assert_eq!(classify(DataType::Bit), SqlTypeClass::Integral);
        assert_eq!(classify(DataType::Real), SqlTypeClass::Floating);
        assert_eq!(classify(DataType::Double), SqlTypeClass::Floating);
        assert_eq!(classify(DataType::Date), SqlTypeClass::Text);
        assert_eq!(classify(DataType::Unknown), SqlTypeClass::Text);
    }
}
