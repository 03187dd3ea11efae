use std::sync::Arc;

use crate::driver::{DriverConnection, RowReader};
use crate::error::MssqlConnectionError;
use crate::results::ResultSet;
use crate::text::WideTextAssembler;
use crate::types::{ColumnDescription, Completion, RowValues, SqlTypeClass, TextChunk};

/// Run `sql` and project the first result set it produces into a [`ResultSet`].
///
/// A statement without a result set yields an empty `ResultSet` and the driver's
/// affected-row count in the returned [`Completion`].
pub(crate) fn collect_rows<C: DriverConnection>(
    connection: &mut C,
    sql: &str,
    params: &[RowValues],
) -> Result<(ResultSet, Completion), MssqlConnectionError> {
    let mut result_set = ResultSet::with_capacity(16);
    result_set.set_column_names(Arc::new(Vec::new()));

    let completion = connection.query(sql, params, &mut |cursor| {
        let columns = cursor.describe_columns()?;
        result_set.set_column_names(Arc::new(
            columns.iter().map(|col| col.name.clone()).collect(),
        ));
        cursor.for_each_row(&mut |row| {
            let values = project_row(row, &columns)?;
            result_set.add_row_values(values)
        })
    })?;

    Ok((result_set, completion))
}

fn project_row(
    row: &mut dyn RowReader,
    columns: &[ColumnDescription],
) -> Result<Vec<RowValues>, MssqlConnectionError> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let ordinal = u16::try_from(idx + 1).map_err(|_| {
                MssqlConnectionError::Unknown(format!("column {} is out of range", idx + 1))
            })?;
            project_value(row, ordinal, col.class)
        })
        .collect()
}

fn project_value(
    row: &mut dyn RowReader,
    column: u16,
    class: SqlTypeClass,
) -> Result<RowValues, MssqlConnectionError> {
    Ok(match class {
        SqlTypeClass::Integral => row.get_i64(column)?.map_or(RowValues::Null, RowValues::Int),
        SqlTypeClass::Floating => row.get_f64(column)?.map_or(RowValues::Null, RowValues::Float),
        SqlTypeClass::Text => read_text(row, column)?,
    })
}

/// Read a text column chunk by chunk until the driver reports the end of the value.
fn read_text(row: &mut dyn RowReader, column: u16) -> Result<RowValues, MssqlConnectionError> {
    let mut assembler = WideTextAssembler::new();
    loop {
        match row.read_text_chunk(column)? {
            TextChunk::Null if assembler.chunks() == 0 => return Ok(RowValues::Null),
            TextChunk::Null => break,
            // A driver that keeps claiming more data without sending any would spin forever.
            TextChunk::More(chunk) if chunk.is_empty() => break,
            TextChunk::More(chunk) => assembler.push(&chunk),
            TextChunk::Last(chunk) => {
                assembler.push(&chunk);
                break;
            }
        }
    }
    Ok(RowValues::Text(assembler.finish()))
}
