use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;
use tiberius::{Column, ColumnData, ColumnType, Row};
use tokio::runtime::Runtime;

use super::diagnostic_from_tds;
use crate::diagnostics::{HandleKind, report_error};
use crate::driver::{ResultCursor, RowReader, RowVisitor};
use crate::error::MssqlConnectionError;
use crate::text::encode_wide;
use crate::types::{ColumnDescription, SqlTypeClass, TextChunk};

/// Rows of the first result set, pulled from the server one at a time.
pub(crate) struct TiberiusCursor<'a> {
    pub(crate) runtime: &'a Runtime,
    pub(crate) columns: Vec<Column>,
    pub(crate) rows: BoxStream<'a, tiberius::Result<Row>>,
}

impl ResultCursor for TiberiusCursor<'_> {
    fn describe_columns(&mut self) -> Result<Vec<ColumnDescription>, MssqlConnectionError> {
        Ok(self
            .columns
            .iter()
            .map(|col| ColumnDescription::new(col.name(), classify(col.column_type())))
            .collect())
    }

    fn for_each_row(&mut self, visit: &mut RowVisitor<'_>) -> Result<(), MssqlConnectionError> {
        let runtime = self.runtime;
        while let Some(row) = runtime
            .block_on(self.rows.try_next())
            .map_err(|err| report_error(HandleKind::Statement, Some(diagnostic_from_tds(&err))))?
        {
            // Later result sets of a batch are drained but not projected.
            if row.result_index() > 0 {
                continue;
            }
            let mut reader = TiberiusRow::new(row);
            visit(&mut reader)?;
        }
        Ok(())
    }
}

/// Projection class for a TDS column type.
pub(crate) fn classify(column_type: ColumnType) -> SqlTypeClass {
    match column_type {
        ColumnType::Bit
        | ColumnType::Bitn
        | ColumnType::Int1
        | ColumnType::Int2
        | ColumnType::Int4
        | ColumnType::Int8
        | ColumnType::Intn => SqlTypeClass::Integral,
        ColumnType::Float4
        | ColumnType::Float8
        | ColumnType::Floatn
        | ColumnType::Money
        | ColumnType::Money4
        | ColumnType::Decimaln
        | ColumnType::Numericn => SqlTypeClass::Floating,
        _ => SqlTypeClass::Text,
    }
}

/// Column reader over one decoded row.
///
/// tiberius hands over whole values, so every text column is a single final chunk.
pub(crate) struct TiberiusRow {
    row: Row,
}

impl TiberiusRow {
    pub(crate) fn new(row: Row) -> Self {
        Self { row }
    }

    fn cell(&self, column: u16) -> Result<(usize, &ColumnData<'static>), MssqlConnectionError> {
        let idx = usize::from(column)
            .checked_sub(1)
            .ok_or_else(|| MssqlConnectionError::Unknown("column ordinals start at 1".into()))?;
        self.row
            .cells()
            .nth(idx)
            .map(|(_, data)| (idx, data))
            .ok_or_else(|| MssqlConnectionError::Unknown(format!("no column {column} in row")))
    }
}

impl RowReader for TiberiusRow {
    fn get_i64(&mut self, column: u16) -> Result<Option<i64>, MssqlConnectionError> {
        let (_, data) = self.cell(column)?;
        match data {
            ColumnData::U8(v) => Ok(v.map(i64::from)),
            ColumnData::I16(v) => Ok(v.map(i64::from)),
            ColumnData::I32(v) => Ok(v.map(i64::from)),
            ColumnData::I64(v) => Ok(*v),
            ColumnData::Bit(v) => Ok(v.map(i64::from)),
            other => Err(MssqlConnectionError::Unknown(format!(
                "column {column} is not integral: {other:?}"
            ))),
        }
    }

    fn get_f64(&mut self, column: u16) -> Result<Option<f64>, MssqlConnectionError> {
        let (_, data) = self.cell(column)?;
        match data {
            ColumnData::F32(v) => Ok(v.map(f64::from)),
            ColumnData::F64(v) => Ok(*v),
            ColumnData::Numeric(v) => Ok(v.map(|n| {
                // i128 mantissa; precision beyond f64 is lost, as with SQL_C_DOUBLE.
                #[allow(clippy::cast_precision_loss)]
                let mantissa = n.value() as f64;
                mantissa / 10f64.powi(i32::from(n.scale()))
            })),
            ColumnData::I32(v) => Ok(v.map(f64::from)),
            ColumnData::I64(v) => Ok(v.map(|n| {
                #[allow(clippy::cast_precision_loss)]
                let value = n as f64;
                value
            })),
            other => Err(MssqlConnectionError::Unknown(format!(
                "column {column} is not floating: {other:?}"
            ))),
        }
    }

    fn read_text_chunk(&mut self, column: u16) -> Result<TextChunk, MssqlConnectionError> {
        let (idx, data) = self.cell(column)?;
        let text = match data {
            ColumnData::String(v) => v.as_ref().map(ToString::to_string),
            ColumnData::Guid(v) => v.map(|g| g.to_string().to_uppercase()),
            ColumnData::Binary(v) => v.as_ref().map(|bytes| hex_upper(bytes)),
            ColumnData::Xml(v) => v.as_ref().map(ToString::to_string),
            ColumnData::U8(v) => v.map(|n| n.to_string()),
            ColumnData::I16(v) => v.map(|n| n.to_string()),
            ColumnData::I32(v) => v.map(|n| n.to_string()),
            ColumnData::I64(v) => v.map(|n| n.to_string()),
            ColumnData::F32(v) => v.map(|n| n.to_string()),
            ColumnData::F64(v) => v.map(|n| n.to_string()),
            ColumnData::Bit(v) => v.map(|b| if b { "1" } else { "0" }.to_string()),
            ColumnData::Numeric(v) => v.map(|n| n.to_string()),
            ColumnData::Date(_) => self
                .typed::<NaiveDate>(idx)?
                .map(|d| d.format("%Y-%m-%d").to_string()),
            ColumnData::Time(_) => self
                .typed::<NaiveTime>(idx)?
                .map(|t| t.format("%H:%M:%S%.f").to_string()),
            ColumnData::DateTimeOffset(_) => self
                .typed::<DateTime<FixedOffset>>(idx)?
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.f %:z").to_string()),
            ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
                self.typed::<NaiveDateTime>(idx)?
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.f").to_string())
            }
            #[allow(unreachable_patterns)]
            _ => None,
        };
        Ok(text.map_or(TextChunk::Null, |text| TextChunk::Last(encode_wide(&text))))
    }
}

impl TiberiusRow {
    fn typed<'r, T>(&'r self, idx: usize) -> Result<Option<T>, MssqlConnectionError>
    where
        T: tiberius::FromSql<'r>,
    {
        self.row
            .try_get::<T, usize>(idx)
            .map_err(|err| report_error(HandleKind::Statement, Some(diagnostic_from_tds(&err))))
    }
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_tds_types_like_odbc_does() {
        assert_eq!(classify(ColumnType::Intn), SqlTypeClass::Integral);
        assert_eq!(classify(ColumnType::Bit), SqlTypeClass::Integral);
        assert_eq!(classify(ColumnType::Decimaln), SqlTypeClass::Floating);
        assert_eq!(classify(ColumnType::Money), SqlTypeClass::Floating);
        assert_eq!(classify(ColumnType::NVarchar), SqlTypeClass::Text);
        assert_eq!(classify(ColumnType::Datetime2), SqlTypeClass::Text);
        assert_eq!(classify(ColumnType::Guid), SqlTypeClass::Text);
    }

    #[test]
    fn binary_renders_as_upper_hex() {
        assert_eq!(hex_upper(&[0x00, 0xab, 0x1f]), "00AB1F");
    }
}
