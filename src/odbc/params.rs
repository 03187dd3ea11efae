use odbc_api::parameter::{InputParameter, VarWCharBox};

use crate::text::encode_wide;
use crate::types::RowValues;

/// Owned ODBC parameters in bind order.
pub(crate) type OdbcParams = Vec<Box<dyn InputParameter>>;

/// Convert facade values into ODBC input parameters.
///
/// Text is bound as `SQL_WVARCHAR` so non-ASCII values survive any client code page.
pub(crate) fn convert_params(params: &[RowValues]) -> OdbcParams {
    params
        .iter()
        .map(|value| -> Box<dyn InputParameter> {
            match value {
                RowValues::Int(i) => Box::new(*i),
                RowValues::Float(f) => Box::new(*f),
                RowValues::Text(s) => Box::new(VarWCharBox::from_vec(encode_wide(s))),
                RowValues::Null => Box::new(VarWCharBox::null()),
            }
        })
        .collect()
}
