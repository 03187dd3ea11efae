use tiberius::Query;

use crate::types::RowValues;

/// Bind parameters directly to the query for SQL Server.
///
/// Text goes over the wire as NVARCHAR; NULL is sent as a typed NVARCHAR NULL so the
/// server can still infer a parameter type.
pub(crate) fn bind_query_params<'a>(sql: &'a str, params: &[RowValues]) -> Query<'a> {
    let mut query = Query::new(sql);
    for param in params {
        match param {
            RowValues::Int(i) => query.bind(*i),
            RowValues::Float(f) => query.bind(*f),
            RowValues::Text(s) => query.bind(s.clone()),
            RowValues::Null => query.bind(Option::<String>::None),
        }
    }
    query
}
