#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use mssql_connection::DiagnosticRecord;
use mssql_connection::config::ConnectOptions;
use mssql_connection::driver::{
    CursorVisitor, Driver, DriverConnection, ResultCursor, RowReader, RowVisitor,
};
use mssql_connection::error::MssqlConnectionError;
use mssql_connection::text::encode_wide;
use mssql_connection::translation::PlaceholderStyle;
use mssql_connection::types::{ColumnDescription, Completion, RowValues, SqlTypeClass, TextChunk};

/// A result set the scripted driver hands out.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<ColumnDescription>,
    pub rows: Vec<Vec<RowValues>>,
}

impl Table {
    pub fn new(columns: &[(&str, SqlTypeClass)]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|(name, class)| ColumnDescription::new(*name, *class))
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, values: Vec<RowValues>) -> Self {
        self.rows.push(values);
        self
    }
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Rows(Table),
    Affected(Option<u64>),
    Fail(DiagnosticRecord),
    Panic(&'static str),
}

/// What the facade asked the driver to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect(String),
    Query { sql: String, params: Vec<RowValues> },
    Execute { sql: String, params: Vec<RowValues> },
    Close,
}

#[derive(Debug)]
struct Script {
    outcomes: HashMap<String, VecDeque<Outcome>>,
    calls: Vec<Call>,
    chunk_units: usize,
    connect_failures: VecDeque<DiagnosticRecord>,
    panic_on_connect: bool,
    close_failure: Option<DiagnosticRecord>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            outcomes: HashMap::new(),
            calls: Vec::new(),
            chunk_units: 4,
            connect_failures: VecDeque::new(),
            panic_on_connect: false,
            close_failure: None,
        }
    }
}

impl Script {
    /// Queued outcomes are consumed in order; the last one sticks.
    fn outcome_for(&mut self, sql: &str) -> Outcome {
        match self.outcomes.get_mut(sql) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Outcome::Fail(DiagnosticRecord::new(
                "42S02",
                208,
                format!("Invalid object name in '{sql}'."),
            )),
        }
    }
}

/// In-memory driver whose answers are scripted per SQL text.
#[derive(Debug, Clone)]
pub struct ScriptedDriver {
    script: Arc<Mutex<Script>>,
    style: PlaceholderStyle,
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            style: PlaceholderStyle::Positional,
        }
    }

    pub fn with_style(mut self, style: PlaceholderStyle) -> Self {
        self.style = style;
        self
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    /// Queue `outcome` for statements whose text is exactly `sql`.
    pub fn on(&self, sql: &str, outcome: Outcome) -> &Self {
        self.script()
            .outcomes
            .entry(sql.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn chunk_units(&self, units: usize) -> &Self {
        self.script().chunk_units = units;
        self
    }

    pub fn fail_next_connect(&self, record: DiagnosticRecord) -> &Self {
        self.script().connect_failures.push_back(record);
        self
    }

    pub fn panic_on_connect(&self) -> &Self {
        self.script().panic_on_connect = true;
        self
    }

    pub fn fail_close(&self, record: DiagnosticRecord) -> &Self {
        self.script().close_failure = Some(record);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script().calls.clone()
    }

    pub fn statement_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Query { .. } | Call::Execute { .. }))
            .collect()
    }

    pub fn connect_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Connect(_)))
            .count()
    }

    pub fn close_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Close))
            .count()
    }
}

impl Driver for ScriptedDriver {
    type Connection = ScriptedConnection;

    fn connect(&self, options: &ConnectOptions) -> Result<ScriptedConnection, MssqlConnectionError> {
        let mut script = self.script();
        script
            .calls
            .push(Call::Connect(options.odbc_connection_string()));
        if script.panic_on_connect {
            drop(script);
            panic!("driver exploded while connecting");
        }
        if let Some(record) = script.connect_failures.pop_front() {
            return Err(MssqlConnectionError::Database(record));
        }
        Ok(ScriptedConnection {
            script: Arc::clone(&self.script),
        })
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.style
    }
}

pub struct ScriptedConnection {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnection {
    fn next(&self, call: Call, sql: &str) -> (Outcome, usize) {
        let mut script = self.script.lock().unwrap();
        script.calls.push(call);
        (script.outcome_for(sql), script.chunk_units)
    }
}

impl DriverConnection for ScriptedConnection {
    fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
        visit: &mut CursorVisitor<'_>,
    ) -> Result<Completion, MssqlConnectionError> {
        let call = Call::Query {
            sql: sql.to_string(),
            params: params.to_vec(),
        };
        match self.next(call, sql) {
            (Outcome::Rows(table), chunk_units) => {
                visit(&mut TableCursor { table, chunk_units })?;
                Ok(Completion::Rows)
            }
            (Outcome::Affected(count), _) => Ok(Completion::Affected(count)),
            (Outcome::Fail(record), _) => Err(MssqlConnectionError::Database(record)),
            (Outcome::Panic(message), _) => panic!("{message}"),
        }
    }

    fn execute(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Option<u64>, MssqlConnectionError> {
        let call = Call::Execute {
            sql: sql.to_string(),
            params: params.to_vec(),
        };
        match self.next(call, sql) {
            (Outcome::Rows(table), _) => Ok(Some(table.rows.len() as u64)),
            (Outcome::Affected(count), _) => Ok(count),
            (Outcome::Fail(record), _) => Err(MssqlConnectionError::Database(record)),
            (Outcome::Panic(message), _) => panic!("{message}"),
        }
    }

    fn close(self) -> Result<(), MssqlConnectionError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call::Close);
        match script.close_failure.clone() {
            Some(record) => Err(MssqlConnectionError::Database(record)),
            None => Ok(()),
        }
    }
}

struct TableCursor {
    table: Table,
    chunk_units: usize,
}

impl ResultCursor for TableCursor {
    fn describe_columns(&mut self) -> Result<Vec<ColumnDescription>, MssqlConnectionError> {
        Ok(self.table.columns.clone())
    }

    fn for_each_row(&mut self, visit: &mut RowVisitor<'_>) -> Result<(), MssqlConnectionError> {
        for values in &self.table.rows {
            let mut row = TableRow {
                values,
                chunk_units: self.chunk_units,
                offsets: HashMap::new(),
            };
            visit(&mut row)?;
        }
        Ok(())
    }
}

struct TableRow<'a> {
    values: &'a [RowValues],
    chunk_units: usize,
    offsets: HashMap<u16, usize>,
}

impl TableRow<'_> {
    fn value(&self, column: u16) -> Result<&RowValues, MssqlConnectionError> {
        self.values
            .get(usize::from(column) - 1)
            .ok_or_else(|| MssqlConnectionError::Unknown(format!("no column {column}")))
    }
}

impl RowReader for TableRow<'_> {
    fn get_i64(&mut self, column: u16) -> Result<Option<i64>, MssqlConnectionError> {
        match self.value(column)? {
            RowValues::Int(i) => Ok(Some(*i)),
            RowValues::Null => Ok(None),
            other => Err(MssqlConnectionError::Unknown(format!("not an integer: {other:?}"))),
        }
    }

    fn get_f64(&mut self, column: u16) -> Result<Option<f64>, MssqlConnectionError> {
        match self.value(column)? {
            RowValues::Float(f) => Ok(Some(*f)),
            RowValues::Int(i) => Ok(Some(*i as f64)),
            RowValues::Null => Ok(None),
            other => Err(MssqlConnectionError::Unknown(format!("not a float: {other:?}"))),
        }
    }

    fn read_text_chunk(&mut self, column: u16) -> Result<TextChunk, MssqlConnectionError> {
        let text = match self.value(column)? {
            RowValues::Null => return Ok(TextChunk::Null),
            RowValues::Text(text) => text.clone(),
            RowValues::Int(i) => i.to_string(),
            RowValues::Float(f) => f.to_string(),
        };
        let wide = encode_wide(&text);
        let offset = self.offsets.entry(column).or_insert(0);
        let end = (*offset + self.chunk_units).min(wide.len());
        let chunk = wide[*offset..end].to_vec();
        *offset = end;
        if end == wide.len() {
            Ok(TextChunk::Last(chunk))
        } else {
            Ok(TextChunk::More(chunk))
        }
    }
}

/// A connected manager over a fresh scripted driver.
pub fn connected(driver: &ScriptedDriver) -> mssql_connection::DatabaseManager<ScriptedDriver> {
    let mut manager = mssql_connection::DatabaseManager::new(driver.clone());
    manager
        .connect("db.local", "sales", "sa", "secret", "15")
        .unwrap();
    manager
}

pub fn link_lost() -> DiagnosticRecord {
    DiagnosticRecord::new("08S01", 10054, "Communication link failure")
}
