use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};

use super::protocol::{MethodCall, MethodError, MethodResponse};
use crate::config::ConnectOptions;
use crate::driver::Driver;
use crate::manager::DatabaseManager;
use crate::types::RowValues;

/// Signature every method handler implements.
pub type Handler<D> = fn(&mut DatabaseManager<D>, &Value) -> Result<Value, MethodError>;

/// Method-name to handler table.
pub struct HandlerRegistry<D: Driver> {
    handlers: HashMap<&'static str, Handler<D>>,
}

impl<D: Driver> HandlerRegistry<D> {
    /// An empty registry; every call answers `notImplemented`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// The five facade operations under their host method names.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with("connect", connect::<D>)
            .with("disconnect", disconnect::<D>)
            .with("getData", get_data::<D>)
            .with("writeData", write_data::<D>)
            .with("executeParameterizedQuery", execute_parameterized_query::<D>)
    }

    #[must_use]
    pub fn with(mut self, method: &'static str, handler: Handler<D>) -> Self {
        self.register(method, handler);
        self
    }

    /// Add or replace the handler for `method`.
    pub fn register(&mut self, method: &'static str, handler: Handler<D>) {
        self.handlers.insert(method, handler);
    }

    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered method names, sorted.
    #[must_use]
    pub fn methods(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Run the handler for `call` against `manager`.
    pub fn dispatch(&self, manager: &mut DatabaseManager<D>, call: &MethodCall) -> MethodResponse {
        let Some(handler) = self.handlers.get(call.method.as_str()) else {
            tracing::debug!(method = %call.method, "no handler registered");
            return MethodResponse::NotImplemented;
        };
        let outcome = handler(manager, &call.arguments);
        if let Err(err) = &outcome {
            tracing::debug!(method = %call.method, code = err.code, "call failed");
        }
        MethodResponse::from(outcome)
    }
}

impl<D: Driver> Default for HandlerRegistry<D> {
    fn default() -> Self {
        Self::standard()
    }
}

impl<D: Driver> fmt::Debug for HandlerRegistry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}

fn connect<D: Driver>(manager: &mut DatabaseManager<D>, args: &Value) -> Result<Value, MethodError> {
    let args = object(args)?;
    let options = ConnectOptions::new(
        required_str(args, "server")?,
        required_str(args, "database")?,
        required_str(args, "user")?,
        required_str(args, "password")?,
        timeout_arg(args)?,
    )
    .with_reconnect(optional_bool(args, "reconnect")?.unwrap_or(false));
    Ok(Value::Bool(manager.connect_with(options)?))
}

fn disconnect<D: Driver>(manager: &mut DatabaseManager<D>, _args: &Value) -> Result<Value, MethodError> {
    manager.disconnect()?;
    Ok(Value::Null)
}

fn get_data<D: Driver>(manager: &mut DatabaseManager<D>, args: &Value) -> Result<Value, MethodError> {
    let query = required_str(object(args)?, "query")?;
    Ok(Value::String(manager.get_data(query)?))
}

fn write_data<D: Driver>(manager: &mut DatabaseManager<D>, args: &Value) -> Result<Value, MethodError> {
    let query = required_str(object(args)?, "query")?;
    Ok(Value::String(manager.write_data(query)?))
}

fn execute_parameterized_query<D: Driver>(
    manager: &mut DatabaseManager<D>,
    args: &Value,
) -> Result<Value, MethodError> {
    let args = object(args)?;
    let sql = required_str(args, "sql")?;
    let params = params_arg(args)?;
    let result = manager.execute_parameterized(sql, &params)?;
    let json = result.to_json().map_err(MethodError::from)?;
    Ok(Value::String(json))
}

fn object(args: &Value) -> Result<&Map<String, Value>, MethodError> {
    args.as_object()
        .ok_or_else(|| MethodError::invalid_arguments("Invalid Arguments: expected an object"))
}

fn required_str<'a>(args: &'a Map<String, Value>, name: &str) -> Result<&'a str, MethodError> {
    match args.get(name) {
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(MethodError::invalid_arguments(format!(
            "Invalid Arguments: '{name}' must be a string"
        ))),
        None => Err(MethodError::invalid_arguments(format!(
            "Invalid Arguments: missing '{name}'"
        ))),
    }
}

fn optional_bool(args: &Map<String, Value>, name: &str) -> Result<Option<bool>, MethodError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(value)) => Ok(Some(*value)),
        Some(_) => Err(MethodError::invalid_arguments(format!(
            "Invalid Arguments: '{name}' must be a boolean"
        ))),
    }
}

/// `timeout` or `timeoutInSeconds`, as a string or a whole number.
fn timeout_arg(args: &Map<String, Value>) -> Result<String, MethodError> {
    let value = args
        .get("timeout")
        .or_else(|| args.get("timeoutInSeconds"))
        .ok_or_else(|| MethodError::invalid_arguments("Invalid Arguments: missing 'timeout'"))?;
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) if number.is_u64() => Ok(number.to_string()),
        _ => Err(MethodError::invalid_arguments(
            "Invalid Arguments: 'timeout' must be a string or a whole number",
        )),
    }
}

fn params_arg(args: &Map<String, Value>) -> Result<Vec<RowValues>, MethodError> {
    let items = match args.get("params") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(MethodError::invalid_arguments(
                "Invalid Arguments: 'params' must be an array",
            ));
        }
    };
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::String(text) => Ok(RowValues::Text(text.clone())),
            Value::Null => Ok(RowValues::Null),
            Value::Bool(flag) => Ok(RowValues::Int(i64::from(*flag))),
            Value::Number(number) => number
                .as_i64()
                .map(RowValues::Int)
                .or_else(|| number.as_f64().map(RowValues::Float))
                .ok_or_else(|| {
                    MethodError::invalid_arguments(format!(
                        "Invalid Arguments: parameter {} is out of range",
                        idx + 1
                    ))
                }),
            Value::Array(_) | Value::Object(_) => Err(MethodError::invalid_arguments(format!(
                "Invalid Arguments: parameter {} must be a scalar",
                idx + 1
            ))),
        })
        .collect()
}
