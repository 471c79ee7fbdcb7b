//! Intake file parsing.
//!
//! An intake file holds a single JSON object, a JSON array of objects, or a
//! sequence of objects separated by whitespace (NDJSON included). Every
//! record must be an object; anything else fails the file.

use serde_json::{Deserializer, Value};
use snafu::prelude::*;

use crate::error::{LoadError, NotAnObjectSnafu, ParseSnafu};

/// Parse every record in an intake file.
///
/// Returns the records as JSON objects. A file with no content yields no
/// records.
pub fn parse_records(path: &str, bytes: &[u8]) -> Result<Vec<Value>, LoadError> {
    let mut records = Vec::new();

    for value in Deserializer::from_slice(bytes).into_iter::<Value>() {
        match value.context(ParseSnafu { path })? {
            Value::Array(items) => {
                for item in items {
                    push_object(path, &mut records, item)?;
                }
            }
            other => push_object(path, &mut records, other)?,
        }
    }

    Ok(records)
}

fn push_object(path: &str, records: &mut Vec<Value>, value: Value) -> Result<(), LoadError> {
    ensure!(
        value.is_object(),
        NotAnObjectSnafu {
            path,
            kind: json_kind(&value),
        }
    );
    records.push(value);
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
