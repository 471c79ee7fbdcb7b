//! Schema inference, evolution and record decoding.
//!
//! Records from every file of an area are unioned under one Arrow schema.
//! Against an existing table the table's types win: new columns are appended,
//! missing columns become nulls, and values are converted to the column type.

use std::sync::Arc;

use deltalake::arrow::array::{ArrayRef, RecordBatch, new_null_array};
use deltalake::arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef, TimeUnit};
use deltalake::arrow::error::ArrowError;
use deltalake::arrow::json::ReaderBuilder;
use deltalake::arrow::json::reader::infer_json_schema_from_iterator;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use snafu::prelude::*;

use crate::error::{DecodeSnafu, LoadError, SchemaSnafu};
use crate::stamp::{INGESTION_DATE, IngestionStamp, is_metadata_column, metadata_fields};

/// Infer one schema across all records.
///
/// Columns never seen with a value become nullable strings, as do columns
/// whose values disagree in shape (a scalar in one record, an object in
/// another).
pub fn infer_schema(records: &[Value]) -> Result<Schema, LoadError> {
    let schema = match infer_json_schema_from_iterator(records.iter().map(Ok::<_, ArrowError>)) {
        Ok(schema) => schema,
        Err(source) => widen_conflicts(records).ok_or(source).context(SchemaSnafu)?,
    };
    Ok(coerce_schema(&schema))
}

/// Infer each column on its own, falling back to strings where the column's
/// values cannot share a type.
///
/// Returns `None` if any record is not an object.
fn widen_conflicts(records: &[Value]) -> Option<Schema> {
    let mut columns: IndexMap<&str, Vec<&Value>> = IndexMap::new();
    for record in records {
        let Value::Object(fields) = record else {
            return None;
        };
        for (name, value) in fields {
            columns.entry(name.as_str()).or_default().push(value);
        }
    }

    let fields: Vec<Field> = columns
        .into_iter()
        .map(|(name, values)| {
            let column = values.into_iter().map(|value| {
                let mut record = Map::new();
                record.insert(name.to_string(), value.clone());
                Ok::<_, ArrowError>(Value::Object(record))
            });
            infer_json_schema_from_iterator(column)
                .ok()
                .and_then(|schema| schema.field_with_name(name).ok().cloned())
                .unwrap_or_else(|| Field::new(name, DataType::Utf8, true))
        })
        .collect();

    Some(Schema::new(fields))
}

/// Full table schema for a new table: payload columns then metadata columns.
pub fn table_schema(payload: &Schema) -> Schema {
    let fields: Vec<Field> = payload
        .fields()
        .iter()
        .filter(|f| !is_metadata_column(f.name()))
        .map(|f| f.as_ref().clone())
        .chain(metadata_fields())
        .collect();
    Schema::new(fields)
}

/// Table schema extended with payload columns it does not have yet.
///
/// Returns `None` when the table already covers every incoming column.
pub fn merge_schema(table: &Schema, incoming: &Schema) -> Option<Schema> {
    let added: Vec<FieldRef> = incoming
        .fields()
        .iter()
        .filter(|f| !is_metadata_column(f.name()) && table.field_with_name(f.name()).is_err())
        .map(|f| Arc::new(f.as_ref().clone().with_nullable(true)))
        .collect();

    if added.is_empty() {
        return None;
    }

    let fields: Vec<FieldRef> = table.fields().iter().cloned().chain(added).collect();
    Some(Schema::new_with_metadata(fields, table.metadata().clone()))
}

/// Columns stored in data files: everything except the partition column.
pub fn data_schema(table: &Schema) -> Schema {
    let fields: Vec<FieldRef> = table
        .fields()
        .iter()
        .filter(|f| f.name() != INGESTION_DATE)
        .cloned()
        .collect();
    Schema::new(fields)
}

/// Payload columns only, as decoded from JSON.
fn payload_schema(table: &Schema) -> Schema {
    let fields: Vec<FieldRef> = table
        .fields()
        .iter()
        .filter(|f| !is_metadata_column(f.name()))
        .cloned()
        .collect();
    Schema::new(fields)
}

/// Decode records into a batch laid out for the table's data files.
///
/// Fails if any value cannot be represented in its column type.
pub fn build_batch(
    records: &[Value],
    table: &Schema,
    stamp: &IngestionStamp,
) -> Result<RecordBatch, LoadError> {
    let payload = Arc::new(payload_schema(table));
    let decoded = decode_records(records, Arc::clone(&payload))?;
    let rows = decoded.num_rows();

    let target = Arc::new(data_schema(table));
    let columns: Vec<ArrayRef> = target
        .fields()
        .iter()
        .map(|field| {
            stamp
                .column(field.name(), rows)
                .or_else(|| decoded.column_by_name(field.name()).cloned())
                .unwrap_or_else(|| new_null_array(field.data_type(), rows))
        })
        .collect();

    RecordBatch::try_new(target, columns).context(DecodeSnafu)
}

fn decode_records(records: &[Value], schema: SchemaRef) -> Result<RecordBatch, LoadError> {
    let coerced: Vec<Value> = records
        .iter()
        .cloned()
        .map(|mut record| {
            if let Value::Object(fields) = &mut record {
                for field in schema.fields() {
                    if let Some(value) = fields.get_mut(field.name()) {
                        coerce_value_for_field(value, field.data_type());
                    }
                }
            }
            record
        })
        .collect();

    let mut decoder = ReaderBuilder::new(Arc::clone(&schema))
        .with_batch_size(coerced.len().max(1))
        .with_strict_mode(false)
        .build_decoder()
        .context(DecodeSnafu)?;
    decoder.serialize(&coerced).context(DecodeSnafu)?;

    let batch = decoder.flush().context(DecodeSnafu)?;
    Ok(batch.unwrap_or_else(|| RecordBatch::new_empty(schema)))
}

/// Stringify values headed for string columns, recursing into nested types.
fn coerce_value_for_field(value: &mut Value, data_type: &DataType) {
    match data_type {
        DataType::Utf8 | DataType::LargeUtf8 => match value {
            Value::String(_) | Value::Null => {}
            Value::Number(n) => *value = Value::String(n.to_string()),
            Value::Bool(b) => *value = Value::String(b.to_string()),
            Value::Object(_) | Value::Array(_) => *value = Value::String(value.to_string()),
        },
        DataType::Struct(fields) => {
            if let Value::Object(obj) = value {
                for field in fields.iter() {
                    if let Some(nested) = obj.get_mut(field.name()) {
                        coerce_value_for_field(nested, field.data_type());
                    }
                }
            }
        }
        DataType::List(field) | DataType::LargeList(field) => {
            if let Value::Array(items) = value {
                for item in items.iter_mut() {
                    coerce_value_for_field(item, field.data_type());
                }
            }
        }
        _ => {}
    }
}

fn coerce_schema(schema: &Schema) -> Schema {
    let fields: Vec<FieldRef> = schema
        .fields()
        .iter()
        .map(|f| coerce_field(Arc::clone(f)))
        .collect();
    Schema::new_with_metadata(fields, schema.metadata().clone())
}

/// Make an inferred field storable in Delta Lake.
fn coerce_field(field: FieldRef) -> FieldRef {
    let coerced = match field.data_type() {
        // Delta has no null type, and no struct without fields.
        DataType::Null => DataType::Utf8,
        DataType::Struct(fields) if fields.is_empty() => DataType::Utf8,
        // Delta requires microsecond precision.
        DataType::Timestamp(TimeUnit::Nanosecond | TimeUnit::Millisecond, tz) => {
            DataType::Timestamp(TimeUnit::Microsecond, tz.clone())
        }
        DataType::List(inner) => DataType::List(coerce_field(Arc::clone(inner))),
        DataType::Struct(fields) => DataType::Struct(
            fields
                .iter()
                .map(|f| coerce_field(Arc::clone(f)))
                .collect::<Vec<_>>()
                .into(),
        ),
        _ => return field,
    };

    Arc::new(Field::new(field.name(), coerced, true))
}
