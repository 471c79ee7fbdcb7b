//! Ingest request validation.
//!
//! A request body is a JSON object carrying three routing fields next to an
//! arbitrary payload. Validation normalizes the routing fields and resolves
//! the destination folder, so a validated request always routes.

use std::str::FromStr;

use bytes::Bytes;
use serde_json::{Map, Value};
use snafu::prelude::*;

use landing_core::CategoryRoot;

use crate::config::AreaMap;
use crate::error::{IngestError, InvalidRequestSnafu, SerializeSnafu, ValidationFault};
use crate::route::{DestinationPath, route};

pub const FILENAME_FIELD: &str = "filename";
pub const UPLOAD_TYPE_FIELD: &str = "upload_type";
pub const TABLE_FIELD: &str = "table";

/// Upload category a caller may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadType {
    Initial,
    Daily,
}

impl UploadType {
    pub fn as_str(&self) -> &'static str {
        self.category().as_str()
    }

    /// Intake category this upload type lands in.
    pub fn category(&self) -> CategoryRoot {
        match self {
            UploadType::Initial => CategoryRoot::Initial,
            UploadType::Daily => CategoryRoot::Daily,
        }
    }
}

impl FromStr for UploadType {
    type Err = ValidationFault;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "initial" => Ok(UploadType::Initial),
            "daily" => Ok(UploadType::Daily),
            _ => Err(ValidationFault::InvalidUploadType),
        }
    }
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    filename: String,
    upload_type: UploadType,
    table: String,
    folder: String,
    body: Map<String, Value>,
}

impl IngestRequest {
    /// Validate a raw request body against the configured areas.
    pub fn parse(body: &[u8], areas: &AreaMap) -> Result<Self, IngestError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|_| invalid(ValidationFault::MalformedBody))?;
        let Value::Object(mut body) = value else {
            return Err(invalid(ValidationFault::NotAnObject));
        };

        let filename = string_field(&body, FILENAME_FIELD)
            .map(str::trim)
            .filter(|name| is_valid_filename(name))
            .ok_or_else(|| invalid(ValidationFault::InvalidFilename))?
            .to_string();

        let upload_type: UploadType = string_field(&body, UPLOAD_TYPE_FIELD)
            .ok_or(ValidationFault::InvalidUploadType)
            .and_then(str::parse)
            .map_err(invalid)?;

        let table = string_field(&body, TABLE_FIELD)
            .map(|table| table.trim().to_lowercase())
            .ok_or_else(|| invalid(ValidationFault::UnknownTable))?;
        let folder = areas
            .folder_for(&table)
            .ok_or_else(|| invalid(ValidationFault::UnknownTable))?
            .to_string();

        body.insert(FILENAME_FIELD.to_string(), Value::String(filename.clone()));
        body.insert(
            UPLOAD_TYPE_FIELD.to_string(),
            Value::String(upload_type.as_str().to_string()),
        );
        body.insert(TABLE_FIELD.to_string(), Value::String(table.clone()));

        Ok(Self {
            filename,
            upload_type,
            table,
            folder,
            body,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn upload_type(&self) -> UploadType {
        self.upload_type
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn destination(&self) -> DestinationPath {
        route(self.upload_type, &self.folder, &self.filename)
    }

    /// Bytes to store: the full body with routing fields normalized.
    pub fn payload(&self) -> Result<Bytes, IngestError> {
        serde_json::to_vec(&self.body)
            .map(Bytes::from)
            .context(SerializeSnafu)
    }
}

/// A filename must map to exactly one object key: no empty, `.` or `..`
/// segments, which the object store would collapse or escape.
fn is_valid_filename(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

fn string_field<'a>(body: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    body.get(field).and_then(Value::as_str)
}

fn invalid(fault: ValidationFault) -> IngestError {
    InvalidRequestSnafu { fault }.build()
}
