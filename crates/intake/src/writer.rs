//! Payload persistence and the ingest pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use snafu::prelude::*;
use tracing::{debug, info};

use landing_core::StorageProvider;

use crate::authz::AuthorizationGate;
use crate::config::{AreaMap, IngressConfig};
use crate::error::{IngestError, StorageError, StorageSnafu};
use crate::principal::ClaimSet;
use crate::request::IngestRequest;
use crate::route::DestinationPath;

/// Writes a payload to a destination, replacing any existing object.
#[async_trait]
pub trait PayloadWriter: Send + Sync {
    async fn write(&self, destination: &DestinationPath, payload: Bytes)
    -> Result<(), StorageError>;
}

#[async_trait]
impl PayloadWriter for StorageProvider {
    async fn write(
        &self,
        destination: &DestinationPath,
        payload: Bytes,
    ) -> Result<(), StorageError> {
        self.put_json(&destination.to_object_path(), payload).await
    }
}

/// Authorize, validate, route and persist one request.
pub struct Ingress {
    gate: AuthorizationGate,
    areas: AreaMap,
    writer: Arc<dyn PayloadWriter>,
}

impl Ingress {
    pub fn new(config: &IngressConfig, writer: Arc<dyn PayloadWriter>) -> Self {
        Self {
            gate: AuthorizationGate::new(config.required_role.trim()),
            areas: config.areas.clone(),
            writer,
        }
    }

    pub fn from_parts(
        gate: AuthorizationGate,
        areas: AreaMap,
        writer: Arc<dyn PayloadWriter>,
    ) -> Self {
        Self {
            gate,
            areas,
            writer,
        }
    }

    /// Run a request through the pipeline.
    ///
    /// Authorization happens before the body is inspected, so an unauthorized
    /// caller learns nothing about validation.
    pub async fn ingest(
        &self,
        principal_header: Option<&str>,
        body: &[u8],
    ) -> Result<DestinationPath, IngestError> {
        self.authorize(principal_header)?;
        self.ingest_authorized(body).await
    }

    /// Admit or deny the caller from the raw principal header.
    pub fn authorize(&self, principal_header: Option<&str>) -> Result<(), IngestError> {
        self.gate.authorize(&ClaimSet::from_header(principal_header))
    }

    /// Validate and store a body from a caller that already passed
    /// [`Ingress::authorize`].
    pub async fn ingest_authorized(&self, body: &[u8]) -> Result<DestinationPath, IngestError> {
        let request = IngestRequest::parse(body, &self.areas)?;
        let destination = request.destination();
        let payload = request.payload()?;
        debug!(
            table = request.table(),
            upload_type = request.upload_type().as_str(),
            bytes = payload.len(),
            "Ingest request validated"
        );

        self.writer
            .write(&destination, payload)
            .await
            .context(StorageSnafu)?;

        info!(
            table = request.table(),
            upload_type = request.upload_type().as_str(),
            "Payload stored"
        );
        Ok(destination)
    }
}
