//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in the ingress or the
//! lander. Events implement the `InternalEvent` trait which emits the
//! corresponding Prometheus metric.
//!
//! Labels never carry payload content, object paths or principal data.

use metrics::{counter, histogram};
use std::time::Duration;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

// ============================================================================
// Storage events
// ============================================================================

/// Storage operation type for metrics labeling.
#[derive(Debug, Clone, Copy)]
pub enum StorageOperation {
    Get,
    Put,
    List,
}

impl StorageOperation {
    fn as_str(&self) -> &'static str {
        match self {
            StorageOperation::Get => "get",
            StorageOperation::Put => "put",
            StorageOperation::List => "list",
        }
    }
}

/// Request status for metrics labeling.
#[derive(Debug, Clone, Copy)]
pub enum RequestStatus {
    Success,
    Error,
}

impl RequestStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Success => "success",
            RequestStatus::Error => "error",
        }
    }

    pub fn from_result<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            RequestStatus::Success
        } else {
            RequestStatus::Error
        }
    }
}

/// Event emitted when a storage request is made.
pub struct StorageRequest {
    pub operation: StorageOperation,
    pub status: RequestStatus,
}

impl InternalEvent for StorageRequest {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            status = self.status.as_str(),
            "Storage request"
        );
        counter!(
            "landing_storage_requests_total",
            "operation" => self.operation.as_str(),
            "status" => self.status.as_str()
        )
        .increment(1);
    }
}

/// Event emitted when a storage request completes (for timing).
pub struct StorageRequestDuration {
    pub operation: StorageOperation,
    pub duration: Duration,
}

impl InternalEvent for StorageRequestDuration {
    fn emit(self) {
        trace!(
            operation = self.operation.as_str(),
            duration_ms = self.duration.as_millis(),
            "Storage request duration"
        );
        histogram!(
            "landing_storage_request_duration_seconds",
            "operation" => self.operation.as_str()
        )
        .record(self.duration.as_secs_f64());
    }
}

// ============================================================================
// Ingress events
// ============================================================================

/// Terminal outcome of an ingest request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Accepted,
    Forbidden,
    BadRequest,
    ServerError,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Accepted => "accepted",
            RequestOutcome::Forbidden => "forbidden",
            RequestOutcome::BadRequest => "bad_request",
            RequestOutcome::ServerError => "server_error",
        }
    }
}

/// Event emitted when an ingest request finishes.
pub struct IngestRequestCompleted {
    pub outcome: RequestOutcome,
    pub duration: Duration,
}

impl InternalEvent for IngestRequestCompleted {
    fn emit(self) {
        trace!(
            outcome = self.outcome.as_str(),
            duration_ms = self.duration.as_millis(),
            "Ingest request completed"
        );
        counter!("intake_requests_total", "outcome" => self.outcome.as_str()).increment(1);
        histogram!("intake_request_duration_seconds").record(self.duration.as_secs_f64());
    }
}

// ============================================================================
// Lander events
// ============================================================================

/// Event emitted when intake files are discovered for an area.
pub struct FilesDiscovered {
    pub count: u64,
    pub area: String,
}

impl InternalEvent for FilesDiscovered {
    fn emit(self) {
        trace!(count = self.count, area = %self.area, "Files discovered");
        counter!("lander_files_discovered_total", "area" => self.area).increment(self.count);
    }
}

/// Event emitted when records are appended to an area table.
pub struct RecordsLanded {
    pub count: u64,
    pub area: String,
}

impl InternalEvent for RecordsLanded {
    fn emit(self) {
        trace!(count = self.count, area = %self.area, "Records landed");
        counter!("lander_records_landed_total", "area" => self.area).increment(self.count);
    }
}

/// Final status of one area load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaLoadStatus {
    Appended,
    Empty,
    Failed,
}

impl AreaLoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaLoadStatus::Appended => "appended",
            AreaLoadStatus::Empty => "empty",
            AreaLoadStatus::Failed => "failed",
        }
    }
}

/// Event emitted when an area load finishes.
pub struct AreaLoadCompleted {
    pub status: AreaLoadStatus,
    pub area: String,
}

impl InternalEvent for AreaLoadCompleted {
    fn emit(self) {
        trace!(status = self.status.as_str(), area = %self.area, "Area load completed");
        counter!(
            "lander_area_loads_total",
            "status" => self.status.as_str(),
            "area" => self.area
        )
        .increment(1);
    }
}

/// Event emitted when a Delta commit completes.
pub struct DeltaCommitCompleted {
    pub duration: Duration,
    pub area: String,
}

impl InternalEvent for DeltaCommitCompleted {
    fn emit(self) {
        trace!(
            duration_ms = self.duration.as_millis(),
            area = %self.area,
            "Delta commit completed"
        );
        histogram!("lander_delta_commit_duration_seconds", "area" => self.area)
            .record(self.duration.as_secs_f64());
    }
}
