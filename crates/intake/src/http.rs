//! HTTP surface of the ingress.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::response::Response;
use axum::routing::post;
use tracing::{error, info, warn};

use landing_core::emit;
use landing_core::metrics::events::{IngestRequestCompleted, RequestOutcome};

use crate::error::{IngestError, InvalidRequestSnafu, ValidationFault, outcome_response};
use crate::principal::CLIENT_PRINCIPAL_HEADER;
use crate::writer::Ingress;

pub const INGEST_ROUTE: &str = "/ingest";

/// Router exposing `POST /ingest`.
pub fn router(ingress: Arc<Ingress>) -> Router {
    Router::new()
        .route(INGEST_ROUTE, post(ingest))
        .with_state(ingress)
}

/// Largest request body read before the request is rejected as bad.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Handle one ingest request.
///
/// The caller is authorized from the headers before the body is read, so
/// an oversized or broken body from an unauthorized caller is still a 403.
/// Responses are one of four fixed bodies. Failure details stay server-side.
pub async fn ingest(State(ingress): State<Arc<Ingress>>, request: Request) -> Response {
    let start = Instant::now();
    info!("Ingest endpoint invoked");

    let (parts, body) = request.into_parts();
    // A header that isn't visible ASCII can't be valid base64.
    let principal = parts
        .headers
        .get(CLIENT_PRINCIPAL_HEADER)
        .map(|value| value.to_str().unwrap_or_default());

    let result = match ingress.authorize(principal) {
        Ok(()) => match to_bytes(body, MAX_BODY_BYTES).await {
            Ok(body) => ingress.ingest_authorized(&body).await.map(|_| ()),
            Err(_) => InvalidRequestSnafu {
                fault: ValidationFault::UnreadableBody,
            }
            .fail(),
        },
        Err(e) => Err(e),
    };

    let outcome = match result {
        Ok(()) => RequestOutcome::Accepted,
        Err(e) => {
            log_failure(&e);
            e.outcome()
        }
    };

    emit!(IngestRequestCompleted {
        outcome,
        duration: start.elapsed(),
    });
    outcome_response(outcome)
}

fn log_failure(error: &IngestError) {
    match error {
        IngestError::Forbidden => warn!("Ingest request rejected: missing required role"),
        IngestError::InvalidRequest { fault } => {
            warn!(fault = fault.as_str(), "Ingest request rejected: invalid request")
        }
        IngestError::Serialize { .. } | IngestError::Storage { .. } => {
            error!(kind = error.kind(), "Ingest request failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::AuthorizationGate;
    use crate::error::StorageError;
    use crate::route::DestinationPath;
    use crate::writer::PayloadWriter;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{HeaderValue, StatusCode};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;

    struct NullWriter;

    #[async_trait]
    impl PayloadWriter for NullWriter {
        async fn write(&self, _: &DestinationPath, _: Bytes) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn state() -> State<Arc<Ingress>> {
        State(Arc::new(Ingress::from_parts(
            AuthorizationGate::new("DataIngest.Write"),
            [("entity", "entity")].into_iter().collect(),
            Arc::new(NullWriter),
        )))
    }

    fn request(principal: Option<HeaderValue>, body: impl Into<Body>) -> Request {
        let mut request = Request::new(body.into());
        if let Some(principal) = principal {
            request
                .headers_mut()
                .insert(CLIENT_PRINCIPAL_HEADER, principal);
        }
        request
    }

    fn writer_principal() -> HeaderValue {
        let principal = serde_json::json!({
            "claims": [{"typ": "role", "val": "DataIngest.Write"}],
        });
        HeaderValue::from_str(&STANDARD.encode(principal.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_missing_header_forbidden() {
        let response = ingest(state(), request(None, "{}")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_non_ascii_header_forbidden() {
        let header = HeaderValue::from_bytes(&[0xe9, 0x41]).unwrap();
        let response = ingest(state(), request(Some(header), "{}")).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_oversized_body_checked_after_authorization() {
        let oversized = vec![b' '; MAX_BODY_BYTES + 1];

        let response = ingest(state(), request(None, oversized.clone())).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = ingest(state(), request(Some(writer_principal()), oversized)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Bad request.");
    }

    #[tokio::test]
    async fn test_authorized_request_accepted() {
        let body = r#"{"filename": "e.json", "upload_type": "daily", "table": "entity"}"#;
        let response = ingest(state(), request(Some(writer_principal()), body)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
