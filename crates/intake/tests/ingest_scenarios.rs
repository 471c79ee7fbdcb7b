//! End-to-end ingest scenarios against a local intake root.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde_json::{Value, json};
use tempfile::TempDir;

use intake::config::IngressConfig;
use intake::error::StorageError;
use intake::http::ingest;
use intake::principal::CLIENT_PRINCIPAL_HEADER;
use intake::{DestinationPath, Ingress, PayloadWriter};
use landing_core::StorageProvider;

const ROLE_CLAIM: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";

fn config_for(root: &str) -> IngressConfig {
    let yaml = format!(
        r#"
storage:
  url: "{root}"
required_role: DataIngest.Write
areas:
  transaction: transaction
  merchant_fee: merchant_fee
  entity: entity
"#
    );
    IngressConfig::parse(&yaml).unwrap()
}

async fn local_storage(dir: &TempDir) -> Arc<StorageProvider> {
    Arc::new(
        StorageProvider::for_url_with_options(dir.path().to_str().unwrap(), HashMap::new())
            .await
            .unwrap(),
    )
}

fn headers_with_roles(roles: &[&str]) -> HeaderMap {
    let claims: Vec<Value> = roles
        .iter()
        .map(|role| json!({"typ": ROLE_CLAIM, "val": role}))
        .collect();
    let encoded = STANDARD.encode(json!({"auth_typ": "aad", "claims": claims}).to_string());

    let mut headers = HeaderMap::new();
    headers.insert(
        CLIENT_PRINCIPAL_HEADER,
        HeaderValue::from_str(&encoded).unwrap(),
    );
    headers
}

async fn post(ingress: &Arc<Ingress>, headers: HeaderMap, body: Value) -> Response {
    let mut request = Request::new(Body::from(body.to_string()));
    *request.headers_mut() = headers;
    ingest(State(ingress.clone()), request).await
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn intake_files(dir: &TempDir) -> Vec<String> {
    let mut files = Vec::new();
    let mut stack = vec![dir.path().to_path_buf()];
    while let Some(path) = stack.pop() {
        for entry in std::fs::read_dir(&path).unwrap() {
            let entry = entry.unwrap();
            if entry.file_type().unwrap().is_dir() {
                stack.push(entry.path());
            } else {
                let relative = entry.path().strip_prefix(dir.path()).unwrap().to_owned();
                files.push(relative.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    files.sort();
    files
}

#[tokio::test]
async fn test_authorized_daily_upload_is_stored() {
    let dir = TempDir::new().unwrap();
    let storage = local_storage(&dir).await;
    let config = config_for(dir.path().to_str().unwrap());
    let ingress = Arc::new(Ingress::new(&config, storage.clone()));

    let body = json!({
        "filename": "f1.json",
        "upload_type": "daily",
        "table": "transaction",
        "records": [{"id": 1, "amount": 12.5}],
    });
    let response = post(&ingress, headers_with_roles(&["DataIngest.Write"]), body.clone()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Accepted.");
    assert_eq!(intake_files(&dir), vec!["daily/transaction/f1.json"]);

    let stored = storage.get("daily/transaction/f1.json").await.unwrap();
    let stored: Value = serde_json::from_slice(&stored).unwrap();
    assert_eq!(stored, body);
}

#[tokio::test]
async fn test_missing_role_is_forbidden_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let storage = local_storage(&dir).await;
    let config = config_for(dir.path().to_str().unwrap());
    let ingress = Arc::new(Ingress::new(&config, storage));

    let body = json!({"filename": "f1.json", "upload_type": "daily", "table": "transaction"});

    let response = post(&ingress, headers_with_roles(&["Reader"]), body.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_text(response).await, "Forbidden.");

    let response = post(&ingress, HeaderMap::new(), body).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert!(intake_files(&dir).is_empty());
}

#[tokio::test]
async fn test_unknown_table_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let storage = local_storage(&dir).await;
    let config = config_for(dir.path().to_str().unwrap());
    let ingress = Arc::new(Ingress::new(&config, storage));

    let body = json!({"filename": "f.json", "upload_type": "daily", "table": "unknown"});
    let response = post(&ingress, headers_with_roles(&["DataIngest.Write"]), body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Bad request.");
    assert!(intake_files(&dir).is_empty());
}

#[tokio::test]
async fn test_unsupported_upload_type_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let storage = local_storage(&dir).await;
    let config = config_for(dir.path().to_str().unwrap());
    let ingress = Arc::new(Ingress::new(&config, storage));

    let body = json!({"filename": "f1.json", "upload_type": "weekly", "table": "transaction"});
    let response = post(&ingress, headers_with_roles(&["DataIngest.Write"]), body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Bad request.");
    assert!(intake_files(&dir).is_empty());
}

#[tokio::test]
async fn test_distinct_filenames_never_share_an_object() {
    let dir = TempDir::new().unwrap();
    let storage = local_storage(&dir).await;
    let config = config_for(dir.path().to_str().unwrap());
    let ingress = Arc::new(Ingress::new(&config, storage.clone()));
    let headers = headers_with_roles(&["DataIngest.Write"]);

    let first = json!({"filename": "a/b.json", "upload_type": "daily", "table": "entity", "v": 1});
    let response = post(&ingress, headers.clone(), first).await;
    assert_eq!(response.status(), StatusCode::OK);

    let second = json!({"filename": "a//b.json", "upload_type": "daily", "table": "entity", "v": 2});
    let response = post(&ingress, headers, second).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stored = storage.get("daily/entity/a/b.json").await.unwrap();
    let stored: Value = serde_json::from_slice(&stored).unwrap();
    assert_eq!(stored["v"], 1);
}

#[tokio::test]
async fn test_repeat_upload_overwrites() {
    let dir = TempDir::new().unwrap();
    let storage = local_storage(&dir).await;
    let config = config_for(dir.path().to_str().unwrap());
    let ingress = Arc::new(Ingress::new(&config, storage.clone()));
    let headers = headers_with_roles(&["DataIngest.Write"]);

    for version in [1, 2] {
        let body = json!({
            "filename": "fees.json",
            "upload_type": "Initial",
            "table": "MERCHANT_FEE",
            "version": version,
        });
        let response = post(&ingress, headers.clone(), body).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(intake_files(&dir), vec!["initial/merchant_fee/fees.json"]);
    let stored = storage.get("initial/merchant_fee/fees.json").await.unwrap();
    let stored: Value = serde_json::from_slice(&stored).unwrap();
    assert_eq!(stored["version"], 2);
    assert_eq!(stored["upload_type"], "initial");
    assert_eq!(stored["table"], "merchant_fee");
}

struct FailingWriter;

#[async_trait]
impl PayloadWriter for FailingWriter {
    async fn write(&self, _: &DestinationPath, _: Bytes) -> Result<(), StorageError> {
        Err(StorageError::Io {
            source: std::io::Error::other("disk unavailable"),
        })
    }
}

#[tokio::test]
async fn test_storage_failure_is_generic_server_error() {
    let config = config_for("file:///unused");
    let ingress = Arc::new(Ingress::new(&config, Arc::new(FailingWriter)));

    let body = json!({"filename": "e.json", "upload_type": "daily", "table": "entity"});
    let response = post(&ingress, headers_with_roles(&["DataIngest.Write"]), body).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Server error.");
}
