//! intake: Authenticated HTTP ingress for the landing pipeline.
//!
//! A single `POST /ingest` endpoint authorizes the caller from the
//! platform-supplied principal header, validates the routing fields of the
//! JSON body and writes it once to `{initial|daily}/{folder}/{filename}`.

pub mod authz;
pub mod config;
pub mod error;
pub mod http;
pub mod principal;
pub mod request;
pub mod route;
pub mod writer;

pub use authz::AuthorizationGate;
pub use config::{AreaMap, IngressConfig};
pub use error::{IngestError, ValidationFault};
pub use http::router;
pub use principal::ClaimSet;
pub use request::{IngestRequest, UploadType};
pub use route::{DestinationPath, route};
pub use writer::{Ingress, PayloadWriter};
