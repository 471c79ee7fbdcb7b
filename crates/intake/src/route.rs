//! Destination routing for validated requests.

use std::fmt;

use object_store::path::Path;

use landing_core::intake_key;

use crate::request::UploadType;

/// Object key relative to the intake root, `{category}/{folder}/{filename}`.
///
/// Held as the normalized object store path, so two destinations compare
/// equal exactly when they address the same object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationPath(Path);

impl DestinationPath {
    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }

    pub fn to_object_path(&self) -> Path {
        self.0.clone()
    }
}

impl fmt::Display for DestinationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic destination for an upload. Identical inputs always yield the
/// same key, which is what gives repeated uploads overwrite semantics.
pub fn route(upload_type: UploadType, folder: &str, filename: &str) -> DestinationPath {
    DestinationPath(Path::from(intake_key(upload_type.category(), folder, filename)))
}
