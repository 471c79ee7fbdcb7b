//! Role-based authorization gate.

use snafu::ensure;

use crate::error::{ForbiddenSnafu, IngestError};
use crate::principal::ClaimSet;

/// Admits callers holding one configured role.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    required_role: String,
}

impl AuthorizationGate {
    pub fn new(required_role: impl Into<String>) -> Self {
        Self {
            required_role: required_role.into(),
        }
    }

    pub fn required_role(&self) -> &str {
        &self.required_role
    }

    /// Succeeds only when `claims` holds the required role.
    pub fn authorize(&self, claims: &ClaimSet) -> Result<(), IngestError> {
        ensure!(claims.contains(&self.required_role), ForbiddenSnafu);
        Ok(())
    }
}
