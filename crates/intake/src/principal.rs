//! Client principal decoding.
//!
//! The platform authenticates the caller and forwards a base64-encoded JSON
//! document in the `X-MS-CLIENT-PRINCIPAL` header. Decoding is total: any
//! fault yields an empty claim set, and the authorization gate then rejects
//! the request. Header content is never logged.

use std::collections::BTreeSet;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// Header carrying the platform-authenticated principal.
pub const CLIENT_PRINCIPAL_HEADER: &str = "x-ms-client-principal";

/// Suffix a claim type must end with (case-insensitive) to count as a role.
const ROLE_CLAIM_SUFFIX: &str = "role";

#[derive(Deserialize)]
struct ClientPrincipal {
    #[serde(default)]
    claims: Vec<Value>,
}

/// Set of role names asserted for the caller.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ClaimSet {
    roles: BTreeSet<String>,
}

impl ClaimSet {
    /// Decode the principal header. Absence or any decoding fault yields an
    /// empty set.
    pub fn from_header(value: Option<&str>) -> Self {
        let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
            return Self::default();
        };

        match decode(raw) {
            Some(claims) => claims,
            None => {
                warn!("Client principal header could not be decoded, treating caller as anonymous");
                Self::default()
            }
        }
    }

    /// Whether the caller holds exactly `role`.
    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }
}

// Role names are part of the decoded header and stay out of debug output.
impl fmt::Debug for ClaimSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimSet")
            .field("roles", &self.roles.len())
            .finish()
    }
}

impl<S: Into<String>> FromIterator<S> for ClaimSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            roles: iter.into_iter().map(Into::into).collect(),
        }
    }
}

fn decode(raw: &str) -> Option<ClaimSet> {
    let bytes = STANDARD.decode(raw).ok()?;
    let principal: ClientPrincipal = serde_json::from_slice(&bytes).ok()?;

    Some(
        principal
            .claims
            .iter()
            .filter_map(role_claim)
            .map(str::to_string)
            .collect(),
    )
}

/// Value of a claim whose type names a role; malformed entries are skipped.
fn role_claim(claim: &Value) -> Option<&str> {
    let typ = claim.get("typ")?.as_str()?;
    let val = claim.get("val")?.as_str()?;

    (!val.is_empty() && typ.to_lowercase().ends_with(ROLE_CLAIM_SUFFIX)).then_some(val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(value: &Value) -> String {
        STANDARD.encode(value.to_string())
    }

    #[test]
    fn test_absent_header_is_empty() {
        assert!(ClaimSet::from_header(None).is_empty());
        assert!(ClaimSet::from_header(Some("   ")).is_empty());
    }

    #[test]
    fn test_role_claims_extracted() {
        let header = encode(&json!({
            "auth_typ": "aad",
            "claims": [
                {"typ": "roles", "val": "Plural.Ignored"},
                {"typ": "http://schemas.microsoft.com/ws/2008/06/identity/claims/role", "val": "DataIngest.Write"},
                {"typ": "ROLE", "val": "Reader"},
                {"typ": "name", "val": "someone"},
                {"typ": "role", "val": ""},
            ]
        }));

        let claims = ClaimSet::from_header(Some(&header));
        assert_eq!(claims.len(), 2);
        assert!(claims.contains("DataIngest.Write"));
        assert!(claims.contains("Reader"));
        assert!(!claims.contains("Plural.Ignored"));
        assert!(!claims.contains("someone"));
    }

    #[test]
    fn test_role_match_is_exact() {
        let claims: ClaimSet = ["DataIngest.Write"].into_iter().collect();
        assert!(claims.contains("DataIngest.Write"));
        assert!(!claims.contains("dataingest.write"));
    }

    #[test]
    fn test_malformed_claim_entries_skipped() {
        let header = encode(&json!({
            "claims": [
                "not-an-object",
                {"typ": 5, "val": "X"},
                {"typ": "role", "val": 7},
                {"typ": "role"},
                {"typ": "role", "val": "Kept"},
            ]
        }));

        let claims = ClaimSet::from_header(Some(&header));
        assert_eq!(claims.iter().collect::<Vec<_>>(), vec!["Kept"]);
    }

    #[test]
    fn test_missing_claims_is_empty() {
        let header = encode(&json!({"auth_typ": "aad"}));
        assert!(ClaimSet::from_header(Some(&header)).is_empty());
    }

    #[test]
    fn test_decoding_faults_yield_empty() {
        assert!(ClaimSet::from_header(Some("%%%not-base64%%%")).is_empty());

        let not_json = STANDARD.encode("definitely not json");
        assert!(ClaimSet::from_header(Some(&not_json)).is_empty());

        let wrong_shape = encode(&json!({"claims": "role"}));
        assert!(ClaimSet::from_header(Some(&wrong_shape)).is_empty());

        let not_utf8 = STANDARD.encode([0xff, 0xfe, 0xfd]);
        assert!(ClaimSet::from_header(Some(&not_utf8)).is_empty());
    }

    #[test]
    fn test_debug_hides_role_names() {
        let claims: ClaimSet = ["Secret.Role"].into_iter().collect();
        let rendered = format!("{claims:?}");
        assert!(!rendered.contains("Secret.Role"));
    }
}
