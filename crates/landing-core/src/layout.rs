//! Intake folder layout shared by the ingress and the lander.
//!
//! Objects land at `{category}/{folder}/{filename}` relative to the intake
//! root. The ingress derives write paths from [`intake_prefix`] and the lander
//! lists the same prefixes, so both stages agree on where files live without
//! any side-channel index.

use std::fmt;

use serde::{Deserialize, Serialize};

/// File extension the lander picks up from intake folders.
pub const INTAKE_FILE_EXTENSION: &str = ".json";

/// Top-level intake partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryRoot {
    /// Bulk initial loads.
    Initial,
    /// Incremental daily drops.
    Daily,
    /// Out-of-band corrections. Never written by the ingress.
    Corrections,
}

impl CategoryRoot {
    /// Every category the lander scans, in scan order.
    pub const ALL: [CategoryRoot; 3] = [
        CategoryRoot::Initial,
        CategoryRoot::Daily,
        CategoryRoot::Corrections,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryRoot::Initial => "initial",
            CategoryRoot::Daily => "daily",
            CategoryRoot::Corrections => "corrections",
        }
    }
}

impl fmt::Display for CategoryRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefix under which files for `folder` in `category` are stored.
pub fn intake_prefix(category: CategoryRoot, folder: &str) -> String {
    format!("{}/{}", category.as_str(), folder)
}

/// Full object key for a file in an intake folder.
pub fn intake_key(category: CategoryRoot, folder: &str, filename: &str) -> String {
    format!("{}/{}", intake_prefix(category, folder), filename)
}

/// Whether a path relative to `prefix` is a landable intake file.
///
/// Only direct children ending in `.json` qualify; nested objects are ignored.
pub fn is_intake_file(prefix: &str, relative_path: &str) -> bool {
    let Some(name) = relative_path
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
    else {
        return false;
    };

    !name.contains('/')
        && name.len() > INTAKE_FILE_EXTENSION.len()
        && name.ends_with(INTAKE_FILE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intake_key_layout() {
        assert_eq!(
            intake_key(CategoryRoot::Daily, "transaction", "f1.json"),
            "daily/transaction/f1.json"
        );
        assert_eq!(
            intake_prefix(CategoryRoot::Corrections, "entity"),
            "corrections/entity"
        );
    }

    #[test]
    fn test_is_intake_file_direct_children_only() {
        let prefix = "initial/entity";
        assert!(is_intake_file(prefix, "initial/entity/e1.json"));
        assert!(!is_intake_file(prefix, "initial/entity/nested/e1.json"));
        assert!(!is_intake_file(prefix, "initial/entity/e1.csv"));
        assert!(!is_intake_file(prefix, "initial/entity/.json"));
        assert!(!is_intake_file(prefix, "initial/entity_other/e1.json"));
    }

    #[test]
    fn test_category_serde_names() {
        let parsed: CategoryRoot = serde_yaml::from_str("corrections").unwrap();
        assert_eq!(parsed, CategoryRoot::Corrections);
        assert_eq!(CategoryRoot::Initial.to_string(), "initial");
    }
}
