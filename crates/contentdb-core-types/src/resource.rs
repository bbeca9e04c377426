//! Opaque resource identifiers
//!
//! A `ResourceId` addresses a table, a single row or a synthesized join
//! without the caller knowing the physical table name. The textual form is
//! `content://<authority>/<path>`.

use serde::{Deserialize, Serialize};

/// URI scheme prefix of every resource identifier
pub const SCHEME: &str = "content://";

/// Opaque identifier for a collection, an item or a join
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    /// Compose an identifier from an authority and a path
    ///
    /// Leading slashes on `path` are ignored.
    pub fn new(authority: &str, path: &str) -> Self {
        Self(format!(
            "{}{}/{}",
            SCHEME,
            authority,
            path.trim_start_matches('/')
        ))
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The authority component, if the identifier is well formed
    pub fn authority(&self) -> Option<&str> {
        self.split().map(|(authority, _)| authority)
    }

    /// The path component including its leading slash
    pub fn path(&self) -> Option<&str> {
        self.split().map(|(_, path)| path)
    }

    /// The final path segment (the row token of an item identifier)
    pub fn last_segment(&self) -> Option<&str> {
        self.path()
            .and_then(|p| p.rsplit('/').next())
            .filter(|s| !s.is_empty())
    }

    /// Identifier of the row `id` inside this collection
    pub fn with_appended_id(&self, id: i64) -> Self {
        Self(format!("{}/{}", self.0.trim_end_matches('/'), id))
    }

    fn split(&self) -> Option<(&str, &str)> {
        let rest = self.0.strip_prefix(SCHEME)?;
        let slash = rest.find('/')?;
        let (authority, path) = rest.split_at(slash);
        if authority.is_empty() {
            return None;
        }
        Some((authority, path))
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
