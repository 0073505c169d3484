//! Categories: the folder nodes of the library tree.
//!
//! Categories live in a flat collection. The hierarchy is expressed only
//! through `parent_id`, and sibling position only through `order`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category identifier.
///
/// Generated ids look like `cat-<uuid>`, but ids loaded from disk or from a
/// backup are kept verbatim, whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// Generate a fresh, unique category id
    pub fn generate() -> Self {
        Self(format!("cat-{}", Uuid::new_v4().simple()))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CategoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CategoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named folder in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Unique identifier
    pub id: CategoryId,

    /// Display name (never blank)
    pub name: String,

    /// Parent category, `None` for a root
    pub parent_id: Option<CategoryId>,

    /// Position among siblings (ascending)
    pub order: i64,
}

impl Category {
    /// Create a category with a freshly generated id
    pub fn new(name: impl Into<String>, parent_id: Option<CategoryId>, order: i64) -> Self {
        Self {
            id: CategoryId::generate(),
            name: name.into(),
            parent_id,
            order,
        }
    }

    /// Use a specific id instead of a generated one
    pub fn with_id(mut self, id: impl Into<CategoryId>) -> Self {
        self.id = id.into();
        self
    }

    /// Whether this category sits at the top level
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
