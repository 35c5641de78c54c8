//! Two-level payment category hierarchy.

use serde::{Deserialize, Serialize};

use crate::domain::common::Audit;

/// A payment category. Roots have no `parent_id`; subcategories point at a
/// root. Nesting never goes deeper than two levels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCategory {
    #[serde(default)]
    pub id: Option<u64>,
    /// Display name, e.g. "Groceries".
    #[serde(rename = "value")]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl PaymentCategory {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            parent_id: None,
            audit: Audit::default(),
        }
    }

    pub fn child(name: impl Into<String>, parent_id: u64) -> Self {
        Self {
            id: None,
            name: name.into(),
            parent_id: Some(parent_id),
            audit: Audit::default(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
