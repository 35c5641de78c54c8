//! Shared audit fields for persisted records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sentinel shown by display helpers when a reference cannot be resolved.
pub const MISSING_LABEL: &str = "—";

/// Audit fields shared by every persisted record. Maintained by the record
/// store, never by the services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl Default for Audit {
    fn default() -> Self {
        Self {
            created_date: None,
            updated_date: None,
            is_active: true,
        }
    }
}

impl Audit {
    /// Stamps creation metadata when a record is first persisted.
    pub fn stamp_created(&mut self, today: NaiveDate) {
        self.created_date = Some(today);
        self.updated_date = Some(today);
        self.is_active = true;
    }

    /// Refreshes the update timestamp on every write.
    pub fn stamp_updated(&mut self, today: NaiveDate) {
        self.updated_date = Some(today);
    }
}

fn default_active() -> bool {
    true
}
