//! Domain model for payment instances (dated occurrences of a plan).

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::common::Audit;

/// One concrete occurrence materialized from a payment plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstance {
    #[serde(default)]
    pub id: Option<u64>,
    pub payment_id: u64,
    pub amount: f64,
    pub payment_date: NaiveDate,
    /// 1-based and contiguous within a plan.
    pub installment_number: u32,
    pub state: InstanceState,
    #[serde(default)]
    pub comments: String,
    #[serde(flatten)]
    pub audit: Audit,
}

impl PaymentInstance {
    pub fn is_paid(&self) -> bool {
        self.state == InstanceState::Paid
    }

    /// Backfill rule applied at generation time: anything due on or before
    /// today is presumed already settled.
    pub fn state_for_date(date: NaiveDate, today: NaiveDate) -> InstanceState {
        if date <= today {
            InstanceState::Paid
        } else {
            InstanceState::Pending
        }
    }
}

/// Lifecycle state of a single instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceState {
    Pending,
    Paid,
    Cancelled,
    Overdue,
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstanceState::Pending => "Pending",
            InstanceState::Paid => "Paid",
            InstanceState::Cancelled => "Cancelled",
            InstanceState::Overdue => "Overdue",
        };
        f.write_str(label)
    }
}
