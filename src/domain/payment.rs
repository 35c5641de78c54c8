//! Domain model for payment plans (templates for one-off or recurring movements).

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::common::Audit;

/// Payment type id for incomes.
pub const INCOME_TYPE_ID: u32 = 1;
/// Payment type id for expenses.
pub const EXPENSE_TYPE_ID: u32 = 2;

/// A template describing a financial commitment. A plan with no frequency is
/// a one-off payment; with a frequency and `installments` it is a finite
/// recurring plan; with a frequency and no `installments` it is open-ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default)]
    pub id: Option<u64>,
    pub user_id: u64,
    /// Total for finite plans, amount per period for indefinite plans.
    pub total_amount: f64,
    pub payment_type_id: u32,
    pub payment_category_id: u64,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    /// 1–31 day of month for Monthly (clamped in shorter months), 1–7 ISO
    /// weekday for Weekly/Biweekly, absent otherwise.
    #[serde(default)]
    pub payment_day: Option<u32>,
    /// Number of installments for finite plans, absent for open-ended ones.
    #[serde(default)]
    pub installments: Option<u32>,
    pub state: PaymentState,
    #[serde(default)]
    pub comments: String,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Payment {
    pub fn is_once(&self) -> bool {
        self.frequency.is_none()
    }

    pub fn is_finite(&self) -> bool {
        self.frequency.is_some() && self.installments.is_some()
    }

    pub fn is_indefinite(&self) -> bool {
        self.frequency.is_some() && self.installments.is_none()
    }

    pub fn is_income(&self) -> bool {
        self.payment_type_id == INCOME_TYPE_ID
    }

    pub fn is_expense(&self) -> bool {
        self.payment_type_id == EXPENSE_TYPE_ID
    }

    pub fn frequency_label(&self) -> &'static str {
        match self.frequency {
            None => "One-off",
            Some(freq) => freq.label(),
        }
    }
}

/// Cadence of a recurring plan. A missing frequency means a one-off payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn label(self) -> &'static str {
        match self {
            Frequency::Daily => "Daily",
            Frequency::Weekly => "Weekly",
            Frequency::Biweekly => "Biweekly",
            Frequency::Monthly => "Monthly",
            Frequency::Yearly => "Yearly",
        }
    }

    /// Whether the cadence is governed by a payment day (day of month or
    /// day of week) rather than the start date alone.
    pub fn requires_payment_day(self) -> bool {
        matches!(
            self,
            Frequency::Weekly | Frequency::Biweekly | Frequency::Monthly
        )
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle state of a payment plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    Active,
    Paused,
    Cancelled,
    Completed,
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentState::Active => "Active",
            PaymentState::Paused => "Paused",
            PaymentState::Cancelled => "Cancelled",
            PaymentState::Completed => "Completed",
        };
        f.write_str(label)
    }
}
