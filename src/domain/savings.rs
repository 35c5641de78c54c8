//! Savings goals and their append-only transaction ledger.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::common::Audit;

/// A savings goal (or free-form fund) with a running balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoal {
    #[serde(default)]
    pub id: Option<u64>,
    pub user_id: u64,
    #[serde(rename = "type")]
    pub kind: SavingsGoalKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Ignored for funds, which have no fixed target.
    pub target_amount: f64,
    pub current_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SavingsGoalKind {
    Goal,
    Fund,
}

impl fmt::Display for SavingsGoalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SavingsGoalKind::Goal => "Goal",
            SavingsGoalKind::Fund => "Fund",
        };
        f.write_str(label)
    }
}

/// One deposit or withdrawal against a savings goal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavingsTransaction {
    #[serde(default)]
    pub id: Option<u64>,
    pub goal_id: u64,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: SavingsTransactionKind,
    #[serde(default)]
    pub notes: String,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SavingsTransactionKind {
    Deposit,
    Withdrawal,
}

impl SavingsTransactionKind {
    /// Signed effect of the transaction on the goal balance.
    pub fn signed(self, amount: f64) -> f64 {
        match self {
            SavingsTransactionKind::Deposit => amount,
            SavingsTransactionKind::Withdrawal => -amount,
        }
    }
}

impl fmt::Display for SavingsTransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SavingsTransactionKind::Deposit => "Deposit",
            SavingsTransactionKind::Withdrawal => "Withdrawal",
        };
        f.write_str(label)
    }
}
