//! Savings goals and their transaction ledger. The goal's running balance
//! is adjusted together with each persisted transaction.

use chrono::NaiveDate;

use crate::domain::{
    SavingsGoal, SavingsGoalKind, SavingsTransaction, SavingsTransactionKind,
};
use crate::errors::CoreError;
use crate::schedule::round2;
use crate::storage::Database;

use super::CoreResult;

/// User-supplied fields of a new goal. The running balance always starts
/// at zero; deposits build it up.
#[derive(Debug, Clone)]
pub struct GoalDraft {
    pub user_id: u64,
    pub kind: SavingsGoalKind,
    pub name: String,
    pub description: String,
    pub target_amount: f64,
    pub target_date: Option<NaiveDate>,
}

pub struct SavingsService;

impl SavingsService {
    pub fn create_goal(
        db: &mut Database,
        draft: GoalDraft,
        today: NaiveDate,
    ) -> CoreResult<SavingsGoal> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("goal name is empty".into()));
        }
        if draft.target_amount <= 0.0 {
            return Err(CoreError::Validation(
                "target amount must be positive".into(),
            ));
        }
        let goal = db.savings_goals.add(
            SavingsGoal {
                id: None,
                user_id: draft.user_id,
                kind: draft.kind,
                name: name.to_string(),
                description: draft.description,
                target_amount: draft.target_amount,
                current_amount: 0.0,
                target_date: draft.target_date,
                audit: Default::default(),
            },
            today,
        )?;
        tracing::debug!(id = goal.id, name, "savings goal created");
        Ok(goal)
    }

    pub fn goals_of(db: &Database, user_id: u64) -> Vec<SavingsGoal> {
        db.savings_goals
            .iter()
            .filter(|goal| goal.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Records a deposit or withdrawal and adjusts the goal's running
    /// balance as one logical unit. The goal is validated before the
    /// transaction is persisted.
    pub fn add_transaction(
        db: &mut Database,
        goal_id: u64,
        amount: f64,
        date: NaiveDate,
        kind: SavingsTransactionKind,
        notes: String,
        today: NaiveDate,
    ) -> CoreResult<(SavingsTransaction, SavingsGoal)> {
        if amount <= 0.0 {
            return Err(CoreError::Validation("amount must be positive".into()));
        }
        db.savings_goals
            .get_by_id(goal_id)
            .map_err(|_| CoreError::GoalNotFound(goal_id))?;

        let transaction = db.savings_transactions.add(
            SavingsTransaction {
                id: None,
                goal_id,
                amount,
                date,
                kind,
                notes,
                audit: Default::default(),
            },
            today,
        )?;
        let goal = db.savings_goals.update(goal_id, today, |goal| {
            goal.current_amount = round2(goal.current_amount + kind.signed(amount));
        })?;
        tracing::info!(goal_id, amount, kind = %kind, "savings transaction recorded");
        Ok((transaction, goal))
    }

    /// A goal's transactions, newest first.
    pub fn transactions_of(db: &Database, goal_id: u64) -> Vec<SavingsTransaction> {
        let mut transactions: Vec<SavingsTransaction> = db
            .savings_transactions
            .iter()
            .filter(|tx| tx.goal_id == goal_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        transactions
    }

    /// Deletes a goal and its whole transaction ledger. Transactions go
    /// first so a failure never strands orphans behind a missing goal.
    pub fn delete_goal(db: &mut Database, goal_id: u64) -> CoreResult<usize> {
        db.savings_goals
            .get_by_id(goal_id)
            .map_err(|_| CoreError::GoalNotFound(goal_id))?;
        let transactions = Self::transactions_of(db, goal_id);
        let removed = transactions.len();
        for transaction in transactions {
            db.savings_transactions
                .delete(transaction.id.unwrap_or_default())?;
        }
        db.savings_goals.delete(goal_id)?;
        tracing::info!(goal_id, transactions = removed, "savings goal deleted");
        Ok(removed)
    }
}
