//! Instance-level edits and the reconciliation rules that keep a plan and
//! its instances consistent: remainder redistribution, forward-only edits
//! on open-ended plans, and idempotent auto-completion.

use chrono::NaiveDate;

use crate::domain::{InstanceState, Payment, PaymentInstance, PaymentState};
use crate::errors::CoreError;
use crate::schedule::{round2, RecurrenceSpec};
use crate::storage::Database;

use super::CoreResult;

/// Fields an instance edit may carry. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct InstancePatch {
    pub amount: Option<f64>,
    pub comments: Option<String>,
    pub payment_category_id: Option<u64>,
}

pub struct InstanceService;

impl InstanceService {
    /// Sets one instance's state and reconciles the owning plan. An
    /// orphaned instance (plan already gone) is updated without a cascade.
    pub fn set_state(
        db: &mut Database,
        instance_id: u64,
        state: InstanceState,
        today: NaiveDate,
    ) -> CoreResult<PaymentInstance> {
        let instance = db
            .payment_instances
            .update(instance_id, today, |inst| inst.state = state)
            .map_err(|_| CoreError::InstanceNotFound(instance_id))?;
        if db.payments.get_by_id(instance.payment_id).is_ok() {
            Self::reconcile_plan(db, instance.payment_id, today)?;
        }
        Ok(instance)
    }

    /// Auto-completion: a plan with at least one instance and every
    /// instance paid becomes Completed; a Completed plan with an unpaid
    /// instance reverts to Active. Applying it twice changes nothing.
    pub fn reconcile_plan(
        db: &mut Database,
        payment_id: u64,
        today: NaiveDate,
    ) -> CoreResult<Option<PaymentState>> {
        let payment = db
            .payments
            .get_by_id(payment_id)
            .map_err(|_| CoreError::PaymentNotFound(payment_id))?;
        let instances = db.instances_of(payment_id);
        let all_paid = !instances.is_empty() && instances.iter().all(PaymentInstance::is_paid);

        let target = if all_paid && payment.state != PaymentState::Completed {
            Some(PaymentState::Completed)
        } else if !all_paid && payment.state == PaymentState::Completed {
            Some(PaymentState::Active)
        } else {
            None
        };
        if let Some(state) = target {
            db.payments
                .update(payment_id, today, |payment| payment.state = state)?;
            tracing::info!(payment_id, state = %state, "plan auto-reconciled");
        }
        Ok(target)
    }

    /// Reconciles every plan, e.g. right after loading a snapshot.
    pub fn reconcile_all(db: &mut Database, today: NaiveDate) -> CoreResult<usize> {
        let ids: Vec<u64> = db.payments.iter().filter_map(|payment| payment.id).collect();
        let mut changed = 0;
        for id in ids {
            if Self::reconcile_plan(db, id, today)?.is_some() {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Redistributes a finite plan's remaining balance across its unpaid
    /// instances. Paid instances are never touched; the last unpaid one
    /// absorbs the rounding remainder so the amounts sum exactly to the
    /// plan total. Returns whether any amount changed.
    pub fn recalculate_unpaid_amounts(
        total_amount: f64,
        instances: &mut [PaymentInstance],
    ) -> bool {
        let paid_sum: f64 = instances
            .iter()
            .filter(|inst| inst.is_paid())
            .map(|inst| inst.amount)
            .sum();
        let unpaid: Vec<usize> = instances
            .iter()
            .enumerate()
            .filter(|(_, inst)| !inst.is_paid())
            .map(|(index, _)| index)
            .collect();
        if unpaid.is_empty() {
            return false;
        }
        let remaining = round2(total_amount - paid_sum);
        let count = unpaid.len();
        let share = round2(remaining / count as f64);
        let last_share = round2(remaining - share * (count as f64 - 1.0));

        let mut changed = false;
        for (position, index) in unpaid.iter().enumerate() {
            let amount = if position == count - 1 { last_share } else { share };
            if instances[*index].amount != amount {
                instances[*index].amount = amount;
                changed = true;
            }
        }
        changed
    }

    /// Deletes an instance under the owning plan's rules.
    ///
    /// Open-ended plans are forward-only: the target and every instance
    /// dated on or after it go together, earlier instances stay untouched.
    /// Finite plans drop the single instance, renumber the survivors and
    /// redistribute the unpaid balance. Returns the deleted instance ids.
    pub fn delete_instance(
        db: &mut Database,
        instance_id: u64,
        today: NaiveDate,
    ) -> CoreResult<Vec<u64>> {
        let instance = db
            .payment_instances
            .get_by_id(instance_id)
            .map_err(|_| CoreError::InstanceNotFound(instance_id))?;

        let Ok(payment) = db.payments.get_by_id(instance.payment_id) else {
            // Orphan: plain delete, nothing to reconcile.
            db.payment_instances.delete(instance_id)?;
            return Ok(vec![instance_id]);
        };

        let deleted = if payment.is_indefinite() {
            let targets: Vec<u64> = db
                .instances_of(instance.payment_id)
                .iter()
                .filter(|inst| inst.payment_date >= instance.payment_date)
                .filter_map(|inst| inst.id)
                .collect();
            for id in &targets {
                db.payment_instances.delete(*id)?;
            }
            tracing::info!(
                payment_id = instance.payment_id,
                from = %instance.payment_date,
                removed = targets.len(),
                "forward-only delete"
            );
            targets
        } else {
            db.payment_instances.delete(instance_id)?;
            Self::rebalance_finite(db, &payment, today)?;
            vec![instance_id]
        };

        Self::reconcile_plan(db, instance.payment_id, today)?;
        Ok(deleted)
    }

    /// Edits an instance under the owning plan's rules. On an open-ended
    /// plan, amount and comment changes apply to the target and every
    /// later-dated instance; on other plans only the target changes. A
    /// category change always patches the owning plan.
    pub fn edit_instance(
        db: &mut Database,
        instance_id: u64,
        patch: InstancePatch,
        today: NaiveDate,
    ) -> CoreResult<Vec<u64>> {
        let instance = db
            .payment_instances
            .get_by_id(instance_id)
            .map_err(|_| CoreError::InstanceNotFound(instance_id))?;
        if let Some(amount) = patch.amount {
            if amount <= 0.0 {
                return Err(CoreError::Validation("amount must be positive".into()));
            }
        }
        let payment = db.payments.get_by_id(instance.payment_id).ok();

        if let (Some(category_id), Some(payment)) = (patch.payment_category_id, &payment) {
            db.payment_categories
                .get_by_id(category_id)
                .map_err(|_| CoreError::CategoryNotFound(category_id))?;
            db.payments
                .update(payment.id.unwrap_or_default(), today, |stored| {
                    stored.payment_category_id = category_id
                })?;
        }

        let forward = payment.as_ref().is_some_and(Payment::is_indefinite);
        let targets: Vec<u64> = if forward {
            db.instances_of(instance.payment_id)
                .iter()
                .filter(|inst| inst.payment_date >= instance.payment_date)
                .filter_map(|inst| inst.id)
                .collect()
        } else {
            vec![instance_id]
        };

        for id in &targets {
            db.payment_instances.update(*id, today, |stored| {
                if let Some(amount) = patch.amount {
                    stored.amount = amount;
                }
                if let Some(comments) = &patch.comments {
                    stored.comments = comments.clone();
                }
            })?;
        }
        if forward {
            tracing::info!(
                payment_id = instance.payment_id,
                from = %instance.payment_date,
                touched = targets.len(),
                "forward-only edit"
            );
        }
        Ok(targets)
    }

    /// Appends one installment to a finite plan, one period after the
    /// latest instance, then renumbers and redistributes the unpaid
    /// balance over the grown set.
    pub fn add_installment(
        db: &mut Database,
        payment_id: u64,
        today: NaiveDate,
    ) -> CoreResult<PaymentInstance> {
        let payment = db
            .payments
            .get_by_id(payment_id)
            .map_err(|_| CoreError::PaymentNotFound(payment_id))?;
        if !payment.is_finite() {
            return Err(CoreError::Validation(
                "installments can only be added to finite plans".into(),
            ));
        }
        let spec = RecurrenceSpec::for_payment(&payment).ok_or_else(|| {
            CoreError::InvalidRecurrence("finite plan without a frequency".into())
        })?;

        let instances = db.instances_of(payment_id);
        let next_date = match instances.iter().map(|inst| inst.payment_date).max() {
            Some(latest) => spec.advance(latest),
            None => spec.anchor_date(),
        };
        let added = db.payment_instances.add(
            PaymentInstance {
                id: None,
                payment_id,
                amount: 0.0,
                payment_date: next_date,
                installment_number: instances.len() as u32 + 1,
                state: InstanceState::Pending,
                comments: payment.comments.clone(),
                audit: Default::default(),
            },
            today,
        )?;
        Self::rebalance_finite(db, &payment, today)?;
        Self::reconcile_plan(db, payment_id, today)?;
        db.payment_instances
            .get_by_id(added.id.unwrap_or_default())
            .map_err(CoreError::from)
    }

    /// Renumbers a finite plan's instances 1..N by date, redistributes the
    /// unpaid balance, and syncs the plan's installment count.
    fn rebalance_finite(
        db: &mut Database,
        payment: &Payment,
        today: NaiveDate,
    ) -> CoreResult<()> {
        let payment_id = payment.id.unwrap_or_default();
        let mut instances = db.instances_of(payment_id);
        instances.sort_by_key(|inst| (inst.payment_date, inst.installment_number));
        for (index, instance) in instances.iter_mut().enumerate() {
            instance.installment_number = index as u32 + 1;
        }
        Self::recalculate_unpaid_amounts(payment.total_amount, &mut instances);
        for instance in &instances {
            let id = instance.id.unwrap_or_default();
            let number = instance.installment_number;
            let amount = instance.amount;
            db.payment_instances.update(id, today, |stored| {
                stored.installment_number = number;
                stored.amount = amount;
            })?;
        }
        let count = instances.len() as u32;
        if count > 0 && payment.installments != Some(count) {
            db.payments.update(payment_id, today, |stored| {
                stored.installments = Some(count)
            })?;
        }
        Ok(())
    }
}
