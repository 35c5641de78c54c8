//! Plan lifecycle: creation (with instance expansion), patching, state
//! fan-out, back-fill, and cascading deletion.

use chrono::NaiveDate;

use crate::domain::{
    Frequency, Payment, PaymentInstance, PaymentState, InstanceState,
};
use crate::errors::CoreError;
use crate::schedule::{installment_amount, RecurrenceSpec};
use crate::services::category_service::CategoryService;
use crate::services::instance_service::InstanceService;
use crate::storage::Database;

use super::CoreResult;

/// User-supplied fields of a new plan. Store-owned fields (id, audit) and
/// the derived state are filled in on creation.
#[derive(Debug, Clone)]
pub struct PaymentDraft {
    pub user_id: u64,
    pub total_amount: f64,
    pub payment_type_id: u32,
    pub payment_category_id: u64,
    pub start_date: NaiveDate,
    pub frequency: Option<Frequency>,
    pub payment_day: Option<u32>,
    pub installments: Option<u32>,
    pub comments: String,
}

impl PaymentDraft {
    fn into_payment(self) -> Payment {
        Payment {
            id: None,
            user_id: self.user_id,
            total_amount: self.total_amount,
            payment_type_id: self.payment_type_id,
            payment_category_id: self.payment_category_id,
            start_date: self.start_date,
            frequency: self.frequency,
            payment_day: self.payment_day,
            installments: self.installments,
            state: PaymentState::Active,
            comments: self.comments,
            audit: Default::default(),
        }
    }
}

/// A plan together with its instances and resolved category name.
#[derive(Debug, Clone)]
pub struct PlanDetail {
    pub payment: Payment,
    pub category_name: String,
    pub instances: Vec<PaymentInstance>,
}

pub struct PaymentService;

impl PaymentService {
    /// Creates a plan and expands it into instances in one logical unit.
    /// The recurrence is validated before anything is persisted, so a bad
    /// cadence never leaves a plan without its instances.
    pub fn create_plan(
        db: &mut Database,
        draft: PaymentDraft,
        today: NaiveDate,
    ) -> CoreResult<(Payment, Vec<PaymentInstance>)> {
        if draft.total_amount <= 0.0 {
            return Err(CoreError::Validation(
                "total amount must be positive".into(),
            ));
        }
        db.payment_categories
            .get_by_id(draft.payment_category_id)
            .map_err(|_| CoreError::CategoryNotFound(draft.payment_category_id))?;

        let payment = draft.into_payment();
        if let Some(spec) = RecurrenceSpec::for_payment(&payment) {
            spec.validate()?;
        }

        let payment = db.payments.add(payment, today)?;
        let payment_id = payment.id.unwrap_or_default();

        // Instances are added one by one so each gets its own id.
        let mut stored = Vec::new();
        for instance in Self::build_instances(&payment, today)? {
            stored.push(db.payment_instances.add(instance, today)?);
        }
        tracing::info!(
            payment_id,
            instances = stored.len(),
            "plan created and expanded"
        );
        Ok((payment, stored))
    }

    /// Pure expansion of a plan into unstored instances.
    ///
    /// One-off plans yield a single instance carrying the full amount.
    /// Finite plans yield exactly N instances with the even per-installment
    /// share. Open-ended plans yield a capped window of instances, each
    /// carrying the full per-period amount. Every instance lands Paid when
    /// its date is not after `today`, Pending otherwise.
    pub fn build_instances(
        payment: &Payment,
        today: NaiveDate,
    ) -> CoreResult<Vec<PaymentInstance>> {
        let payment_id = payment.id.unwrap_or_default();
        let Some(spec) = RecurrenceSpec::for_payment(payment) else {
            return Ok(vec![new_instance(
                payment_id,
                payment.total_amount,
                payment.start_date,
                1,
                today,
                &payment.comments,
            )]);
        };

        let (dates, amount) = if let Some(count) = payment.installments {
            (
                spec.generate_finite_dates()?,
                installment_amount(payment.total_amount, count),
            )
        } else {
            (spec.generate_capped_dates()?, payment.total_amount)
        };

        Ok(dates
            .into_iter()
            .enumerate()
            .map(|(index, date)| {
                new_instance(
                    payment_id,
                    amount,
                    date,
                    index as u32 + 1,
                    today,
                    &payment.comments,
                )
            })
            .collect())
    }

    /// Appends the instances an open-ended plan is missing between its
    /// latest materialized date and today. Numbering continues from the
    /// existing tail; already materialized instances are left untouched.
    pub fn backfill_due_instances(
        db: &mut Database,
        payment_id: u64,
        today: NaiveDate,
    ) -> CoreResult<Vec<PaymentInstance>> {
        let payment = db
            .payments
            .get_by_id(payment_id)
            .map_err(|_| CoreError::PaymentNotFound(payment_id))?;
        if !payment.is_indefinite() {
            return Ok(Vec::new());
        }
        let spec = RecurrenceSpec::for_payment(&payment).ok_or_else(|| {
            CoreError::InvalidRecurrence("open-ended plan without a frequency".into())
        })?;

        let existing = db.instances_of(payment_id);
        let latest_date = existing.iter().map(|inst| inst.payment_date).max();
        let mut next_number = existing
            .iter()
            .map(|inst| inst.installment_number)
            .max()
            .unwrap_or(0);

        let mut added = Vec::new();
        for date in spec.generate_dates_until(today)? {
            if latest_date.is_some_and(|latest| date <= latest) {
                continue;
            }
            next_number += 1;
            let instance = new_instance(
                payment_id,
                payment.total_amount,
                date,
                next_number,
                today,
                &payment.comments,
            );
            added.push(db.payment_instances.add(instance, today)?);
        }
        if !added.is_empty() {
            tracing::info!(payment_id, added = added.len(), "back-filled due instances");
        }
        Ok(added)
    }

    /// Moves the plan to another category. Instances are not touched; they
    /// inherit the category through the plan.
    pub fn set_category(
        db: &mut Database,
        payment_id: u64,
        category_id: u64,
        today: NaiveDate,
    ) -> CoreResult<Payment> {
        db.payments
            .get_by_id(payment_id)
            .map_err(|_| CoreError::PaymentNotFound(payment_id))?;
        db.payment_categories
            .get_by_id(category_id)
            .map_err(|_| CoreError::CategoryNotFound(category_id))?;
        Ok(db
            .payments
            .update(payment_id, today, |payment| {
                payment.payment_category_id = category_id
            })?)
    }

    /// Changes the plan total and, for finite plans, redistributes the new
    /// remainder across the unpaid instances so the amounts still sum to
    /// the total.
    pub fn set_total_amount(
        db: &mut Database,
        payment_id: u64,
        total_amount: f64,
        today: NaiveDate,
    ) -> CoreResult<Payment> {
        if total_amount <= 0.0 {
            return Err(CoreError::Validation(
                "total amount must be positive".into(),
            ));
        }
        let payment = db
            .payments
            .get_by_id(payment_id)
            .map_err(|_| CoreError::PaymentNotFound(payment_id))?;
        let updated = db.payments.update(payment_id, today, |payment| {
            payment.total_amount = total_amount
        })?;
        if payment.is_finite() {
            let mut instances = db.instances_of(payment_id);
            if InstanceService::recalculate_unpaid_amounts(total_amount, &mut instances) {
                for instance in &instances {
                    let id = instance.id.unwrap_or_default();
                    let amount = instance.amount;
                    db.payment_instances
                        .update(id, today, |stored| stored.amount = amount)?;
                }
            }
        }
        Ok(updated)
    }

    /// Applies a plan state change and fans it out to the instances:
    /// activating re-derives each instance from the calendar, cancelling
    /// cancels every instance, completing marks every instance paid.
    /// Pausing leaves the instances as they are. The plan record is
    /// updated last, after the fan-out succeeded.
    pub fn apply_plan_state(
        db: &mut Database,
        payment_id: u64,
        target: PaymentState,
        today: NaiveDate,
    ) -> CoreResult<Payment> {
        db.payments
            .get_by_id(payment_id)
            .map_err(|_| CoreError::PaymentNotFound(payment_id))?;

        for instance in db.instances_of(payment_id) {
            let next = match target {
                PaymentState::Active => {
                    PaymentInstance::state_for_date(instance.payment_date, today)
                }
                PaymentState::Cancelled => InstanceState::Cancelled,
                PaymentState::Completed => InstanceState::Paid,
                PaymentState::Paused => continue,
            };
            if instance.state != next {
                let id = instance.id.unwrap_or_default();
                db.payment_instances
                    .update(id, today, |stored| stored.state = next)?;
            }
        }
        let updated = db
            .payments
            .update(payment_id, today, |payment| payment.state = target)?;
        tracing::info!(payment_id, state = %target, "plan state applied");
        Ok(updated)
    }

    /// Deletes a plan and all of its instances. Instances go first so a
    /// failure never strands orphans behind a missing plan.
    pub fn delete_plan(db: &mut Database, payment_id: u64) -> CoreResult<usize> {
        db.payments
            .get_by_id(payment_id)
            .map_err(|_| CoreError::PaymentNotFound(payment_id))?;
        let instances = db.instances_of(payment_id);
        let removed = instances.len();
        for instance in instances {
            db.payment_instances.delete(instance.id.unwrap_or_default())?;
        }
        db.payments.delete(payment_id)?;
        tracing::info!(payment_id, instances = removed, "plan deleted");
        Ok(removed)
    }

    /// Read view of one plan with its instances and resolved category name.
    pub fn plan_detail(db: &Database, payment_id: u64) -> CoreResult<PlanDetail> {
        let payment = db
            .payments
            .get_by_id(payment_id)
            .map_err(|_| CoreError::PaymentNotFound(payment_id))?;
        let categories = db.payment_categories.get_all();
        Ok(PlanDetail {
            category_name: CategoryService::display_name(
                &categories,
                Some(payment.payment_category_id),
            ),
            instances: db.instances_of(payment_id),
            payment,
        })
    }
}

fn new_instance(
    payment_id: u64,
    amount: f64,
    payment_date: NaiveDate,
    installment_number: u32,
    today: NaiveDate,
    comments: &str,
) -> PaymentInstance {
    PaymentInstance {
        id: None,
        payment_id,
        amount,
        payment_date,
        installment_number,
        state: PaymentInstance::state_for_date(payment_date, today),
        comments: comments.to_string(),
        audit: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EXPENSE_TYPE_ID;
    use crate::schedule::INDEFINITE_CAP_PERIODS;
    use crate::services::category_service::CategoryService;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn db_with_category() -> (Database, u64) {
        let mut db = Database::default();
        let category =
            CategoryService::create(&mut db, "Home", None, date(2024, 1, 1)).unwrap();
        (db, category.id.unwrap())
    }

    fn draft(category_id: u64) -> PaymentDraft {
        PaymentDraft {
            user_id: 1,
            total_amount: 1200.0,
            payment_type_id: EXPENSE_TYPE_ID,
            payment_category_id: category_id,
            start_date: date(2024, 1, 15),
            frequency: Some(Frequency::Monthly),
            payment_day: Some(15),
            installments: Some(12),
            comments: String::new(),
        }
    }

    #[test]
    fn finite_plan_expands_to_exactly_n_instances() {
        let (mut db, category) = db_with_category();
        let (payment, instances) =
            PaymentService::create_plan(&mut db, draft(category), date(2024, 3, 1)).unwrap();
        assert_eq!(instances.len(), 12);
        assert!(instances.iter().all(|inst| inst.amount == 100.0));
        assert_eq!(instances[0].payment_date, date(2024, 1, 15));
        assert_eq!(instances[0].installment_number, 1);
        assert_eq!(instances[11].installment_number, 12);
        // Dates at or before today land paid, the rest pending.
        assert!(instances[..2].iter().all(|inst| inst.state == InstanceState::Paid));
        assert!(instances[2..].iter().all(|inst| inst.state == InstanceState::Pending));
        assert_eq!(payment.state, PaymentState::Active);
    }

    #[test]
    fn one_off_plan_expands_to_a_single_full_amount_instance() {
        let (mut db, category) = db_with_category();
        let one_off = PaymentDraft {
            frequency: None,
            payment_day: None,
            installments: None,
            ..draft(category)
        };
        let (_, instances) =
            PaymentService::create_plan(&mut db, one_off, date(2024, 1, 1)).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].amount, 1200.0);
        assert_eq!(instances[0].installment_number, 1);
    }

    #[test]
    fn open_ended_plan_expands_to_the_capped_window() {
        let (mut db, category) = db_with_category();
        let open_ended = PaymentDraft {
            installments: None,
            total_amount: 50.0,
            ..draft(category)
        };
        let (_, instances) =
            PaymentService::create_plan(&mut db, open_ended, date(2024, 1, 1)).unwrap();
        assert_eq!(instances.len(), INDEFINITE_CAP_PERIODS as usize);
        assert!(instances.iter().all(|inst| inst.amount == 50.0));
    }

    #[test]
    fn invalid_recurrence_persists_nothing() {
        let (mut db, category) = db_with_category();
        let bad = PaymentDraft {
            payment_day: None,
            ..draft(category)
        };
        let err = PaymentService::create_plan(&mut db, bad, date(2024, 1, 1));
        assert!(matches!(err, Err(CoreError::InvalidRecurrence(_))));
        assert!(db.payments.is_empty());
        assert!(db.payment_instances.is_empty());
    }

    #[test]
    fn missing_category_is_rejected() {
        let mut db = Database::default();
        let err = PaymentService::create_plan(&mut db, draft(42), date(2024, 1, 1));
        assert!(matches!(err, Err(CoreError::CategoryNotFound(42))));
    }

    #[test]
    fn backfill_appends_only_past_the_existing_tail() {
        let (mut db, category) = db_with_category();
        let open_ended = PaymentDraft {
            installments: None,
            frequency: Some(Frequency::Weekly),
            payment_day: Some(1),
            start_date: date(2024, 1, 1),
            ..draft(category)
        };
        let (payment, instances) =
            PaymentService::create_plan(&mut db, open_ended, date(2024, 1, 1)).unwrap();
        let payment_id = payment.id.unwrap();
        let last_number = instances.last().unwrap().installment_number;
        let last_date = instances.last().unwrap().payment_date;

        // Horizon still inside the pre-materialized window: nothing to add.
        let added =
            PaymentService::backfill_due_instances(&mut db, payment_id, date(2024, 6, 1))
                .unwrap();
        assert!(added.is_empty());

        let beyond = last_date + chrono::Duration::days(14);
        let added =
            PaymentService::backfill_due_instances(&mut db, payment_id, beyond).unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(added[0].installment_number, last_number + 1);
        assert!(added.iter().all(|inst| inst.state == InstanceState::Paid));
    }

    #[test]
    fn state_fan_out_covers_instances_and_plan() {
        let (mut db, category) = db_with_category();
        let (payment, _) =
            PaymentService::create_plan(&mut db, draft(category), date(2024, 3, 1)).unwrap();
        let payment_id = payment.id.unwrap();

        let cancelled = PaymentService::apply_plan_state(
            &mut db,
            payment_id,
            PaymentState::Cancelled,
            date(2024, 3, 1),
        )
        .unwrap();
        assert_eq!(cancelled.state, PaymentState::Cancelled);
        assert!(db
            .instances_of(payment_id)
            .iter()
            .all(|inst| inst.state == InstanceState::Cancelled));

        let reactivated = PaymentService::apply_plan_state(
            &mut db,
            payment_id,
            PaymentState::Active,
            date(2024, 3, 1),
        )
        .unwrap();
        assert_eq!(reactivated.state, PaymentState::Active);
        let instances = db.instances_of(payment_id);
        assert!(instances[..2].iter().all(|inst| inst.state == InstanceState::Paid));
        assert!(instances[2..].iter().all(|inst| inst.state == InstanceState::Pending));

        PaymentService::apply_plan_state(
            &mut db,
            payment_id,
            PaymentState::Completed,
            date(2024, 3, 1),
        )
        .unwrap();
        assert!(db
            .instances_of(payment_id)
            .iter()
            .all(|inst| inst.state == InstanceState::Paid));
    }

    #[test]
    fn pausing_leaves_instances_untouched() {
        let (mut db, category) = db_with_category();
        let (payment, instances) =
            PaymentService::create_plan(&mut db, draft(category), date(2024, 3, 1)).unwrap();
        let payment_id = payment.id.unwrap();
        let paused = PaymentService::apply_plan_state(
            &mut db,
            payment_id,
            PaymentState::Paused,
            date(2024, 3, 1),
        )
        .unwrap();
        assert_eq!(paused.state, PaymentState::Paused);
        assert_eq!(db.instances_of(payment_id), instances);
    }

    #[test]
    fn delete_plan_leaves_no_orphan_instances() {
        let (mut db, category) = db_with_category();
        let (payment, _) =
            PaymentService::create_plan(&mut db, draft(category), date(2024, 3, 1)).unwrap();
        let removed =
            PaymentService::delete_plan(&mut db, payment.id.unwrap()).unwrap();
        assert_eq!(removed, 12);
        assert!(db.payments.is_empty());
        assert!(db.payment_instances.is_empty());
    }

    #[test]
    fn set_total_amount_redistributes_unpaid_share() {
        let (mut db, category) = db_with_category();
        let (payment, _) =
            PaymentService::create_plan(&mut db, draft(category), date(2024, 3, 1)).unwrap();
        let payment_id = payment.id.unwrap();
        PaymentService::set_total_amount(&mut db, payment_id, 1000.0, date(2024, 3, 1))
            .unwrap();
        let instances = db.instances_of(payment_id);
        let paid: f64 = instances
            .iter()
            .filter(|inst| inst.is_paid())
            .map(|inst| inst.amount)
            .sum();
        let total: f64 = instances.iter().map(|inst| inst.amount).sum();
        // Paid instances keep their old amounts; unpaid absorb the change.
        assert_eq!(paid, 200.0);
        assert!((total - 1000.0).abs() < 1e-9);
    }
}
