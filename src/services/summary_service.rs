//! Read-side aggregation: balance totals, the filtered instance table,
//! per-category breakdowns, and the plan overview rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{
    InstanceState, Payment, PaymentInstance, EXPENSE_TYPE_ID, INCOME_TYPE_ID, MISSING_LABEL,
};
use crate::schedule::{period_range, round2, PeriodMode};
use crate::services::category_service::CategoryService;
use crate::storage::Database;
use crate::time::Clock;

/// Income and expense sums over a set of instances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub income: f64,
    pub expense: f64,
}

impl Totals {
    pub fn balance(&self) -> f64 {
        round2(self.income - self.expense)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Filter over the instance table. Unset fields do not constrain.
#[derive(Debug, Clone, Default)]
pub struct InstanceFilter {
    pub user_id: Option<u64>,
    pub range: Option<(NaiveDate, NaiveDate)>,
    pub payment_type_id: Option<u32>,
    pub category_id: Option<u64>,
    pub state: Option<InstanceState>,
    pub search: Option<String>,
    pub direction: SortDirection,
}

/// One row of the instance table, enriched with plan-derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRow {
    pub instance: PaymentInstance,
    pub payment_type_id: u32,
    pub description: String,
    pub category_name: String,
    pub installment_info: String,
}

/// One row of the plan overview for finite recurring plans.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRow {
    pub payment: Payment,
    pub category_name: String,
    pub paid_installments: u32,
    pub total_installments: u32,
}

/// Per-root-category income and expense over a window.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category_id: u64,
    pub category_name: String,
    pub totals: Totals,
}

pub struct SummaryService;

impl SummaryService {
    /// Sums instance amounts into income and expense by the owning plan's
    /// type. Instances whose plan is missing are skipped.
    pub fn compute_totals(instances: &[PaymentInstance], payments: &[Payment]) -> Totals {
        let mut totals = Totals::default();
        for instance in instances {
            let Some(payment) = payments
                .iter()
                .find(|payment| payment.id == Some(instance.payment_id))
            else {
                continue;
            };
            match payment.payment_type_id {
                INCOME_TYPE_ID => totals.income += instance.amount,
                EXPENSE_TYPE_ID => totals.expense += instance.amount,
                _ => {}
            }
        }
        totals.income = round2(totals.income);
        totals.expense = round2(totals.expense);
        totals
    }

    /// Totals over the period containing the clock's current date, the
    /// shape the dashboard header asks for.
    pub fn totals_for_current_period(
        db: &Database,
        user_id: u64,
        clock: &dyn Clock,
        mode: PeriodMode,
    ) -> Totals {
        Self::totals_for_range(db, user_id, period_range(clock.today(), mode))
    }

    /// Totals over a date window for one user.
    pub fn totals_for_range(
        db: &Database,
        user_id: u64,
        range: (NaiveDate, NaiveDate),
    ) -> Totals {
        let payments = db.payments_of(user_id);
        let instances: Vec<PaymentInstance> = db
            .payment_instances
            .iter()
            .filter(|inst| inst.payment_date >= range.0 && inst.payment_date <= range.1)
            .filter(|inst| {
                payments
                    .iter()
                    .any(|payment| payment.id == Some(inst.payment_id))
            })
            .cloned()
            .collect();
        Self::compute_totals(&instances, &payments)
    }

    /// The filtered, sorted instance table. Category filtering matches the
    /// plan's category or any of its subcategories; the search term matches
    /// the plan description case-insensitively.
    pub fn instance_rows(db: &Database, filter: &InstanceFilter) -> Vec<InstanceRow> {
        let categories = db.payment_categories.get_all();
        let mut rows: Vec<InstanceRow> = db
            .payment_instances
            .iter()
            .filter_map(|instance| {
                let payment = db
                    .payments
                    .iter()
                    .find(|payment| payment.id == Some(instance.payment_id))?;

                if filter.user_id.is_some_and(|user| payment.user_id != user) {
                    return None;
                }
                if let Some((from, to)) = filter.range {
                    if instance.payment_date < from || instance.payment_date > to {
                        return None;
                    }
                }
                if filter
                    .payment_type_id
                    .is_some_and(|type_id| payment.payment_type_id != type_id)
                {
                    return None;
                }
                if let Some(category_id) = filter.category_id {
                    let root = CategoryService::parent_category_id(
                        &categories,
                        payment.payment_category_id,
                    );
                    if payment.payment_category_id != category_id && root != category_id {
                        return None;
                    }
                }
                if filter.state.is_some_and(|state| instance.state != state) {
                    return None;
                }
                if let Some(search) = &filter.search {
                    let needle = search.trim().to_lowercase();
                    if !needle.is_empty()
                        && !payment.comments.to_lowercase().contains(&needle)
                    {
                        return None;
                    }
                }

                Some(InstanceRow {
                    payment_type_id: payment.payment_type_id,
                    description: payment.comments.clone(),
                    category_name: CategoryService::display_name(
                        &categories,
                        Some(payment.payment_category_id),
                    ),
                    installment_info: installment_info(payment, instance),
                    instance: instance.clone(),
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            let ordering = a
                .instance
                .payment_date
                .cmp(&b.instance.payment_date)
                .then(a.instance.id.cmp(&b.instance.id));
            match filter.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        rows
    }

    /// Income and expense per root category over a window. Subcategory
    /// amounts roll up into their parent.
    pub fn category_totals(
        db: &Database,
        user_id: u64,
        range: (NaiveDate, NaiveDate),
    ) -> Vec<CategoryTotal> {
        let categories = db.payment_categories.get_all();
        let rows = Self::instance_rows(
            db,
            &InstanceFilter {
                user_id: Some(user_id),
                range: Some(range),
                ..Default::default()
            },
        );

        let mut totals: Vec<CategoryTotal> = Vec::new();
        for row in rows {
            let Some(payment) = db
                .payments
                .iter()
                .find(|payment| payment.id == Some(row.instance.payment_id))
            else {
                continue;
            };
            let root_id =
                CategoryService::parent_category_id(&categories, payment.payment_category_id);
            let position = match totals.iter().position(|entry| entry.category_id == root_id) {
                Some(position) => position,
                None => {
                    totals.push(CategoryTotal {
                        category_id: root_id,
                        category_name: CategoryService::display_name(
                            &categories,
                            Some(root_id),
                        ),
                        totals: Totals::default(),
                    });
                    totals.len() - 1
                }
            };
            let entry = &mut totals[position];
            match row.payment_type_id {
                INCOME_TYPE_ID => entry.totals.income += row.instance.amount,
                EXPENSE_TYPE_ID => entry.totals.expense += row.instance.amount,
                _ => {}
            }
        }
        for entry in &mut totals {
            entry.totals.income = round2(entry.totals.income);
            entry.totals.expense = round2(entry.totals.expense);
        }
        totals.sort_by(|a, b| a.category_name.cmp(&b.category_name));
        totals
    }

    /// Overview rows for a user's finite recurring plans with paid/total
    /// installment counts.
    pub fn plan_rows(db: &Database, user_id: u64) -> Vec<PlanRow> {
        let categories = db.payment_categories.get_all();
        db.payments_of(user_id)
            .into_iter()
            .filter(Payment::is_finite)
            .map(|payment| {
                let instances = db.instances_of(payment.id.unwrap_or_default());
                PlanRow {
                    category_name: CategoryService::display_name(
                        &categories,
                        Some(payment.payment_category_id),
                    ),
                    paid_installments: instances
                        .iter()
                        .filter(|inst| inst.is_paid())
                        .count() as u32,
                    total_installments: instances.len() as u32,
                    payment,
                }
            })
            .collect()
    }
}

/// Position label of an instance within its plan: `3/12` for finite plans,
/// `5/∞` for open-ended ones, a sentinel for one-offs.
fn installment_info(payment: &Payment, instance: &PaymentInstance) -> String {
    if payment.is_indefinite() {
        format!("{}/∞", instance.installment_number)
    } else if payment.installments.is_some_and(|count| count > 1) {
        format!(
            "{}/{}",
            instance.installment_number,
            payment.installments.unwrap_or_default()
        )
    } else {
        MISSING_LABEL.to_string()
    }
}
