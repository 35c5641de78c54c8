use chrono::NaiveDate;

use payplan_core::domain::{Frequency, EXPENSE_TYPE_ID};
use payplan_core::services::{CategoryService, PaymentDraft, PaymentService};
use payplan_core::storage::Database;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// An empty database with one root category, returned with the category id.
pub fn database_with_category() -> (Database, u64) {
    let mut db = Database::default();
    let category = CategoryService::create(&mut db, "Home", None, date(2024, 1, 1))
        .expect("create category");
    (db, category.id.expect("category id"))
}

pub fn monthly_draft(
    category_id: u64,
    total_amount: f64,
    installments: Option<u32>,
) -> PaymentDraft {
    PaymentDraft {
        user_id: 1,
        total_amount,
        payment_type_id: EXPENSE_TYPE_ID,
        payment_category_id: category_id,
        start_date: date(2024, 1, 15),
        frequency: Some(Frequency::Monthly),
        payment_day: Some(15),
        installments,
        comments: "Rent".into(),
    }
}

/// Creates a monthly plan and returns its id.
pub fn seed_monthly_plan(
    db: &mut Database,
    category_id: u64,
    total_amount: f64,
    installments: Option<u32>,
    today: NaiveDate,
) -> u64 {
    let (payment, _) = PaymentService::create_plan(
        db,
        monthly_draft(category_id, total_amount, installments),
        today,
    )
    .expect("create plan");
    payment.id.expect("payment id")
}
