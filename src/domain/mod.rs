//! Plain data records exchanged with the persistence layer and the UI.

pub mod category;
pub mod common;
pub mod instance;
pub mod payment;
pub mod savings;

pub use category::PaymentCategory;
pub use common::{Audit, MISSING_LABEL};
pub use instance::{InstanceState, PaymentInstance};
pub use payment::{Frequency, Payment, PaymentState, EXPENSE_TYPE_ID, INCOME_TYPE_ID};
pub use savings::{SavingsGoal, SavingsGoalKind, SavingsTransaction, SavingsTransactionKind};
