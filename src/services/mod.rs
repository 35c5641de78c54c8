//! Business flows built on top of the record store: plan creation and
//! editing, instance reconciliation, category resolution, summaries, and
//! savings. No terminal I/O, no rendering.

pub mod category_service;
pub mod instance_service;
pub mod payment_service;
pub mod savings_service;
pub mod summary_service;

pub use category_service::{CategoryGroup, CategoryService};
pub use instance_service::{InstancePatch, InstanceService};
pub use payment_service::{PaymentDraft, PaymentService, PlanDetail};
pub use savings_service::{GoalDraft, SavingsService};
pub use summary_service::{
    CategoryTotal, InstanceFilter, InstanceRow, PlanRow, SortDirection, SummaryService, Totals,
};

use crate::errors::CoreError;

pub type CoreResult<T> = Result<T, CoreError>;
