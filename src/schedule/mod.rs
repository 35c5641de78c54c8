//! Pure calendar arithmetic and the recurrence/installment engine.
//!
//! Everything in this module is deterministic from its inputs. "Today" is
//! always a parameter, never read from the environment.

pub mod calendar;
pub mod installments;

pub use calendar::{period_label, period_range, step_period, PeriodMode};
pub use installments::{
    installment_amount, round2, RecurrenceSpec, INDEFINITE_CAP_PERIODS,
};
