#![doc(test(attr(deny(warnings))))]

//! Payplan Core offers the payment-plan, installment-scheduling, and
//! reconciliation primitives that power personal budgeting frontends.

pub mod domain;
pub mod errors;
pub mod schedule;
pub mod services;
pub mod storage;
pub mod time;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Payplan Core tracing initialized.");
    });
}
