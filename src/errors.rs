use thiserror::Error;

/// Failures raised by the record store and its JSON backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Record not found: {collection}/{id}")]
    Missing {
        collection: &'static str,
        id: u64,
    },
    #[error("Unknown index field: {0}")]
    UnknownField(String),
}

/// Error type that captures common service-level failures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),
    #[error("Payment not found: {0}")]
    PaymentNotFound(u64),
    #[error("Payment instance not found: {0}")]
    InstanceNotFound(u64),
    #[error("Category not found: {0}")]
    CategoryNotFound(u64),
    #[error("Savings goal not found: {0}")]
    GoalNotFound(u64),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
