//! Failure taxonomy for the workflow engine
use crate::store::StoreError;

/// Every outcome an operation can fail with. All of these are returned as
/// values at the operation boundary; only `StoreFailure` is worth an
/// operator's attention, the rest are routine caller-facing results.
#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error("authentication required: no resolved actor")]
    AuthenticationRequired,
    #[error("not permitted: {0}")]
    AuthorizationDenied(String),
    #[error("validation failed: {}", .0.join("; "))]
    ValidationFailure(Vec<String>),
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("category policy violation: {0}")]
    PolicyViolation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("document busy: could not acquire the write gate in time")]
    ResourceBusy,
    #[error("store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

impl WorkflowError {
    /// Single-message convenience for validation failures raised outside the
    /// field-collection path (e.g. parsing a status name at the boundary).
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailure(vec![msg.into()])
    }
}
