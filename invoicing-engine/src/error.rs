//! Error taxonomy for invoicing-engine.

use crate::models::{InvoiceStatus, LifecycleAction};
use invoicing_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invoice counter unavailable: {0}")]
    CounterUnavailable(String),

    #[error("Cannot {action} an invoice in status '{from}'")]
    InvalidTransition {
        from: InvoiceStatus,
        action: LifecycleAction,
    },

    #[error("Concurrent invoice number allocation for tenant {tenant_id}")]
    ConcurrentAllocationConflict { tenant_id: Uuid },

    #[error(transparent)]
    Infrastructure(#[from] AppError),
}

impl EngineError {
    /// Short machine-readable label, used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::CounterUnavailable(_) => "counter_unavailable",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::ConcurrentAllocationConflict { .. } => "allocation_conflict",
            EngineError::Infrastructure(e) => e.kind(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::ConcurrentAllocationConflict { .. })
    }
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(err: validator::ValidationErrors) -> Self {
        EngineError::InvalidInput(err.to_string())
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidInput(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            EngineError::CounterUnavailable(_) => AppError::ServiceUnavailable,
            e @ EngineError::InvalidTransition { .. } => {
                AppError::Conflict(anyhow::anyhow!(e.to_string()))
            }
            e @ EngineError::ConcurrentAllocationConflict { .. } => {
                AppError::Conflict(anyhow::anyhow!(e.to_string()))
            }
            EngineError::Infrastructure(e) => e,
        }
    }
}
