//! invoicing-core: Shared infrastructure for the invoicing engine.
pub mod config;
pub mod error;
pub mod observability;
pub mod retry;

pub use serde;
pub use tracing;
pub use validator;
