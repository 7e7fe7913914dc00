//! Invoicing Engine - invoice totals, per-tenant numbering and lifecycle.

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;

pub use engine::InvoiceEngine;
pub use error::EngineError;
