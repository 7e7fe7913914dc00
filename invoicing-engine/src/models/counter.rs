//! Sequence counter model for invoice numbering.

use serde::{Deserialize, Serialize};

/// Default invoice number prefix for new tenants.
pub const DEFAULT_PREFIX: &str = "INV";

/// Per-tenant invoice number counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceCounter {
    pub prefix: String,
    pub next_number: u64,
}

impl SequenceCounter {
    pub fn new(prefix: impl Into<String>, next_number: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next_number,
        }
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, 1)
    }
}

/// How an invoice number was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberSource {
    /// Drawn from the tenant's sequence counter.
    Sequential,
    /// Timestamp-derived; carries no ordering guarantee.
    Fallback,
}

impl NumberSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumberSource::Sequential => "sequential",
            NumberSource::Fallback => "fallback",
        }
    }
}

/// An invoice number handed out by the numbering service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedNumber {
    pub invoice_number: String,
    pub source: NumberSource,
}

impl AllocatedNumber {
    pub fn sequential(invoice_number: String) -> Self {
        Self {
            invoice_number,
            source: NumberSource::Sequential,
        }
    }

    pub fn fallback(invoice_number: String) -> Self {
        Self {
            invoice_number,
            source: NumberSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == NumberSource::Fallback
    }
}
