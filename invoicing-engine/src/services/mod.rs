//! Services for invoicing-engine.

pub mod calculator;
pub mod lifecycle;
pub mod metrics;
pub mod numbering;
pub mod postgres;
pub mod store;

pub use calculator::{compute_totals, validate_inputs, InvoiceTotals};
pub use lifecycle::{
    cancel_invoice, effective_payment_status, effective_status, mark_paid, mark_viewed,
    record_payment, send_invoice, validate_payment_transition, validate_transition,
};
pub use numbering::{allocate_next_invoice_number, fallback_invoice_number, NumberingService};
pub use postgres::PgCounterStore;
pub use store::{CounterStore, InMemoryCounterStore};
