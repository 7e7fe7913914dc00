//! Domain models for invoicing-engine.

mod counter;
mod invoice;
mod line_item;
mod status;

pub use counter::{AllocatedNumber, NumberSource, SequenceCounter, DEFAULT_PREFIX};
pub use invoice::{CreateInvoice, Invoice, PartySnapshot};
pub use line_item::{DiscountPolicy, DiscountType, LineItem};
pub use status::{InvoiceStatus, LifecycleAction, PaymentStatus};
