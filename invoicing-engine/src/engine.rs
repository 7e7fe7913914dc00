//! Entry point tying validation, numbering and invoice construction together.

use crate::config::{EngineConfig, NumberingConfig};
use crate::error::EngineError;
use crate::models::{AllocatedNumber, CreateInvoice, Invoice};
use crate::services::calculator::validate_inputs;
use crate::services::metrics::{init_metrics, ERRORS_TOTAL, INVOICES_CREATED_TOTAL};
use crate::services::numbering::NumberingService;
use crate::services::postgres::PgCounterStore;
use crate::services::store::{CounterStore, InMemoryCounterStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

#[derive(Clone)]
pub struct InvoiceEngine {
    numbering: NumberingService,
}

impl InvoiceEngine {
    pub fn new(store: Arc<dyn CounterStore>, numbering: NumberingConfig) -> Self {
        init_metrics();
        Self {
            numbering: NumberingService::new(store, numbering),
        }
    }

    /// Engine over a process-local counter store.
    pub fn in_memory(numbering: NumberingConfig) -> Self {
        Self::new(Arc::new(InMemoryCounterStore::new()), numbering)
    }

    /// Build the engine from configuration, using PostgreSQL when a
    /// database is configured.
    pub async fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        let store: Arc<dyn CounterStore> = match &config.database {
            Some(db) => {
                let store = PgCounterStore::connect(db).await?;
                store.run_migrations().await?;
                Arc::new(store)
            }
            None => {
                info!("No database configured, using in-memory counter store");
                Arc::new(InMemoryCounterStore::new())
            }
        };

        Ok(Self::new(store, config.numbering))
    }

    pub fn numbering(&self) -> &NumberingService {
        &self.numbering
    }

    /// Validate invoice input without allocating a number.
    pub fn validate_create_invoice(&self, input: &CreateInvoice) -> Result<(), EngineError> {
        input.validate()?;
        input.from.validate()?;
        input.to.validate()?;
        validate_inputs(&input.items, input.tax_rate, &input.discount)
    }

    /// Create a new draft invoice.
    ///
    /// The number is allocated only after validation succeeds. Allocation
    /// itself never fails; a store outage yields a fallback number.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id))]
    pub async fn create_invoice(&self, input: CreateInvoice) -> Result<Invoice, EngineError> {
        if let Err(e) = self.validate_create_invoice(&input) {
            ERRORS_TOTAL.with_label_values(&[e.kind()]).inc();
            return Err(e);
        }

        if input.due_date < input.date {
            warn!(
                date = %input.date,
                due_date = %input.due_date,
                "Invoice due date is before the invoice date"
            );
        }

        let number: AllocatedNumber = self.numbering.allocate(input.tenant_id).await;
        let invoice = Invoice::new(input, number, Utc::now());

        INVOICES_CREATED_TOTAL
            .with_label_values(&[invoice.number_source.as_str()])
            .inc();

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            number_source = invoice.number_source.as_str(),
            total = %invoice.total,
            "Invoice created"
        );

        Ok(invoice)
    }
}
