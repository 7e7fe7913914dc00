//! Per-tenant sequential invoice numbering.
//!
//! [`allocate_next_invoice_number`] is the pure step: it formats the number
//! and returns the incremented counter without touching storage.
//! [`NumberingService`] drives a [`CounterStore`] with compare-and-swap
//! semantics, bounds each allocation with a timeout and degrades to a
//! timestamp-derived number when the store cannot serve it.

use crate::config::NumberingConfig;
use crate::error::EngineError;
use crate::models::{AllocatedNumber, SequenceCounter};
use crate::services::metrics::{ALLOCATIONS_TOTAL, ERRORS_TOTAL, STORE_CALL_DURATION};
use crate::services::store::CounterStore;
use chrono::{DateTime, Utc};
use invoicing_core::retry::{retry_async, RetryConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Default width of the zero-padded sequence part (`INV-001`).
pub const DEFAULT_PAD_WIDTH: usize = 3;

/// Modulus keeping the last six digits of the millisecond timestamp.
const FALLBACK_MODULUS: i64 = 1_000_000;

/// Result of the pure allocation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub invoice_number: String,
    pub updated_counter: SequenceCounter,
}

/// Format `{prefix}-{number}` with the number zero-padded to `pad_width`.
pub fn format_invoice_number(prefix: &str, number: u64, pad_width: usize) -> String {
    format!("{}-{:0>width$}", prefix, number, width = pad_width)
}

/// Allocate the counter's next number using the default padding.
pub fn allocate_next_invoice_number(counter: &SequenceCounter) -> Result<Allocation, EngineError> {
    allocate_with_padding(counter, DEFAULT_PAD_WIDTH)
}

/// Allocate the counter's next number, returning the incremented counter.
pub fn allocate_with_padding(
    counter: &SequenceCounter,
    pad_width: usize,
) -> Result<Allocation, EngineError> {
    if counter.next_number == 0 {
        return Err(EngineError::InvalidInput(
            "Sequence counter must start at 1".to_string(),
        ));
    }

    let next_number = counter.next_number.checked_add(1).ok_or_else(|| {
        EngineError::InvalidInput("Sequence counter is exhausted".to_string())
    })?;

    Ok(Allocation {
        invoice_number: format_invoice_number(&counter.prefix, counter.next_number, pad_width),
        updated_counter: SequenceCounter {
            prefix: counter.prefix.clone(),
            next_number,
        },
    })
}

/// The number the counter would hand out next, without consuming it.
pub fn peek_invoice_number(counter: &SequenceCounter, pad_width: usize) -> String {
    format_invoice_number(&counter.prefix, counter.next_number, pad_width)
}

/// Timestamp-derived number: the last six digits of Unix time in milliseconds.
pub fn fallback_invoice_number(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix = now.timestamp_millis().rem_euclid(FALLBACK_MODULUS);
    format!("{}-{:06}", prefix, suffix)
}

async fn timed<T, F>(operation: &str, call: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    let timer = STORE_CALL_DURATION
        .with_label_values(&[operation])
        .start_timer();
    let result = call.await;
    timer.observe_duration();
    result
}

/// Store-backed invoice number allocator.
#[derive(Clone)]
pub struct NumberingService {
    store: Arc<dyn CounterStore>,
    config: NumberingConfig,
}

impl NumberingService {
    pub fn new(store: Arc<dyn CounterStore>, config: NumberingConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &NumberingConfig {
        &self.config
    }

    fn default_counter(&self) -> SequenceCounter {
        SequenceCounter::new(self.config.default_prefix.clone(), self.config.start_number)
    }

    /// Return the tenant's counter, creating it with defaults on first use.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn ensure_counter(&self, tenant_id: Uuid) -> Result<SequenceCounter, EngineError> {
        let initial = self.default_counter();
        timed(
            "initialize_counter",
            self.store.initialize_counter(tenant_id, &initial),
        )
        .await
    }

    /// One read-increment-swap round trip.
    async fn allocate_once(&self, tenant_id: Uuid) -> Result<String, EngineError> {
        let current = self.ensure_counter(tenant_id).await?;
        let allocation = allocate_with_padding(&current, self.config.pad_width)?;

        timed(
            "compare_and_swap",
            self.store
                .compare_and_swap(tenant_id, &current, &allocation.updated_counter),
        )
        .await?;

        Ok(allocation.invoice_number)
    }

    /// Allocate a sequential number, surfacing store failures to the caller.
    pub async fn try_allocate(&self, tenant_id: Uuid) -> Result<AllocatedNumber, EngineError> {
        self.try_allocate_with_timeout(tenant_id, self.config.timeout)
            .await
    }

    /// Like [`try_allocate`](Self::try_allocate) with a caller-supplied timeout.
    ///
    /// A lost compare-and-swap is retried `conflict_retries` times. The
    /// timeout covers all attempts; expiry is reported as `CounterUnavailable`.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn try_allocate_with_timeout(
        &self,
        tenant_id: Uuid,
        timeout: Duration,
    ) -> Result<AllocatedNumber, EngineError> {
        let retry = RetryConfig::quick(self.config.conflict_retries);
        let this = self;
        let attempt = retry_async(
            &retry,
            "allocate_invoice_number",
            EngineError::is_conflict,
            move || this.allocate_once(tenant_id),
        );

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(invoice_number)) => Ok(AllocatedNumber::sequential(invoice_number)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(EngineError::CounterUnavailable(format!(
                "counter store did not respond within {}ms",
                timeout.as_millis()
            ))),
        }
    }

    /// Allocate an invoice number. Never fails: when the counter cannot be
    /// used the timestamp fallback number is returned instead.
    pub async fn allocate(&self, tenant_id: Uuid) -> AllocatedNumber {
        self.allocate_with_timeout(tenant_id, self.config.timeout)
            .await
    }

    /// Like [`allocate`](Self::allocate) with a caller-supplied timeout.
    pub async fn allocate_with_timeout(&self, tenant_id: Uuid, timeout: Duration) -> AllocatedNumber {
        match self.try_allocate_with_timeout(tenant_id, timeout).await {
            Ok(number) => {
                ALLOCATIONS_TOTAL.with_label_values(&["sequential"]).inc();
                info!(
                    tenant_id = %tenant_id,
                    invoice_number = %number.invoice_number,
                    "Invoice number allocated"
                );
                number
            }
            Err(e) => {
                ERRORS_TOTAL.with_label_values(&[e.kind()]).inc();
                ALLOCATIONS_TOTAL.with_label_values(&["fallback"]).inc();
                let number = AllocatedNumber::fallback(fallback_invoice_number(
                    &self.config.fallback_prefix,
                    Utc::now(),
                ));
                warn!(
                    tenant_id = %tenant_id,
                    error = %e,
                    invoice_number = %number.invoice_number,
                    "Sequential numbering failed, using fallback invoice number"
                );
                number
            }
        }
    }

    /// Preview the tenant's next number without consuming it.
    pub async fn preview_next_number(&self, tenant_id: Uuid) -> Result<String, EngineError> {
        let counter = self.ensure_counter(tenant_id).await?;
        Ok(peek_invoice_number(&counter, self.config.pad_width))
    }

    /// Explicitly reset the tenant's sequence. This is the only operation
    /// that may move the counter backwards.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn reset_counter(
        &self,
        tenant_id: Uuid,
        next_number: u64,
    ) -> Result<SequenceCounter, EngineError> {
        if next_number == 0 {
            return Err(EngineError::InvalidInput(
                "Sequence counter must start at 1".to_string(),
            ));
        }

        let current = self.ensure_counter(tenant_id).await?;
        let reset = SequenceCounter::new(current.prefix, next_number);
        timed("write_counter", self.store.write_counter(tenant_id, &reset)).await?;

        warn!(
            tenant_id = %tenant_id,
            previous_next_number = current.next_number,
            next_number = next_number,
            "Invoice counter reset"
        );

        Ok(reset)
    }

    /// Change the tenant's prefix, keeping the sequence position.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn set_prefix(
        &self,
        tenant_id: Uuid,
        prefix: &str,
    ) -> Result<SequenceCounter, EngineError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(EngineError::InvalidInput(
                "Invoice number prefix must not be empty".to_string(),
            ));
        }

        let retry = RetryConfig::quick(self.config.conflict_retries);
        let this = self;
        let updated = retry_async(&retry, "set_invoice_prefix", EngineError::is_conflict, move || {
            let prefix = prefix.to_string();
            async move {
                let current = this.ensure_counter(tenant_id).await?;
                let updated = SequenceCounter::new(prefix, current.next_number);
                timed(
                    "compare_and_swap",
                    this.store.compare_and_swap(tenant_id, &current, &updated),
                )
                .await?;
                Ok::<_, EngineError>(updated)
            }
        })
        .await?;

        info!(tenant_id = %tenant_id, prefix = %updated.prefix, "Invoice prefix updated");

        Ok(updated)
    }
}
