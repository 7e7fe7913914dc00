//! Shared fixtures and scripted counter stores for invoicing-engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use invoicing_engine::config::NumberingConfig;
use invoicing_engine::models::{
    CreateInvoice, DiscountPolicy, Invoice, LineItem, PartySnapshot, SequenceCounter,
};
use invoicing_engine::services::{CounterStore, InMemoryCounterStore};
use invoicing_engine::EngineError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Once;
use std::time::Duration;
use uuid::Uuid;

static TRACING: Once = Once::new();

pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = invoicing_core::observability::try_init_tracing("invoicing-engine-tests", "warn");
    });
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 30, 0).unwrap()
}

pub fn item(id: &str, quantity: Decimal, unit_price: Decimal) -> LineItem {
    LineItem::new(id, format!("Item {}", id), quantity, unit_price)
}

pub fn party(name: &str) -> PartySnapshot {
    PartySnapshot {
        name: name.to_string(),
        email: Some(format!("{}@example.com", name.to_lowercase())),
        ..Default::default()
    }
}

pub fn create_input(tenant_id: Uuid) -> CreateInvoice {
    CreateInvoice {
        tenant_id,
        date: date(2024, 3, 1),
        due_date: date(2024, 3, 31),
        from: party("Acme"),
        to: party("Globex"),
        items: vec![
            item("1", dec!(10), dec!(50)),
            item("2", dec!(5), dec!(100)),
        ],
        tax_rate: Decimal::ZERO,
        discount: DiscountPolicy::none(),
        currency: "USD".to_string(),
        notes: None,
    }
}

/// A draft invoice totalling 1000 and due 2024-03-31.
pub fn draft_invoice() -> Invoice {
    let number = invoicing_engine::models::AllocatedNumber::sequential("INV-001".to_string());
    Invoice::new(create_input(Uuid::new_v4()), number, at(2024, 3, 1))
}

pub fn fast_config() -> NumberingConfig {
    NumberingConfig {
        timeout: Duration::from_millis(500),
        ..Default::default()
    }
}

/// Every call fails as if the backing store were down.
pub struct UnavailableStore;

#[async_trait]
impl CounterStore for UnavailableStore {
    async fn read_counter(&self, _: Uuid) -> Result<Option<SequenceCounter>, EngineError> {
        Err(EngineError::CounterUnavailable("store offline".into()))
    }

    async fn initialize_counter(
        &self,
        _: Uuid,
        _: &SequenceCounter,
    ) -> Result<SequenceCounter, EngineError> {
        Err(EngineError::CounterUnavailable("store offline".into()))
    }

    async fn write_counter(&self, _: Uuid, _: &SequenceCounter) -> Result<(), EngineError> {
        Err(EngineError::CounterUnavailable("store offline".into()))
    }

    async fn compare_and_swap(
        &self,
        _: Uuid,
        _: &SequenceCounter,
        _: &SequenceCounter,
    ) -> Result<(), EngineError> {
        Err(EngineError::CounterUnavailable("store offline".into()))
    }
}

/// Wraps the in-memory store and fails the first `conflicts` swaps.
#[derive(Default)]
pub struct ConflictingStore {
    pub inner: InMemoryCounterStore,
    conflicts: u32,
    pub swap_calls: AtomicU32,
}

impl ConflictingStore {
    pub fn failing_first(conflicts: u32) -> Self {
        Self {
            conflicts,
            ..Default::default()
        }
    }

    pub fn always() -> Self {
        Self::failing_first(u32::MAX)
    }

    pub fn swaps(&self) -> u32 {
        self.swap_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CounterStore for ConflictingStore {
    async fn read_counter(&self, tenant_id: Uuid) -> Result<Option<SequenceCounter>, EngineError> {
        self.inner.read_counter(tenant_id).await
    }

    async fn initialize_counter(
        &self,
        tenant_id: Uuid,
        initial: &SequenceCounter,
    ) -> Result<SequenceCounter, EngineError> {
        self.inner.initialize_counter(tenant_id, initial).await
    }

    async fn write_counter(
        &self,
        tenant_id: Uuid,
        counter: &SequenceCounter,
    ) -> Result<(), EngineError> {
        self.inner.write_counter(tenant_id, counter).await
    }

    async fn compare_and_swap(
        &self,
        tenant_id: Uuid,
        expected: &SequenceCounter,
        updated: &SequenceCounter,
    ) -> Result<(), EngineError> {
        let call = self.swap_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.conflicts {
            return Err(EngineError::ConcurrentAllocationConflict { tenant_id });
        }
        self.inner.compare_and_swap(tenant_id, expected, updated).await
    }
}

/// Delays every call by `delay` before delegating to the in-memory store.
pub struct SlowStore {
    pub inner: InMemoryCounterStore,
    pub delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryCounterStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl CounterStore for SlowStore {
    async fn read_counter(&self, tenant_id: Uuid) -> Result<Option<SequenceCounter>, EngineError> {
        tokio::time::sleep(self.delay).await;
        self.inner.read_counter(tenant_id).await
    }

    async fn initialize_counter(
        &self,
        tenant_id: Uuid,
        initial: &SequenceCounter,
    ) -> Result<SequenceCounter, EngineError> {
        tokio::time::sleep(self.delay).await;
        self.inner.initialize_counter(tenant_id, initial).await
    }

    async fn write_counter(
        &self,
        tenant_id: Uuid,
        counter: &SequenceCounter,
    ) -> Result<(), EngineError> {
        tokio::time::sleep(self.delay).await;
        self.inner.write_counter(tenant_id, counter).await
    }

    async fn compare_and_swap(
        &self,
        tenant_id: Uuid,
        expected: &SequenceCounter,
        updated: &SequenceCounter,
    ) -> Result<(), EngineError> {
        tokio::time::sleep(self.delay).await;
        self.inner.compare_and_swap(tenant_id, expected, updated).await
    }
}

/// Persists the first swap, then reports the store as unavailable.
#[derive(Default)]
pub struct PersistThenFailStore {
    pub inner: InMemoryCounterStore,
    failed: AtomicBool,
}

#[async_trait]
impl CounterStore for PersistThenFailStore {
    async fn read_counter(&self, tenant_id: Uuid) -> Result<Option<SequenceCounter>, EngineError> {
        self.inner.read_counter(tenant_id).await
    }

    async fn initialize_counter(
        &self,
        tenant_id: Uuid,
        initial: &SequenceCounter,
    ) -> Result<SequenceCounter, EngineError> {
        self.inner.initialize_counter(tenant_id, initial).await
    }

    async fn write_counter(
        &self,
        tenant_id: Uuid,
        counter: &SequenceCounter,
    ) -> Result<(), EngineError> {
        self.inner.write_counter(tenant_id, counter).await
    }

    async fn compare_and_swap(
        &self,
        tenant_id: Uuid,
        expected: &SequenceCounter,
        updated: &SequenceCounter,
    ) -> Result<(), EngineError> {
        self.inner
            .compare_and_swap(tenant_id, expected, updated)
            .await?;
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(EngineError::CounterUnavailable(
                "connection reset after write".into(),
            ));
        }
        Ok(())
    }
}
