//! Counter store abstraction and the in-memory implementation.

use crate::error::EngineError;
use crate::models::SequenceCounter;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Persistence for per-tenant sequence counters.
///
/// Implementations report store outages as `CounterUnavailable` and a lost
/// compare-and-swap race as `ConcurrentAllocationConflict`.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Read the tenant's counter, `None` if the tenant has none yet.
    async fn read_counter(&self, tenant_id: Uuid) -> Result<Option<SequenceCounter>, EngineError>;

    /// Atomically create the tenant's counter if absent and return the
    /// stored counter (existing or newly created).
    async fn initialize_counter(
        &self,
        tenant_id: Uuid,
        initial: &SequenceCounter,
    ) -> Result<SequenceCounter, EngineError>;

    /// Unconditionally write the tenant's counter.
    async fn write_counter(
        &self,
        tenant_id: Uuid,
        counter: &SequenceCounter,
    ) -> Result<(), EngineError>;

    /// Replace `expected` with `updated` only if the stored counter still
    /// equals `expected`. A missing counter never matches.
    async fn compare_and_swap(
        &self,
        tenant_id: Uuid,
        expected: &SequenceCounter,
        updated: &SequenceCounter,
    ) -> Result<(), EngineError>;
}

/// Process-local counter store backed by a concurrent map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCounterStore {
    counters: Arc<DashMap<Uuid, SequenceCounter>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a tenant's counter, bypassing the async interface.
    pub fn get(&self, tenant_id: Uuid) -> Option<SequenceCounter> {
        self.counters.get(&tenant_id).map(|c| c.value().clone())
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn read_counter(&self, tenant_id: Uuid) -> Result<Option<SequenceCounter>, EngineError> {
        Ok(self.get(tenant_id))
    }

    async fn initialize_counter(
        &self,
        tenant_id: Uuid,
        initial: &SequenceCounter,
    ) -> Result<SequenceCounter, EngineError> {
        Ok(self
            .counters
            .entry(tenant_id)
            .or_insert_with(|| initial.clone())
            .value()
            .clone())
    }

    async fn write_counter(
        &self,
        tenant_id: Uuid,
        counter: &SequenceCounter,
    ) -> Result<(), EngineError> {
        self.counters.insert(tenant_id, counter.clone());
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        tenant_id: Uuid,
        expected: &SequenceCounter,
        updated: &SequenceCounter,
    ) -> Result<(), EngineError> {
        // The entry guard holds the shard lock for the whole check-and-set.
        match self.counters.entry(tenant_id) {
            Entry::Occupied(mut entry) if entry.get() == expected => {
                entry.insert(updated.clone());
                Ok(())
            }
            _ => Err(EngineError::ConcurrentAllocationConflict { tenant_id }),
        }
    }
}
