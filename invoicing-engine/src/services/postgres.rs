//! PostgreSQL-backed counter store.

use crate::config::DatabaseConfig;
use crate::error::EngineError;
use crate::models::SequenceCounter;
use crate::services::store::CounterStore;
use async_trait::async_trait;
use invoicing_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct CounterRow {
    prefix: String,
    next_number: i64,
}

impl TryFrom<CounterRow> for SequenceCounter {
    type Error = EngineError;

    fn try_from(row: CounterRow) -> Result<Self, Self::Error> {
        let next_number = u64::try_from(row.next_number).map_err(|_| {
            EngineError::CounterUnavailable(format!(
                "stored next_number {} is negative",
                row.next_number
            ))
        })?;
        Ok(SequenceCounter::new(row.prefix, next_number))
    }
}

fn to_db_number(counter: &SequenceCounter) -> Result<i64, EngineError> {
    i64::try_from(counter.next_number).map_err(|_| {
        EngineError::InvalidInput(format!(
            "next_number {} exceeds the storable range",
            counter.next_number
        ))
    })
}

fn unavailable(context: &str, err: sqlx::Error) -> EngineError {
    EngineError::CounterUnavailable(format!("{}: {}", context, err))
}

/// Counter store over the `invoice_counters` table.
#[derive(Clone)]
pub struct PgCounterStore {
    pool: PgPool,
}

impl PgCounterStore {
    /// Create a new connection pool.
    #[instrument(skip(config), fields(service = "invoicing-engine"))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(&config.url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl CounterStore for PgCounterStore {
    async fn read_counter(&self, tenant_id: Uuid) -> Result<Option<SequenceCounter>, EngineError> {
        let row = sqlx::query_as::<_, CounterRow>(
            "SELECT prefix, next_number FROM invoice_counters WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unavailable("Failed to read counter", e))?;

        row.map(SequenceCounter::try_from).transpose()
    }

    async fn initialize_counter(
        &self,
        tenant_id: Uuid,
        initial: &SequenceCounter,
    ) -> Result<SequenceCounter, EngineError> {
        sqlx::query(
            r#"
            INSERT INTO invoice_counters (tenant_id, prefix, next_number)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id) DO NOTHING
            "#,
        )
        .bind(tenant_id)
        .bind(&initial.prefix)
        .bind(to_db_number(initial)?)
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable("Failed to initialize counter", e))?;

        self.read_counter(tenant_id).await?.ok_or_else(|| {
            EngineError::CounterUnavailable(format!(
                "counter for tenant {} vanished after initialization",
                tenant_id
            ))
        })
    }

    async fn write_counter(
        &self,
        tenant_id: Uuid,
        counter: &SequenceCounter,
    ) -> Result<(), EngineError> {
        sqlx::query(
            r#"
            INSERT INTO invoice_counters (tenant_id, prefix, next_number)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id)
            DO UPDATE SET prefix = EXCLUDED.prefix,
                          next_number = EXCLUDED.next_number,
                          updated_utc = NOW()
            "#,
        )
        .bind(tenant_id)
        .bind(&counter.prefix)
        .bind(to_db_number(counter)?)
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable("Failed to write counter", e))?;

        Ok(())
    }

    async fn compare_and_swap(
        &self,
        tenant_id: Uuid,
        expected: &SequenceCounter,
        updated: &SequenceCounter,
    ) -> Result<(), EngineError> {
        let result = sqlx::query(
            r#"
            UPDATE invoice_counters
            SET prefix = $4, next_number = $5, updated_utc = NOW()
            WHERE tenant_id = $1 AND prefix = $2 AND next_number = $3
            "#,
        )
        .bind(tenant_id)
        .bind(&expected.prefix)
        .bind(to_db_number(expected)?)
        .bind(&updated.prefix)
        .bind(to_db_number(updated)?)
        .execute(&self.pool)
        .await
        .map_err(|e| unavailable("Failed to update counter", e))?;

        if result.rows_affected() == 0 {
            return Err(EngineError::ConcurrentAllocationConflict { tenant_id });
        }

        Ok(())
    }
}
