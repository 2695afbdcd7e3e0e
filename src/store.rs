//! # Plan record store
//!
//! Append-only history of roaming plan changes, keyed by customer identity.
//! The current plan for an identity is the last row written for it; a row
//! with no plan records a cancellation (or a first contact with no plan).
//!
//! [`SqlitePlanStore`] is the durable implementation. [`InMemoryPlanStore`]
//! has the same semantics and is handy for tests and demos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

use crate::context::RoamingPlan;
use crate::error::{AgentsError, Collaborator, Result};

/// One persisted plan write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub customer_name: String,
    pub phone_number: String,
    pub roaming_plan: Option<RoamingPlan>,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Write one timestamped row.
    async fn append(
        &self,
        customer_name: &str,
        phone_number: &str,
        plan: Option<RoamingPlan>,
    ) -> Result<PlanRecord>;

    /// All rows for an identity, oldest first.
    async fn query(&self, customer_name: &str, phone_number: &str) -> Result<Vec<PlanRecord>>;
}

/// Most recent plan among `records`, if any row exists.
pub fn latest_plan(records: &[PlanRecord]) -> Option<Option<RoamingPlan>> {
    records.last().map(|r| r.roaming_plan)
}

/// A [`PlanStore`] backed by SQLite.
pub struct SqlitePlanStore {
    pool: Pool<Sqlite>,
}

impl SqlitePlanStore {
    /// Open (creating if needed) the database at `db_path`.
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePool::connect(&db_url).await?;
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn new_in_memory() -> Result<Self> {
        // a single connection, otherwise every pooled connection gets its own database
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS plans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_name TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                roaming_plan TEXT,
                recorded_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_plans_identity
            ON plans(customer_name, phone_number, id)
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PlanStore for SqlitePlanStore {
    async fn append(
        &self,
        customer_name: &str,
        phone_number: &str,
        plan: Option<RoamingPlan>,
    ) -> Result<PlanRecord> {
        let recorded_at = Utc::now();
        sqlx::query(
            "INSERT INTO plans (customer_name, phone_number, roaming_plan, recorded_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(customer_name)
        .bind(phone_number)
        .bind(plan.map(|p| p.as_str()))
        .bind(recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(customer_name, phone_number, plan = ?plan, "plan row appended");
        Ok(PlanRecord {
            customer_name: customer_name.to_string(),
            phone_number: phone_number.to_string(),
            roaming_plan: plan,
            recorded_at,
        })
    }

    async fn query(&self, customer_name: &str, phone_number: &str) -> Result<Vec<PlanRecord>> {
        let rows = sqlx::query(
            "SELECT customer_name, phone_number, roaming_plan, recorded_at FROM plans \
             WHERE customer_name = ? AND phone_number = ? ORDER BY id ASC",
        )
        .bind(customer_name)
        .bind(phone_number)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let plan: Option<String> = row.get("roaming_plan");
                let roaming_plan = plan
                    .map(|p| p.parse::<RoamingPlan>())
                    .transpose()
                    .map_err(|e| AgentsError::unavailable(Collaborator::RecordStore, e))?;
                let recorded_at: String = row.get("recorded_at");
                let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
                    .map_err(|e| AgentsError::unavailable(Collaborator::RecordStore, e))?
                    .with_timezone(&Utc);
                Ok(PlanRecord {
                    customer_name: row.get("customer_name"),
                    phone_number: row.get("phone_number"),
                    roaming_plan,
                    recorded_at,
                })
            })
            .collect()
    }
}

/// A [`PlanStore`] that keeps rows in memory.
#[derive(Default)]
pub struct InMemoryPlanStore {
    rows: Mutex<Vec<PlanRecord>>,
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn append(
        &self,
        customer_name: &str,
        phone_number: &str,
        plan: Option<RoamingPlan>,
    ) -> Result<PlanRecord> {
        let record = PlanRecord {
            customer_name: customer_name.to_string(),
            phone_number: phone_number.to_string(),
            roaming_plan: plan,
            recorded_at: Utc::now(),
        };
        self.rows.lock().await.push(record.clone());
        Ok(record)
    }

    async fn query(&self, customer_name: &str, phone_number: &str) -> Result<Vec<PlanRecord>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .filter(|r| r.customer_name == customer_name && r.phone_number == phone_number)
            .cloned()
            .collect())
    }
}
