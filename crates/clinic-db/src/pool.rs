//! # Database Handle
//!
//! Opens the clinic SQLite file, applies the schema and hands out
//! repositories.
//!
//! ```text
//! ApiConfig ── CLINIC_DB_PATH, CLINIC_DB_MAX_CONNECTIONS
//!     │
//!     ▼
//! DbConfig ──► Database::new ──► SqlitePool (WAL, foreign keys on)
//!                   │                 │
//!                   ▼                 ▼
//!            pending migrations   db.orders(), db.payments(), ...
//! ```
//!
//! Checkout, payments and tier replacement write from concurrent requests,
//! so connections wait on a locked database for `busy_timeout` instead of
//! failing immediately.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::appointment::AppointmentRepository;
use crate::repository::commission_tier::CommissionTierRepository;
use crate::repository::customer::CustomerRepository;
use crate::repository::order::OrderRepository;
use crate::repository::payment::PaymentRepository;
use crate::repository::service_usage::ServiceUsageRepository;
use crate::repository::settings::SettingsRepository;
use crate::repository::user::UserRepository;

/// Where the database lives and how many connections may use it.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    /// Default: 5
    pub max_connections: u32,
    /// How long a request waits for a pooled connection. Default: 30s
    pub acquire_timeout: Duration,
    /// How long a statement waits on a write lock. Default: 5s
    pub busy_timeout: Duration,
}

impl DbConfig {
    /// File-backed database; the file is created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Private in-memory database for tests. One connection, since every
    /// new `:memory:` connection would see an empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }
}

/// Shared handle to the clinic database. Cloning shares the pool.
///
/// ```rust,ignore
/// let detail = db.customers().full_detail(customer_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening clinic database");

        let options = if config.is_in_memory() {
            SqliteConnectOptions::new().in_memory(true)
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        }
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::run_migrations(&pool).await?;
        let (total, applied) = migrations::migration_status(&pool).await?;
        info!(
            max_connections = config.max_connections,
            migrations = applied,
            known = total,
            "Clinic database ready"
        );

        Ok(Database { pool })
    }

    /// Raw pool for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.pool.clone())
    }

    pub fn appointments(&self) -> AppointmentRepository {
        AppointmentRepository::new(self.pool.clone())
    }

    pub fn service_usage(&self) -> ServiceUsageRepository {
        ServiceUsageRepository::new(self.pool.clone())
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    pub fn commission_tiers(&self) -> CommissionTierRepository {
        CommissionTierRepository::new(self.pool.clone())
    }

    /// Closes the pool on shutdown; later calls fail.
    pub async fn close(&self) {
        info!("Closing clinic database");
        self.pool.close().await;
    }

    /// `GET /health`: whether a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
