//! # clinic-db: Database Layer for the Clinic POS
//!
//! SQLite storage for staff, customers, orders, payments, appointments,
//! service usage, settings and commission tiers, using sqlx for async
//! access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Clinic POS Data Flow                             │
//! │                                                                         │
//! │  POST /api { action, payload }                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     clinic-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │   │  (embedded)  │  │   │
//! │  │   │               │    │ UserRepo       │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo      │   │ 001_initial  │  │   │
//! │  │   │ WAL + FKs     │    │ PaymentRepo    │   │  _schema.sql │  │   │
//! │  │   │               │    │ ...            │   │              │  │   │
//! │  │   └───────────────┘    └────────────────┘   └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 SQLite Database (CLINIC_DB_PATH)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Storage Conventions
//! - Money is stored as integer minor units, rates as basis points
//! - Timestamps are RFC 3339 UTC text, so range filters compare as text
//! - Enums are stored as their wire strings (`Active`, `credit_card`, `BT`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clinic_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./clinic.db")).await?;
//! let staff = db.users().authenticate("aom", "1234").await?;
//! let orders = db.orders().list_for_period(from, until).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::appointment::{AppointmentContact, AppointmentRepository, AppointmentView, NewAppointment};
pub use repository::commission_tier::CommissionTierRepository;
pub use repository::customer::{CustomerDetail, CustomerRepository, NewCustomer};
pub use repository::order::{CreatedOrder, InitialPayment, NewOrder, OrderRecord, OrderRepository};
pub use repository::payment::{NewPayment, PaymentRepository};
pub use repository::service_usage::{NewServiceUsage, ServiceUsageRecord, ServiceUsageRepository};
pub use repository::settings::SettingsRepository;
pub use repository::user::{hash_pin, verify_pin, NewStaff, UserRepository};
