//! # Repository Module
//!
//! Database repository implementations for the clinic POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Action handler                                                         │
//! │       │                                                                 │
//! │       │  db.orders().create(&customer, &order)                          │
//! │       ▼                                                                 │
//! │  OrderRepository ──► one transaction ──► SQLite                         │
//! │       │                                                                 │
//! │       ├── customer::upsert_by_phone    (shared helpers take a           │
//! │       └── payment::insert_payment       &mut SqliteConnection)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Multi-row writes (order + customer + first payment, appointment +
//! customer, tier replacement) run inside a single transaction. Helpers
//! shared between repositories take the caller's connection so they can
//! join that transaction.
//!
//! ## Available Repositories
//!
//! - [`user::UserRepository`] - Staff accounts and PIN login
//! - [`customer::CustomerRepository`] - Search and customer history
//! - [`order::OrderRepository`] - Checkout and cancellation
//! - [`payment::PaymentRepository`] - Installment payments
//! - [`appointment::AppointmentRepository`] - Bookings
//! - [`service_usage::ServiceUsageRepository`] - Treatment sessions
//! - [`settings::SettingsRepository`] - Alert and fee settings
//! - [`commission_tier::CommissionTierRepository`] - Commission brackets

pub mod appointment;
pub mod commission_tier;
pub mod customer;
pub mod order;
pub mod payment;
pub mod service_usage;
pub mod settings;
pub mod user;
