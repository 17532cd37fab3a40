//! # clinic-core: Pure Business Logic for the Clinic POS
//!
//! This crate holds the clinic's business rules as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Clinic POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Front desk / staff screens                   │   │
//! │  │     Checkout ──► Payments ──► Appointments ──► Sales report     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ POST /api {action, payload}            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    clinic-api (axum)                            │   │
//! │  │    login, save_order, add_payment, get_sales_summary, ...       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ clinic-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌────────────────────┐ │   │
//! │  │  │  types   │ │  money   │ │  period  │ │    commission      │ │   │
//! │  │  │  Order   │ │  Money   │ │ DateRange│ │  summarize()       │ │   │
//! │  │  │  Role    │ │  Rate ops│ │ UTC bounds│ │  match_tier()      │ │   │
//! │  │  └──────────┘ └──────────┘ └──────────┘ └────────────────────┘ │   │
//! │  │  ┌──────────┐ ┌──────────┐                                     │   │
//! │  │  │  coerce  │ │validation│                                     │   │
//! │  │  └──────────┘ └──────────┘                                     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    clinic-db (Database Layer)                   │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, Payment, CommissionTier, Role, Rate, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`coerce`] - The zero-default rule for loosely typed order lines
//! - [`period`] - Calendar-day ranges and their UTC bounds
//! - [`commission`] - The sales & commission aggregator
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output
//! 2. **No I/O**: database, network and file system access stay out
//! 3. **Integer Money**: amounts are minor units (i64)
//! 4. **Explicit Errors**: typed errors, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use clinic_core::money::Money;
//! use clinic_core::types::Rate;
//!
//! let net = Money::from_major(900);
//! let commission = net.percent_of(Rate::from_percent(10));
//! assert_eq!(commission, Money::from_major(90));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coerce;
pub mod commission;
pub mod error;
pub mod money;
pub mod period;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use commission::{
    match_tier, summarize, DailySales, Requester, SalesInput, SalesSummary, ShopSummary,
    StaffPerformance, SummaryOptions,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use period::DateRange;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default business time zone offset: UTC+7 (Bangkok), in minutes.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 7 * 60;

/// Row limit for list screens (appointments, customer search).
pub const LIST_LIMIT: i64 = 50;
