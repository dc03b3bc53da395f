//! # mall-core: Pure Business Logic for the Mall Order Core
//!
//! This crate is the **heart** of the order engine. It contains all business
//! logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Mall Order Core Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Calling layers (HTTP storefront / admin console)     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 mall-orders (service crate)                     │   │
//! │  │    create_order, cancel_order, pay_with_voucher, queries       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mall-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │   Order   │  │   Money   │  │   quote   │  │   shape   │  │   │
//! │  │   │  Coupon   │  │ bps math  │  │ stacking  │  │   rules   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 mall-db (Database Layer)                        │   │
//! │  │          SQLite queries, migrations, repositories               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, OrderItem, stock pools, instruments)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Discount eligibility and pricing engine
//! - [`validation`] - Request-shape validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use mall_core::Money` instead of
// `use mall_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{quote, AppliedCoupon, PriceQuote};
pub use types::*;
pub use validation::OrderDraftItem;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minutes an unpaid order holds its reservation before the payment deadline.
///
/// ## Business Reason
/// Reserved stock is unavailable to other buyers; the window bounds how long
/// an abandoned checkout can starve a configuration. An external sweeper is
/// expected to cancel orders past the deadline.
pub const PAY_WINDOW_MINUTES: i64 = 30;

/// Maximum line items allowed in a single order.
///
/// ## Business Reason
/// Prevents runaway carts and keeps the create-order transaction bounded.
pub const MAX_ORDER_ITEMS: usize = 50;

/// Maximum quantity of a single configuration per order.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Bounded retries for order-number collisions at insert time.
///
/// The number carries a timestamp plus a random suffix, which is not
/// collision-proof under burst concurrency; the UNIQUE constraint is the
/// guarantee and this retry is the recovery.
pub const ORDER_NO_MAX_ATTEMPTS: u32 = 5;
