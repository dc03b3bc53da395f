//! # mall-orders: Order Lifecycle and Settlement Services
//!
//! The transaction-orchestration layer of the mall order core. Everything
//! that must happen atomically (reserving stock, binding coupons, settling
//! a voucher payment, unwinding a cancellation) is composed here from the
//! conditional-update primitives in `mall-db`, with pricing and validation
//! delegated to `mall-core`.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          OrderService                                   │
//! │                                                                         │
//! │  create_order          cart → priced, reserved, pending order           │
//! │  cancel_order          buyer backs out (unpaid only)                    │
//! │  cancel_expired_order  sweeper reaps deadline-passed orders             │
//! │  admin_cancel_order    operator voids a paid order (refunds voucher)    │
//! │  pay_with_voucher      settle: debit voucher, commit stock              │
//! │  advance_shipment      one fulfillment step per call                    │
//! │  mark_received         buyer confirms delivery                          │
//! │  delete_order          soft-hide finished/unpaid orders                 │
//! │  order_detail / list_orders / order_stats                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mall_db::{Database, DbConfig};
//! use mall_orders::OrderService;
//!
//! let db = Database::new(DbConfig::new("mall.db")).await?;
//! let service = OrderService::new(db);
//!
//! let order = service.create_order(request).await?;
//! let outcome = service.pay_with_voucher(&order.id, voucher_id, user_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cancel;
pub mod create;
pub mod error;
pub mod lifecycle;
pub mod query;
pub mod settle;


// =============================================================================
// Re-exports
// =============================================================================

pub use create::CreateOrderRequest;
pub use error::{OrderError, OrderResult};
pub use query::{ListOrdersFilter, OrderDetail, OrderStats};
pub use settle::SettlementOutcome;

use mall_db::Database;

/// Service facade over the database, holding every order operation.
///
/// Cheap to clone; the underlying pool is shared.
#[derive(Debug, Clone)]
pub struct OrderService {
    db: Database,
}

impl OrderService {
    /// Creates a service over an opened (and migrated) database.
    pub fn new(db: Database) -> Self {
        OrderService { db }
    }

    /// The underlying database handle, for callers that need raw reads.
    pub fn db(&self) -> &Database {
        &self.db
    }
}
