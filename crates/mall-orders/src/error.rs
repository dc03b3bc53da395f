//! # Service Error Types
//!
//! Errors surfaced by the order lifecycle and settlement operations.
//!
//! Domain rejections (stock, discounts, state guards) each get their own
//! variant so callers can map them to distinct responses; infrastructure
//! failures funnel through [`OrderError::Db`].

use thiserror::Error;

use mall_core::{CoreError, ValidationError};
use mall_db::DbError;

/// Errors from order creation, cancellation, settlement, and queries.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The shipping address does not exist or belongs to another user.
    #[error("Address not found: {address_id}")]
    AddressNotFound { address_id: String },

    /// A requested product or configuration is missing or off-shelf.
    #[error("Product unavailable: {reason}")]
    ProductUnavailable { reason: String },

    /// A stock pool could not cover the requested quantity.
    #[error("Insufficient stock for config '{config_id}'")]
    InsufficientStock { config_id: String },

    /// The seckill round is missing, closed, or sold out. Retryable.
    #[error("Seckill round unavailable: {reason}")]
    SeckillUnavailable { reason: String },

    /// The request itself is not a valid seckill order (multiple items,
    /// quantity above one). Resubmitting the same request will never succeed.
    #[error("Invalid seckill request: {reason}")]
    InvalidSeckillShape { reason: String },

    /// The requested coupon set violates a stacking or eligibility rule.
    #[error("Discount conflict: {reason}")]
    DiscountConflict { reason: String },

    /// The order does not exist (or is hidden from this user).
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// The order is not in a state the requested transition accepts.
    #[error("Order '{order_id}' cannot move from '{status}' for this operation")]
    InvalidTransition { order_id: String, status: String },

    /// The payment deadline passed; the order must be cancelled, not paid.
    #[error("Order '{order_id}' is past its payment deadline")]
    OrderExpired { order_id: String },

    /// The voucher is missing, inactive, expired, or owned by another user.
    #[error("Voucher invalid: {reason}")]
    VoucherInvalid { reason: String },

    /// Request-shape validation failed before any work was done.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Database layer failure.
    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

impl OrderError {
    pub fn product_unavailable(reason: impl Into<String>) -> Self {
        OrderError::ProductUnavailable {
            reason: reason.into(),
        }
    }

    pub fn seckill_unavailable(reason: impl Into<String>) -> Self {
        OrderError::SeckillUnavailable {
            reason: reason.into(),
        }
    }

    pub fn voucher_invalid(reason: impl Into<String>) -> Self {
        OrderError::VoucherInvalid {
            reason: reason.into(),
        }
    }

    pub fn invalid_transition(order_id: impl Into<String>, status: impl Into<String>) -> Self {
        OrderError::InvalidTransition {
            order_id: order_id.into(),
            status: status.into(),
        }
    }
}

impl From<CoreError> for OrderError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DiscountConflict { reason } => OrderError::DiscountConflict { reason },
            CoreError::InvalidSeckillShape { reason } => OrderError::InvalidSeckillShape { reason },
            CoreError::Validation(v) => OrderError::Validation(v),
        }
    }
}

/// Convenience result alias for service operations.
pub type OrderResult<T> = Result<T, OrderError>;
