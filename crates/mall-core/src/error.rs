//! # Error Types
//!
//! Domain-specific error types for mall-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mall-core errors (this file)                                          │
//! │  ├── CoreError        - Business-rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  mall-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  mall-orders errors (service crate)                                    │
//! │  └── OrderError       - What callers of the core operations see        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → OrderError → caller               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (config id, coupon name, ...)
//! 3. Errors are enum variants, never String
//! 4. Business outcomes with a valid next action (insufficient voucher
//!    balance) are NOT errors; they live in result types, not here

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business-rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The requested discount-instrument set violates the stacking rules.
    ///
    /// ## When This Occurs
    /// - Percentage and full-reduction coupons mixed on one order
    /// - More than one percentage coupon
    /// - Multiple full-reductions where any is non-stackable
    /// - A coupon outside its validity window, already consumed, or below
    ///   its threshold
    /// - Any discount instrument on a seckill order
    #[error("Discount conflict: {reason}")]
    DiscountConflict { reason: String },

    /// A seckill request with the wrong shape.
    ///
    /// Seckill orders are always exactly one item, quantity 1, with a bound
    /// round id.
    #[error("Invalid seckill order: {reason}")]
    InvalidSeckillShape { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a DiscountConflict with the given reason.
    pub fn discount_conflict(reason: impl Into<String>) -> Self {
        CoreError::DiscountConflict {
            reason: reason.into(),
        }
    }

    /// Creates an InvalidSeckillShape with the given reason.
    pub fn invalid_seckill(reason: impl Into<String>) -> Self {
        CoreError::InvalidSeckillShape {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a request doesn't meet shape requirements and are
/// rejected before any transaction opens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Too many entries in a collection.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// Duplicate value where uniqueness is required.
    #[error("{field} contains duplicate value '{value}'")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
