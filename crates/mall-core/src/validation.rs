//! # Validation Module
//!
//! Request-shape validation for order creation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Calling layer (HTTP/CLI collaborator)                        │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - shape rules, before any transaction opens      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE / FK constraints                                │
//! │  └── CHECK constraints on the stock ledger                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Draft Item
// =============================================================================

/// One requested line of a create-order call, before resolution against the
/// catalog. Shared between validation and the service request DTO.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraftItem {
    pub product_id: String,
    pub config_id: String,
    pub quantity: i64,
    /// Seckill round this line buys from; required iff the order is seckill.
    pub seckill_round_id: Option<String>,
}

// =============================================================================
// Shape Validators
// =============================================================================

/// Validates the item list of a regular (non-seckill) order.
///
/// ## Rules
/// - At least one item, at most [`MAX_ORDER_ITEMS`]
/// - Every quantity in `1..=MAX_ITEM_QUANTITY`
/// - No repeated configuration (one line per config)
pub fn validate_items(items: &[OrderDraftItem]) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if items.len() > MAX_ORDER_ITEMS {
        return Err(ValidationError::TooMany {
            field: "items".to_string(),
            max: MAX_ORDER_ITEMS,
        });
    }

    for item in items {
        if item.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }
        if item.quantity > MAX_ITEM_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: MAX_ITEM_QUANTITY,
            });
        }
    }

    for (idx, item) in items.iter().enumerate() {
        if items[..idx].iter().any(|prior| prior.config_id == item.config_id) {
            return Err(ValidationError::Duplicate {
                field: "items".to_string(),
                value: item.config_id.clone(),
            });
        }
    }

    Ok(())
}

/// Validates that a list of requested discount-instrument ids has no repeats.
///
/// A repeated id would double-count one instrument's value in the quote.
pub fn validate_instrument_ids(ids: &[String]) -> ValidationResult<()> {
    for (idx, id) in ids.iter().enumerate() {
        if ids[..idx].contains(id) {
            return Err(ValidationError::Duplicate {
                field: "discountInstrumentIds".to_string(),
                value: id.clone(),
            });
        }
    }
    Ok(())
}

/// Validates the shape of a seckill order.
///
/// ## Rules
/// Seckill always means exactly one item, quantity 1, with a bound round id.
///
/// ## Example
/// ```rust
/// use mall_core::validation::{validate_seckill_shape, OrderDraftItem};
///
/// let item = OrderDraftItem {
///     product_id: "p1".into(),
///     config_id: "c1".into(),
///     quantity: 2,
///     seckill_round_id: Some("round".into()),
/// };
/// // Quantity 2 is never a valid seckill purchase
/// assert!(validate_seckill_shape(&[item]).is_err());
/// ```
pub fn validate_seckill_shape(items: &[OrderDraftItem]) -> CoreResult<()> {
    if items.len() != 1 {
        return Err(CoreError::invalid_seckill(
            "seckill orders contain exactly one item",
        ));
    }

    let item = &items[0];
    if item.quantity != 1 {
        return Err(CoreError::invalid_seckill("quantity must be 1"));
    }
    if item.seckill_round_id.is_none() {
        return Err(CoreError::invalid_seckill("a seckill round id is required"));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
