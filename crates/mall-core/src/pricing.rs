//! # Discount Eligibility & Pricing Engine
//!
//! Validates a requested set of discount instruments against the stacking
//! rules and computes the discounted total. Pure functions: the caller loads
//! the claimed coupons, this module only decides.
//!
//! ## Stacking Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Requested instruments                                                  │
//! │       │                                                                 │
//! │       ├── seckill order? ──────────► must be EMPTY                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  partition by kind                                                      │
//! │       │                                                                 │
//! │       ├── percentage + full-reduction ────► REJECT (exclusive families) │
//! │       ├── two percentage ─────────────────► REJECT (at most one)        │
//! │       ├── 2+ full-reduction, any          ─► REJECT                     │
//! │       │   non-stackable                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  full-reduction: each threshold checked against the PRE-discount        │
//! │  subtotal independently, fixed amounts summed                           │
//! │  percentage:     discount = subtotal × (1 − factor)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  payable = max(0, subtotal − discount)                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All checks run before any stock is reserved, so a rejected order never
//! touches the inventory ledger.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CouponKind, UserCoupon};

// =============================================================================
// Quote Output
// =============================================================================

/// The amount one instrument contributed, recorded onto the instrument when
/// it is marked in-use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCoupon {
    pub user_coupon_id: String,
    pub amount_cents: i64,
}

/// Result of a successful pricing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    /// `max(0, subtotal − discount)`.
    pub payable_cents: i64,
    /// Per-instrument applied amounts, in request order.
    pub applied: Vec<AppliedCoupon>,
}

impl PriceQuote {
    /// A quote with no instruments applied.
    pub fn undiscounted(subtotal: Money) -> Self {
        PriceQuote {
            subtotal_cents: subtotal.cents(),
            discount_cents: 0,
            payable_cents: subtotal.cents(),
            applied: Vec::new(),
        }
    }
}

// =============================================================================
// Quote
// =============================================================================

/// Validates the coupon set and computes the discounted total.
///
/// Every requested coupon must be individually usable at `now` (unused and
/// inside its validity window) and, for full-reductions, meet its threshold
/// against the pre-discount subtotal. Any violation rejects the whole set:
/// a coupon that cannot contribute must not be marked consumed, and silently
/// dropping it would make the response ambiguous about what was spent.
pub fn quote(
    subtotal: Money,
    coupons: &[UserCoupon],
    now: DateTime<Utc>,
) -> CoreResult<PriceQuote> {
    if coupons.is_empty() {
        return Ok(PriceQuote::undiscounted(subtotal));
    }

    for coupon in coupons {
        if !coupon.is_usable(now) {
            return Err(CoreError::discount_conflict(format!(
                "coupon '{}' is not usable (consumed or outside validity window)",
                coupon.name
            )));
        }
    }

    let percentage: Vec<&UserCoupon> = coupons
        .iter()
        .filter(|c| c.kind == CouponKind::Percentage)
        .collect();
    let full_reduction: Vec<&UserCoupon> = coupons
        .iter()
        .filter(|c| c.kind == CouponKind::FullReduction)
        .collect();

    // Mutually exclusive families, regardless of request order
    if !percentage.is_empty() && !full_reduction.is_empty() {
        return Err(CoreError::discount_conflict(
            "percentage and full-reduction coupons cannot combine",
        ));
    }

    if percentage.len() > 1 {
        return Err(CoreError::discount_conflict(
            "at most one percentage coupon per order",
        ));
    }

    if full_reduction.len() > 1 && full_reduction.iter().any(|c| !c.stackable) {
        return Err(CoreError::discount_conflict(
            "a non-stackable full-reduction coupon cannot combine with other coupons",
        ));
    }

    let mut discount = Money::zero();
    let mut applied = Vec::with_capacity(coupons.len());

    if let Some(coupon) = percentage.first() {
        let amount = subtotal.discount_for_factor_bps(coupon.discount_bps as u32);
        discount += amount;
        applied.push(AppliedCoupon {
            user_coupon_id: coupon.id.clone(),
            amount_cents: amount.cents(),
        });
    }

    for coupon in &full_reduction {
        // Each threshold is evaluated against the pre-discount subtotal,
        // never against a running discounted total
        if subtotal.cents() < coupon.threshold_cents {
            return Err(CoreError::discount_conflict(format!(
                "coupon '{}' requires a subtotal of at least {}",
                coupon.name,
                Money::from_cents(coupon.threshold_cents)
            )));
        }
        discount += Money::from_cents(coupon.amount_cents);
        applied.push(AppliedCoupon {
            user_coupon_id: coupon.id.clone(),
            amount_cents: coupon.amount_cents,
        });
    }

    let payable = subtotal.saturating_sub_zero(discount);

    Ok(PriceQuote {
        subtotal_cents: subtotal.cents(),
        discount_cents: discount.cents(),
        payable_cents: payable.cents(),
        applied,
    })
}

// =============================================================================
// Per-Line Allocation
// =============================================================================

/// Splits an order-level discount across line items, proportionally to their
/// pre-discount totals.
///
/// Integer division loses cents; every line except the last takes its floor
/// share and the last line absorbs the remainder, so the allocation always
/// sums to exactly `discount_cents`.
pub fn allocate_line_discounts(line_total_cents: &[i64], discount_cents: i64) -> Vec<i64> {
    let subtotal: i64 = line_total_cents.iter().sum();
    if subtotal <= 0 || discount_cents <= 0 || line_total_cents.is_empty() {
        return vec![0; line_total_cents.len()];
    }

    let mut shares = Vec::with_capacity(line_total_cents.len());
    let mut allocated: i64 = 0;
    for (idx, line) in line_total_cents.iter().enumerate() {
        let share = if idx == line_total_cents.len() - 1 {
            discount_cents - allocated
        } else {
            (discount_cents as i128 * *line as i128 / subtotal as i128) as i64
        };
        allocated += share;
        shares.push(share);
    }
    shares
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CouponStatus, UserCoupon};
    use chrono::Duration;

    fn full_reduction(id: &str, threshold: i64, amount: i64, stackable: bool) -> UserCoupon {
        let now = Utc::now();
        UserCoupon {
            id: id.to_string(),
            user_id: "u1".into(),
            coupon_id: format!("tpl-{id}"),
            name: format!("{} off {}", amount, threshold),
            kind: CouponKind::FullReduction,
            amount_cents: amount,
            discount_bps: 0,
            threshold_cents: threshold,
            stackable,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            status: CouponStatus::Unused,
            order_id: None,
            used_amount_cents: None,
            used_at: None,
        }
    }

    fn percentage(id: &str, factor_bps: i64) -> UserCoupon {
        let mut c = full_reduction(id, 0, 0, false);
        c.kind = CouponKind::Percentage;
        c.discount_bps = factor_bps;
        c
    }

    #[test]
    fn test_no_coupons_is_undiscounted() {
        let q = quote(Money::from_cents(15000), &[], Utc::now()).unwrap();
        assert_eq!(q.subtotal_cents, 15000);
        assert_eq!(q.discount_cents, 0);
        assert_eq!(q.payable_cents, 15000);
        assert!(q.applied.is_empty());
    }

    #[test]
    fn test_single_full_reduction() {
        // threshold=100, amount=20, subtotal=150 → payable 130
        let coupons = [full_reduction("a", 10000, 2000, false)];
        let q = quote(Money::from_cents(15000), &coupons, Utc::now()).unwrap();
        assert_eq!(q.discount_cents, 2000);
        assert_eq!(q.payable_cents, 13000);
        assert_eq!(q.applied[0].amount_cents, 2000);
    }

    #[test]
    fn test_stacked_full_reductions_against_original_subtotal() {
        // Both thresholds evaluated against the original 150 subtotal:
        // 150 - 20 - 10 = 120
        let coupons = [
            full_reduction("a", 10000, 2000, true),
            full_reduction("b", 10000, 1000, true),
        ];
        let q = quote(Money::from_cents(15000), &coupons, Utc::now()).unwrap();
        assert_eq!(q.discount_cents, 3000);
        assert_eq!(q.payable_cents, 12000);
        assert_eq!(q.applied.len(), 2);
    }

    #[test]
    fn test_non_stackable_pair_rejected() {
        let coupons = [
            full_reduction("a", 10000, 2000, false),
            full_reduction("b", 10000, 1000, true),
        ];
        let err = quote(Money::from_cents(15000), &coupons, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::DiscountConflict { .. }));
    }

    #[test]
    fn test_mixed_families_rejected_regardless_of_order() {
        let a = percentage("p", 8500);
        let b = full_reduction("f", 10000, 2000, true);
        let now = Utc::now();

        let err1 = quote(Money::from_cents(15000), &[a.clone(), b.clone()], now).unwrap_err();
        let err2 = quote(Money::from_cents(15000), &[b, a], now).unwrap_err();
        assert!(matches!(err1, CoreError::DiscountConflict { .. }));
        assert!(matches!(err2, CoreError::DiscountConflict { .. }));
    }

    #[test]
    fn test_two_percentage_rejected() {
        let coupons = [percentage("p1", 8500), percentage("p2", 9000)];
        let err = quote(Money::from_cents(15000), &coupons, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::DiscountConflict { .. }));
    }

    #[test]
    fn test_percentage_discount() {
        // pay 85% of 150.00 → 22.50 off
        let coupons = [percentage("p", 8500)];
        let q = quote(Money::from_cents(15000), &coupons, Utc::now()).unwrap();
        assert_eq!(q.discount_cents, 2250);
        assert_eq!(q.payable_cents, 12750);
        assert_eq!(q.applied[0].amount_cents, 2250);
    }

    #[test]
    fn test_below_threshold_rejected() {
        let coupons = [full_reduction("a", 20000, 2000, false)];
        let err = quote(Money::from_cents(15000), &coupons, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::DiscountConflict { .. }));
    }

    #[test]
    fn test_expired_coupon_rejected() {
        let mut coupon = full_reduction("a", 10000, 2000, false);
        coupon.valid_until = Utc::now() - Duration::hours(1);
        let err = quote(Money::from_cents(15000), &[coupon], Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::DiscountConflict { .. }));
    }

    #[test]
    fn test_consumed_coupon_rejected() {
        let mut coupon = full_reduction("a", 10000, 2000, false);
        coupon.status = CouponStatus::Used;
        let err = quote(Money::from_cents(15000), &[coupon], Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::DiscountConflict { .. }));
    }

    #[test]
    fn test_payable_clamps_at_zero() {
        // Stack worth 60 against a subtotal of 50
        let coupons = [
            full_reduction("a", 5000, 3000, true),
            full_reduction("b", 5000, 3000, true),
        ];
        let q = quote(Money::from_cents(5000), &coupons, Utc::now()).unwrap();
        assert_eq!(q.discount_cents, 6000);
        assert_eq!(q.payable_cents, 0);
    }

    #[test]
    fn test_line_allocation_sums_exactly() {
        let lines = [9000, 4000, 2000];
        let shares = allocate_line_discounts(&lines, 2000);
        assert_eq!(shares.iter().sum::<i64>(), 2000);
        // Proportional floors: 1200, 533, remainder 267 on the last line
        assert_eq!(shares, vec![1200, 533, 267]);
    }

    #[test]
    fn test_line_allocation_degenerate() {
        assert_eq!(allocate_line_discounts(&[], 500), Vec::<i64>::new());
        assert_eq!(allocate_line_discounts(&[1000, 2000], 0), vec![0, 0]);
        // Single line takes everything
        assert_eq!(allocate_line_discounts(&[1500], 700), vec![700]);
    }
}
