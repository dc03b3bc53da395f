//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A full-reduction coupon that knocks ¥20.00 off ¥150.00 must leave     │
//! │  exactly ¥130.00, not ¥129.99999999.                                  │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every amount in the system is an i64 number of cents. Percentage    │
//! │    math happens in i128 with explicit rounding, so we always know      │
//! │    where a lost cent went.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mall_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(1099); // ¥10.99
//!
//! // Arithmetic operations
//! let doubled = price * 2;                     // ¥21.98
//! let total = price + Money::from_cents(500);  // ¥15.99
//!
//! // NEVER do this:
//! // let bad = Money::from_float(10.99); // NO SUCH METHOD EXISTS!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative intermediate values (refund math)
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use mall_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents ¥10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use mall_core::money::Money;
    ///
    /// let price = Money::from_major_minor(10, 99); // ¥10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use mall_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // ¥2.99
    /// let line_total = unit_price.multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 897); // ¥8.97
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Subtracts, clamping the result at zero.
    ///
    /// The final payable of an order is `max(0, subtotal - discount)`;
    /// a stack of coupons can exceed the subtotal but never produces a
    /// negative bill.
    #[inline]
    pub const fn saturating_sub_zero(&self, other: Money) -> Money {
        let diff = self.0 - other.0;
        if diff < 0 {
            Money(0)
        } else {
            Money(diff)
        }
    }

    /// Discount amount for a percentage coupon expressed as a pay factor
    /// in basis points.
    ///
    /// A "pay 85%" coupon has `factor_bps = 8500`; the discount is
    /// `amount × (1 − 0.85)`.
    ///
    /// ## Implementation
    /// Integer math in i128 with bias rounding: `(amount * off_bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use mall_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(10000); // ¥100.00
    /// let discount = subtotal.discount_for_factor_bps(8500); // pay 85%
    /// assert_eq!(discount.cents(), 1500); // ¥15.00 off
    /// ```
    pub fn discount_for_factor_bps(&self, factor_bps: u32) -> Money {
        let off_bps = 10_000u32.saturating_sub(factor_bps);
        // i128 prevents overflow on large amounts
        let discount = (self.0 as i128 * off_bps as i128 + 5000) / 10_000;
        Money::from_cents(discount as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and debugging. Callers format for actual UI display
/// to handle localization properly.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

/// Multiplication by i64.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
    }

    #[test]
    fn test_from_major_minor() {
        let money = Money::from_major_minor(10, 99);
        assert_eq!(money.cents(), 1099);

        let negative = Money::from_major_minor(-5, 50);
        assert_eq!(negative.cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        let result: Money = a * 3;
        assert_eq!(result.cents(), 3000);
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_cents(299);
        let line_total = unit_price.multiply_quantity(3);
        assert_eq!(line_total.cents(), 897);
    }

    #[test]
    fn test_saturating_sub_zero() {
        let subtotal = Money::from_cents(1000);
        assert_eq!(subtotal.saturating_sub_zero(Money::from_cents(300)).cents(), 700);
        // Discounts exceeding the subtotal clamp to a zero bill
        assert_eq!(subtotal.saturating_sub_zero(Money::from_cents(1500)).cents(), 0);
    }

    #[test]
    fn test_factor_discount_basic() {
        // ¥100.00 at "pay 85%" = ¥15.00 off
        let subtotal = Money::from_cents(10000);
        assert_eq!(subtotal.discount_for_factor_bps(8500).cents(), 1500);
    }

    #[test]
    fn test_factor_discount_rounding() {
        // ¥0.99 at "pay 85%" = 14.85 cents off → rounds to 15
        let subtotal = Money::from_cents(99);
        assert_eq!(subtotal.discount_for_factor_bps(8500).cents(), 15);

        // ¥0.03 at "pay 50%" = 1.5 cents off → rounds to 2
        let tiny = Money::from_cents(3);
        assert_eq!(tiny.discount_for_factor_bps(5000).cents(), 2);
    }

    #[test]
    fn test_factor_discount_degenerate() {
        let subtotal = Money::from_cents(10000);
        // Pay 100% → no discount
        assert_eq!(subtotal.discount_for_factor_bps(10_000).cents(), 0);
        // Pay 0% → full discount
        assert_eq!(subtotal.discount_for_factor_bps(0).cents(), 10000);
        // Factor above 100% saturates to no discount
        assert_eq!(subtotal.discount_for_factor_bps(12_000).cents(), 0);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let positive = Money::from_cents(100);
        assert!(positive.is_positive());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
    }
}
