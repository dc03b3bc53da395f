//! # Domain Types
//!
//! Core domain types for the mall order core.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   OrderItem     │   │   StockEntry    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  order_id (FK)  │   │  config_id (PK) │       │
//! │  │  order_no       │   │  name_snapshot  │   │  shelf_num      │       │
//! │  │  status         │   │  unit_price     │   │  lock_num       │       │
//! │  │  pay_limit_time │   │  is_seckill     │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   UserCoupon    │   │  UserVoucher    │   │  SeckillRound   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  kind           │   │  remain_amount  │   │  seckill_price  │       │
//! │  │  threshold      │   │  status         │   │  shelf/remain/  │       │
//! │  │  stackable      │   │  validity       │   │  lock           │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Orders have:
//! - `id`: UUID v4 - immutable, used for database relations
//! - `order_no`: human-readable business number, unique at the storage layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Order Status
// =============================================================================

/// The lifecycle status of an order.
///
/// ## State Machine
/// ```text
/// PendingPayment → Paid → PendingShip → Shipped → PendingReceive → Received
///       │            │
///       │ (user)     │ (admin)
///       ▼            ▼
///            Cancelled
/// ```
/// No transition skips a state except the admin cancel-from-Paid path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, stock reserved, waiting for settlement.
    PendingPayment,
    /// Settled; reserved stock has been committed.
    Paid,
    /// Accepted for fulfillment, not yet handed to the carrier.
    PendingShip,
    /// In transit.
    Shipped,
    /// Delivered, waiting for the buyer's confirmation.
    PendingReceive,
    /// Confirmed by the buyer. Terminal.
    Received,
    /// Cancelled before payment (user) or after payment (admin). Terminal.
    Cancelled,
}

impl OrderStatus {
    /// The next status along the fulfillment chain, if this status has one.
    ///
    /// Only statuses between `Paid` and `PendingReceive` participate;
    /// `advance_shipment` moves exactly one adjacent step per call.
    pub fn next_fulfillment_stage(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Paid => Some(OrderStatus::PendingShip),
            OrderStatus::PendingShip => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => Some(OrderStatus::PendingReceive),
            _ => None,
        }
    }

    /// Whether the owning user may cancel from this status.
    pub fn user_can_cancel(&self) -> bool {
        matches!(self, OrderStatus::PendingPayment)
    }

    /// Whether an admin may cancel from this status (fraud, stock error).
    pub fn admin_can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    /// Whether the order may be soft-deleted (hidden) from this status.
    pub fn can_soft_delete(&self) -> bool {
        matches!(
            self,
            OrderStatus::PendingPayment | OrderStatus::Cancelled | OrderStatus::Received
        )
    }

    /// Storage representation, matching the sqlx snake_case mapping.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::PendingShip => "pending_ship",
            OrderStatus::Shipped => "shipped",
            OrderStatus::PendingReceive => "pending_receive",
            OrderStatus::Received => "received",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order placed by a user.
///
/// The receiver fields are snapshots of the shipping address captured at
/// creation time; they are never re-resolved against `user_addresses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    /// Business order number, unique at the storage layer.
    pub order_no: String,
    pub user_id: String,
    pub status: OrderStatus,
    /// Nominal total before discounts.
    pub pay_amount_cents: i64,
    /// Total actually payable after discounts.
    pub actual_pay_amount_cents: i64,
    /// Total discount applied across all instruments.
    pub discount_cents: i64,
    /// Receiver name at order time (frozen).
    pub receiver_name: String,
    /// Receiver phone at order time (frozen).
    pub receiver_phone: String,
    /// Full shipping address at order time (frozen).
    pub receiver_address: String,
    /// Hard deadline for settling an unpaid order.
    pub pay_limit_time: DateTime<Utc>,
    pub pay_time: Option<DateTime<Utc>>,
    pub cancel_time: Option<DateTime<Utc>>,
    pub receive_time: Option<DateTime<Utc>>,
    /// Soft-delete flag; hidden orders stay in storage forever.
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the nominal total as Money.
    #[inline]
    pub fn pay_amount(&self) -> Money {
        Money::from_cents(self.pay_amount_cents)
    }

    /// Returns the discounted total as Money.
    #[inline]
    pub fn actual_pay_amount(&self) -> Money {
        Money::from_cents(self.actual_pay_amount_cents)
    }

    /// Whether the payment deadline has passed at `now`.
    #[inline]
    pub fn is_pay_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.pay_limit_time
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item in an order.
/// Uses snapshot pattern to freeze product data at order time: price and
/// catalog changes after purchase must never alter a placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub config_id: String,
    /// Product name at order time (frozen).
    pub name_snapshot: String,
    /// Configuration description at order time (frozen).
    pub config_snapshot: String,
    /// Unit price in cents at order time (frozen).
    /// Seckill price for seckill items, catalog sale price otherwise.
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// This line's share of the order-level discount.
    pub discount_cents: i64,
    pub is_seckill: bool,
    /// Bound seckill round, present iff `is_seckill`.
    pub seckill_round_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Line total before discount (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents * self.quantity)
    }
}

// =============================================================================
// Stock Pools
// =============================================================================

/// Regular shelf stock for one product configuration.
///
/// Invariant: `0 ≤ lock_num ≤ shelf_num`. Available-to-reserve is
/// `shelf_num − lock_num`; `shelf_num` only drops at settlement commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockEntry {
    pub config_id: String,
    /// Units currently offered.
    pub shelf_num: i64,
    /// Units reserved by unpaid orders.
    pub lock_num: i64,
}

impl StockEntry {
    /// Units available for new reservations.
    #[inline]
    pub fn available(&self) -> i64 {
        self.shelf_num - self.lock_num
    }
}

/// A time-boxed flash-sale round with its own inventory pool and fixed price.
///
/// Invariant: `0 ≤ lock_num ≤ remain_num ≤ shelf_num`. `shelf_num` is the
/// round allotment and never changes; `remain_num` only drops at settlement
/// commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SeckillRound {
    pub id: String,
    pub config_id: String,
    /// Fixed discounted price; seckill orders accept no other discounts.
    pub seckill_price_cents: i64,
    /// Units allotted to the round.
    pub shelf_num: i64,
    /// Units not yet permanently consumed.
    pub remain_num: i64,
    /// Units reserved by unpaid orders.
    pub lock_num: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl SeckillRound {
    /// Units available for new reservations.
    #[inline]
    pub fn available(&self) -> i64 {
        self.remain_num - self.lock_num
    }

    /// Whether the round is open at `now`.
    #[inline]
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now <= self.end_time
    }

    /// Returns the fixed round price as Money.
    #[inline]
    pub fn seckill_price(&self) -> Money {
        Money::from_cents(self.seckill_price_cents)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A sellable product. Catalog CRUD is an external collaborator; the order
/// core only reads these rows to build snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Off-shelf products cannot be ordered.
    pub on_shelf: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchasable configuration of a product (size, bundle, color...).
/// Stock is keyed by configuration, not by product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductConfig {
    pub id: String,
    pub product_id: String,
    /// Configuration description, snapshotted onto order items.
    pub name: String,
    pub sale_price_cents: i64,
    pub on_shelf: bool,
}

impl ProductConfig {
    /// Returns the catalog sale price as Money.
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }
}

// =============================================================================
// Discount Instruments
// =============================================================================

/// Kind of coupon template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// Multiplies the subtotal by a pay factor ("pay 85%").
    Percentage,
    /// Fixed amount off once the subtotal reaches a threshold ("¥20 off ¥100").
    FullReduction,
}

/// Storage status of a claimed coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    Unused,
    Used,
    Expired,
}

/// A user's claim on a coupon template, joined with the template fields the
/// pricing engine needs.
///
/// A `Used` row always carries `order_id` and `used_amount_cents`; the
/// [`CouponState`] view makes the illegal combination ("used with no bound
/// order") unrepresentable at the domain level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserCoupon {
    pub id: String,
    pub user_id: String,
    pub coupon_id: String,
    pub name: String,
    pub kind: CouponKind,
    /// Fixed reduction for full-reduction coupons.
    pub amount_cents: i64,
    /// Pay factor in basis points for percentage coupons (8500 = pay 85%).
    pub discount_bps: i64,
    /// Minimum pre-discount subtotal for full-reduction coupons.
    pub threshold_cents: i64,
    /// Full-reduction only: may combine with other stackable full-reductions.
    pub stackable: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub status: CouponStatus,
    /// Order that consumed this coupon, present iff `status == Used`.
    pub order_id: Option<String>,
    /// Amount actually applied, present iff `status == Used`.
    pub used_amount_cents: Option<i64>,
    pub used_at: Option<DateTime<Utc>>,
}

/// Tagged view of a claimed coupon's consumption state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponState {
    Unused,
    Used { order_id: String, amount_cents: i64 },
    Expired,
}

impl UserCoupon {
    /// Collapses the status columns into a tagged state.
    ///
    /// A `Used` row missing its order binding indicates ledger corruption
    /// (the mark-used update writes all three columns in one statement), so
    /// it is surfaced as `Expired` rather than invented data.
    pub fn state(&self) -> CouponState {
        match self.status {
            CouponStatus::Unused => CouponState::Unused,
            CouponStatus::Used => match (&self.order_id, self.used_amount_cents) {
                (Some(order_id), Some(amount_cents)) => CouponState::Used {
                    order_id: order_id.clone(),
                    amount_cents,
                },
                _ => CouponState::Expired,
            },
            CouponStatus::Expired => CouponState::Expired,
        }
    }

    /// Whether this coupon can be applied at `now`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == CouponStatus::Unused && self.valid_from <= now && now <= self.valid_until
    }
}

/// Storage status of a store-credit voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    Active,
    Inactive,
}

/// A store-credit grant with a depletable balance, usable across multiple
/// orders until exhausted. `remain_amount_cents` decreases monotonically as
/// it pays down orders; the voucher flips to `Inactive` at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserVoucher {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub remain_amount_cents: i64,
    pub status: VoucherStatus,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserVoucher {
    /// Returns the remaining balance as Money.
    #[inline]
    pub fn remain_amount(&self) -> Money {
        Money::from_cents(self.remain_amount_cents)
    }

    /// Whether this voucher can settle an order at `now`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == VoucherStatus::Active
            && self.valid_from <= now
            && now <= self.valid_until
    }
}

// =============================================================================
// Shipping Address
// =============================================================================

/// A user's saved shipping address. Resolved once at order creation and
/// copied onto the order; later edits never touch placed orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Address {
    pub id: String,
    pub user_id: String,
    pub receiver_name: String,
    pub receiver_phone: String,
    pub province: String,
    pub city: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// Single-line form snapshotted onto orders.
    pub fn full_address(&self) -> String {
        format!("{} {} {}", self.province, self.city, self.detail)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fulfillment_chain() {
        assert_eq!(
            OrderStatus::Paid.next_fulfillment_stage(),
            Some(OrderStatus::PendingShip)
        );
        assert_eq!(
            OrderStatus::PendingShip.next_fulfillment_stage(),
            Some(OrderStatus::Shipped)
        );
        assert_eq!(
            OrderStatus::Shipped.next_fulfillment_stage(),
            Some(OrderStatus::PendingReceive)
        );
        assert_eq!(OrderStatus::PendingReceive.next_fulfillment_stage(), None);
        assert_eq!(OrderStatus::PendingPayment.next_fulfillment_stage(), None);
        assert_eq!(OrderStatus::Cancelled.next_fulfillment_stage(), None);
    }

    #[test]
    fn test_cancel_permissions() {
        assert!(OrderStatus::PendingPayment.user_can_cancel());
        assert!(!OrderStatus::Paid.user_can_cancel());
        assert!(OrderStatus::Paid.admin_can_cancel());
        assert!(!OrderStatus::Shipped.admin_can_cancel());
        assert!(!OrderStatus::Cancelled.admin_can_cancel());
    }

    #[test]
    fn test_soft_delete_gating() {
        assert!(OrderStatus::PendingPayment.can_soft_delete());
        assert!(OrderStatus::Cancelled.can_soft_delete());
        assert!(OrderStatus::Received.can_soft_delete());
        assert!(!OrderStatus::Paid.can_soft_delete());
        assert!(!OrderStatus::Shipped.can_soft_delete());
    }

    #[test]
    fn test_stock_available() {
        let stock = StockEntry {
            config_id: "c1".into(),
            shelf_num: 10,
            lock_num: 3,
        };
        assert_eq!(stock.available(), 7);
    }

    #[test]
    fn test_seckill_round_window() {
        let now = Utc::now();
        let round = SeckillRound {
            id: "r1".into(),
            config_id: "c1".into(),
            seckill_price_cents: 990,
            shelf_num: 100,
            remain_num: 80,
            lock_num: 5,
            start_time: now - Duration::hours(1),
            end_time: now + Duration::hours(1),
        };
        assert!(round.is_open(now));
        assert!(!round.is_open(now + Duration::hours(2)));
        assert_eq!(round.available(), 75);
    }

    fn claimed_coupon(status: CouponStatus) -> UserCoupon {
        let now = Utc::now();
        UserCoupon {
            id: "uc1".into(),
            user_id: "u1".into(),
            coupon_id: "c1".into(),
            name: "¥20 off ¥100".into(),
            kind: CouponKind::FullReduction,
            amount_cents: 2000,
            discount_bps: 0,
            threshold_cents: 10000,
            stackable: true,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            status,
            order_id: None,
            used_amount_cents: None,
            used_at: None,
        }
    }

    #[test]
    fn test_coupon_state_view() {
        assert_eq!(claimed_coupon(CouponStatus::Unused).state(), CouponState::Unused);

        let mut used = claimed_coupon(CouponStatus::Used);
        used.order_id = Some("o1".into());
        used.used_amount_cents = Some(2000);
        assert_eq!(
            used.state(),
            CouponState::Used {
                order_id: "o1".into(),
                amount_cents: 2000
            }
        );

        // A used row with no order binding is never treated as spendable
        let corrupt = claimed_coupon(CouponStatus::Used);
        assert_eq!(corrupt.state(), CouponState::Expired);
    }

    #[test]
    fn test_coupon_usability_window() {
        let now = Utc::now();
        let mut coupon = claimed_coupon(CouponStatus::Unused);
        assert!(coupon.is_usable(now));

        coupon.valid_until = now - Duration::hours(1);
        assert!(!coupon.is_usable(now));
    }

    #[test]
    fn test_voucher_usability() {
        let now = Utc::now();
        let mut voucher = UserVoucher {
            id: "v1".into(),
            user_id: "u1".into(),
            name: "store credit".into(),
            remain_amount_cents: 5000,
            status: VoucherStatus::Active,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(30),
            created_at: now,
            updated_at: now,
        };
        assert!(voucher.is_usable(now));

        voucher.status = VoucherStatus::Inactive;
        assert!(!voucher.is_usable(now));
    }

    #[test]
    fn test_address_snapshot_line() {
        let addr = Address {
            id: "a1".into(),
            user_id: "u1".into(),
            receiver_name: "Lee".into(),
            receiver_phone: "13800000000".into(),
            province: "Guangdong".into(),
            city: "Shenzhen".into(),
            detail: "1 Keji Road".into(),
            created_at: Utc::now(),
        };
        assert_eq!(addr.full_address(), "Guangdong Shenzhen 1 Keji Road");
    }
}
