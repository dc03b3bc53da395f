//! # Order Creation
//!
//! Turns a validated cart into a persisted order with reserved stock.
//!
//! ## Creation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Shape validation        (pure, no I/O)                              │
//! │  2. Resolve address         (must belong to the buyer)                  │
//! │  3. Resolve items           (config on-shelf, round open, price)        │
//! │  4. Quote discounts         (whole-set accept or reject)                │
//! │  ───────────── transaction opens ─────────────                          │
//! │  5. Reserve stock           (conditional UPDATE per line)               │
//! │  6. Insert order + items    (order_no retry on UNIQUE collision)        │
//! │  7. Mark coupons used       (status-guarded, records applied amount)    │
//! │  ───────────── commit ─────────────                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Pricing runs before the transaction opens: a rejected coupon set never
//! touches stock. Inside the transaction any failed step rolls everything
//! back, so a half-created order cannot exist.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use mall_core::{
    pricing::allocate_line_discounts, quote, validation, Money, Order, OrderDraftItem,
    OrderItem, OrderStatus, ProductConfig, SeckillRound, UserCoupon, ORDER_NO_MAX_ATTEMPTS,
    PAY_WINDOW_MINUTES,
};
use mall_db::repository::{coupon, order, stock};
use mall_db::DbError;

use crate::error::{OrderError, OrderResult};
use crate::OrderService;

// =============================================================================
// Request DTO
// =============================================================================

/// A create-order request, as the storefront submits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub address_id: String,
    pub items: Vec<OrderDraftItem>,
    /// User-coupon ids to apply; empty means no discount.
    #[serde(default)]
    pub coupon_ids: Vec<String>,
}

/// One resolved cart line: the draft plus its catalog lookups and unit price.
struct ResolvedLine {
    draft: OrderDraftItem,
    config: ProductConfig,
    product_name: String,
    round: Option<SeckillRound>,
    unit_price: Money,
}

impl ResolvedLine {
    fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.draft.quantity)
    }
}

// =============================================================================
// Service
// =============================================================================

impl OrderService {
    /// Creates an order: validates, prices, reserves stock, persists.
    ///
    /// Returns the created order in `PendingPayment` with a 30-minute
    /// payment deadline.
    pub async fn create_order(&self, req: CreateOrderRequest) -> OrderResult<Order> {
        // -- 1. Shape validation (no I/O) ------------------------------------
        validation::validate_items(&req.items)?;
        validation::validate_instrument_ids(&req.coupon_ids)?;

        let is_seckill = req.items.iter().any(|i| i.seckill_round_id.is_some());
        if is_seckill {
            validation::validate_seckill_shape(&req.items)?;
            if !req.coupon_ids.is_empty() {
                return Err(OrderError::DiscountConflict {
                    reason: "seckill orders accept no discount instruments".to_string(),
                });
            }
        }

        let now = Utc::now();

        // -- 2. Resolve the shipping address ---------------------------------
        let address = self
            .db
            .catalog()
            .get_address_for_user(&req.address_id, &req.user_id)
            .await?
            .ok_or_else(|| OrderError::AddressNotFound {
                address_id: req.address_id.clone(),
            })?;

        // -- 3. Resolve items against the catalog ----------------------------
        let mut lines = Vec::with_capacity(req.items.len());
        for item in &req.items {
            lines.push(self.resolve_line(item, now).await?);
        }

        let subtotal = lines
            .iter()
            .fold(Money::zero(), |acc, line| acc + line.line_total());

        // -- 4. Load coupons and quote the discount --------------------------
        let coupons = self.load_coupons(&req.coupon_ids, &req.user_id).await?;
        let price = quote(subtotal, &coupons, now)?;

        let line_totals: Vec<i64> = lines.iter().map(|l| l.line_total().cents()).collect();
        let line_discounts = allocate_line_discounts(&line_totals, price.discount_cents);

        // -- 5..7. One transaction: reserve, insert, mark --------------------
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        for line in &lines {
            let reserved = match &line.round {
                Some(round) => {
                    stock::try_reserve_seckill(&mut tx, &round.id, line.draft.quantity).await?
                }
                None => {
                    stock::try_reserve_regular(&mut tx, &line.config.id, line.draft.quantity)
                        .await?
                }
            };
            if !reserved {
                return match &line.round {
                    Some(round) => Err(OrderError::seckill_unavailable(format!(
                        "round '{}' is sold out",
                        round.id
                    ))),
                    None => Err(OrderError::InsufficientStock {
                        config_id: line.config.id.clone(),
                    }),
                };
            }
        }

        let order = self
            .insert_order_with_retry(&mut tx, &req, &address.full_address(), &address, &price, now)
            .await?;

        for (line, discount) in lines.iter().zip(line_discounts.iter()) {
            let item = OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                product_id: line.config.product_id.clone(),
                config_id: line.config.id.clone(),
                name_snapshot: line.product_name.clone(),
                config_snapshot: line.config.name.clone(),
                unit_price_cents: line.unit_price.cents(),
                quantity: line.draft.quantity,
                discount_cents: *discount,
                is_seckill: line.round.is_some(),
                seckill_round_id: line.round.as_ref().map(|r| r.id.clone()),
                created_at: now,
            };
            order::insert_item(&mut tx, &item).await?;
        }

        for applied in &price.applied {
            coupon::mark_used(
                &mut tx,
                &applied.user_coupon_id,
                &order.id,
                applied.amount_cents,
                now,
            )
            .await?;
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order.id,
            order_no = %order.order_no,
            user_id = %order.user_id,
            payable = order.actual_pay_amount_cents,
            "order created"
        );

        Ok(order)
    }

    /// Resolves one draft line: config must exist and be on shelf, a seckill
    /// line's round must exist, match the config, and be open.
    async fn resolve_line(
        &self,
        item: &OrderDraftItem,
        now: chrono::DateTime<Utc>,
    ) -> OrderResult<ResolvedLine> {
        let config = self
            .db
            .catalog()
            .get_config(&item.config_id)
            .await?
            .filter(|c| c.on_shelf && c.product_id == item.product_id)
            .ok_or_else(|| {
                OrderError::product_unavailable(format!(
                    "config '{}' is missing or off shelf",
                    item.config_id
                ))
            })?;

        let product = self
            .db
            .catalog()
            .get_product(&config.product_id)
            .await?
            .filter(|p| p.on_shelf)
            .ok_or_else(|| {
                OrderError::product_unavailable(format!(
                    "product '{}' is missing or off shelf",
                    config.product_id
                ))
            })?;

        let (round, unit_price) = match &item.seckill_round_id {
            Some(round_id) => {
                let round = self
                    .db
                    .stock()
                    .get_seckill_round(round_id)
                    .await?
                    .filter(|r| r.config_id == item.config_id)
                    .ok_or_else(|| {
                        OrderError::seckill_unavailable(format!(
                            "round '{round_id}' does not exist for this config"
                        ))
                    })?;
                if !round.is_open(now) {
                    return Err(OrderError::seckill_unavailable(format!(
                        "round '{round_id}' is not open"
                    )));
                }
                let price = round.seckill_price();
                (Some(round), price)
            }
            None => (None, config.sale_price()),
        };

        Ok(ResolvedLine {
            draft: item.clone(),
            config,
            product_name: product.name,
            round,
            unit_price,
        })
    }

    /// Loads the requested user coupons; a missing id rejects the request.
    async fn load_coupons(
        &self,
        coupon_ids: &[String],
        user_id: &str,
    ) -> OrderResult<Vec<UserCoupon>> {
        let mut coupons = Vec::with_capacity(coupon_ids.len());
        for id in coupon_ids {
            let coupon = self.db.coupons().get_for_user(id, user_id).await?.ok_or_else(|| {
                OrderError::DiscountConflict {
                    reason: format!("coupon '{id}' does not exist for this user"),
                }
            })?;
            coupons.push(coupon);
        }
        Ok(coupons)
    }

    /// Inserts the order row, regenerating the business number on a UNIQUE
    /// collision. Bounded by [`ORDER_NO_MAX_ATTEMPTS`].
    async fn insert_order_with_retry(
        &self,
        conn: &mut sqlx::SqliteConnection,
        req: &CreateOrderRequest,
        receiver_address: &str,
        address: &mall_core::Address,
        price: &mall_core::PriceQuote,
        now: chrono::DateTime<Utc>,
    ) -> OrderResult<Order> {
        let mut last_err = None;

        for attempt in 0..ORDER_NO_MAX_ATTEMPTS {
            let order = Order {
                id: Uuid::new_v4().to_string(),
                order_no: generate_order_no(now),
                user_id: req.user_id.clone(),
                status: OrderStatus::PendingPayment,
                pay_amount_cents: price.subtotal_cents,
                actual_pay_amount_cents: price.payable_cents,
                discount_cents: price.discount_cents,
                receiver_name: address.receiver_name.clone(),
                receiver_phone: address.receiver_phone.clone(),
                receiver_address: receiver_address.to_string(),
                pay_limit_time: now + Duration::minutes(PAY_WINDOW_MINUTES),
                pay_time: None,
                cancel_time: None,
                receive_time: None,
                visible: true,
                created_at: now,
                updated_at: now,
            };

            match order::insert_order(conn, &order).await {
                Ok(()) => return Ok(order),
                Err(err) if err.is_unique_violation() => {
                    warn!(attempt, order_no = %order.order_no, "order number collision");
                    last_err = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(last_err
            .map(OrderError::from)
            .unwrap_or_else(|| {
                OrderError::Db(DbError::Internal(
                    "order number retry loop exhausted".to_string(),
                ))
            }))
    }
}

/// Builds a business order number: second-resolution timestamp plus a random
/// six-digit suffix. Collisions are possible; the UNIQUE constraint plus the
/// caller's retry make them harmless.
fn generate_order_no(now: chrono::DateTime<Utc>) -> String {
    let suffix = (Uuid::new_v4().as_u128() % 1_000_000) as u32;
    format!("{}{:06}", now.format("%Y%m%d%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_no_shape() {
        let now = Utc::now();
        let no = generate_order_no(now);
        assert_eq!(no.len(), 20);
        assert!(no.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_order_no_varies() {
        let now = Utc::now();
        // The random suffix makes immediate collisions unlikely
        let a = generate_order_no(now);
        let b = generate_order_no(now);
        let c = generate_order_no(now);
        assert!(a != b || b != c);
    }
}
