//! # Settlement
//!
//! Pays a pending order from a stored-value voucher.
//!
//! ## Settlement Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Order:   belongs to buyer, PendingPayment, inside pay window        │
//! │  2. Voucher: belongs to buyer, active, inside validity window           │
//! │  3. Balance short?  →  InsufficientBalance outcome, nothing mutates     │
//! │  ───────────── transaction opens ─────────────                          │
//! │  4. Guarded order update   pending_payment → paid                       │
//! │  5. Conditional debit      remain_amount >= payable in the UPDATE       │
//! │  6. Usage row              exact amount, for later refunds              │
//! │  7. Commit stock           shelf/remain − q, lock − q per line          │
//! │  ───────────── commit ─────────────                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Step 4 is the same guard cancellation uses, so a cancel racing a payment
//! resolves to exactly one winner.

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use mall_core::OrderStatus;
use mall_db::repository::{order, stock, voucher};
use mall_db::DbError;

use crate::error::{OrderError, OrderResult};
use crate::OrderService;

/// Outcome of a settlement attempt.
///
/// A short balance is a business outcome the storefront renders ("top up
/// 3.50 more"), not an error; the order stays pending and nothing mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SettlementOutcome {
    /// The order is paid and its stock committed.
    #[serde(rename_all = "camelCase")]
    Paid { order_id: String, paid_cents: i64 },
    /// The voucher balance does not cover the payable amount.
    #[serde(rename_all = "camelCase")]
    InsufficientBalance {
        required_cents: i64,
        remain_cents: i64,
        shortfall_cents: i64,
    },
}

impl OrderService {
    /// Settles a pending order against one of the buyer's vouchers.
    pub async fn pay_with_voucher(
        &self,
        order_id: &str,
        voucher_id: &str,
        user_id: &str,
    ) -> OrderResult<SettlementOutcome> {
        let now = Utc::now();

        // -- 1. Order checks -------------------------------------------------
        let existing = self
            .db
            .orders()
            .get_for_user(order_id, user_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if existing.status != OrderStatus::PendingPayment {
            return Err(OrderError::invalid_transition(
                order_id,
                existing.status.as_str(),
            ));
        }
        if existing.is_pay_expired(now) {
            return Err(OrderError::OrderExpired {
                order_id: order_id.to_string(),
            });
        }

        // -- 2. Voucher checks -----------------------------------------------
        let voucher_row = self
            .db
            .vouchers()
            .get_for_user(voucher_id, user_id)
            .await?
            .ok_or_else(|| {
                OrderError::voucher_invalid(format!(
                    "voucher '{voucher_id}' does not exist for this user"
                ))
            })?;

        if !voucher_row.is_usable(now) {
            return Err(OrderError::voucher_invalid(format!(
                "voucher '{voucher_id}' is inactive or outside its validity window"
            )));
        }

        // -- 3. Balance check (read-only, pre-transaction) -------------------
        let required = existing.actual_pay_amount_cents;
        if voucher_row.remain_amount_cents < required {
            return Ok(SettlementOutcome::InsufficientBalance {
                required_cents: required,
                remain_cents: voucher_row.remain_amount_cents,
                shortfall_cents: required - voucher_row.remain_amount_cents,
            });
        }

        let items = self.db.orders().get_items(order_id).await?;

        // -- 4..7. One transaction -------------------------------------------
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let paid = order::mark_paid(&mut tx, order_id, now).await?;
        if !paid {
            // Cancel won the race
            return Err(OrderError::invalid_transition(order_id, "moved concurrently"));
        }

        if required > 0 {
            // The conditional UPDATE re-checks the balance; the pre-check
            // above only avoids opening a doomed transaction.
            let debited = voucher::try_debit(&mut tx, voucher_id, required, now).await?;
            if !debited {
                return Ok(SettlementOutcome::InsufficientBalance {
                    required_cents: required,
                    remain_cents: voucher_row.remain_amount_cents,
                    shortfall_cents: required - voucher_row.remain_amount_cents,
                });
            }

            voucher::record_usage(
                &mut tx,
                &Uuid::new_v4().to_string(),
                voucher_id,
                order_id,
                required,
                now,
            )
            .await?;
        }

        for item in &items {
            match &item.seckill_round_id {
                Some(round_id) => stock::commit_seckill(&mut tx, round_id, item.quantity).await?,
                None => stock::commit_regular(&mut tx, &item.config_id, item.quantity).await?,
            }
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(order_id, voucher_id, paid_cents = required, "order settled");

        Ok(SettlementOutcome::Paid {
            order_id: order_id.to_string(),
            paid_cents: required,
        })
    }
}
