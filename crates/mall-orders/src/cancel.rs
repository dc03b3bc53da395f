//! # Order Cancellation
//!
//! Three entry points share one unpaid-cancel core:
//!
//! - `cancel_order`: the buyer backs out of an unpaid order
//! - `cancel_expired_order`: a sweeper reaps orders past their deadline
//! - `admin_cancel_order`: an operator voids a *paid* order
//!
//! ## Serialization Against Settlement
//! The status-guarded `UPDATE ... WHERE status = 'pending_payment'` runs
//! first inside the transaction. If settlement won the race the guard sees
//! zero rows and the cancel fails cleanly; reservations are only released
//! after the guard succeeds, so stock can never be released twice.
//!
//! Admin cancel of a paid order goes the other direction: committed stock is
//! restored, coupon marks reverted, and voucher usage refunded.

use chrono::Utc;
use tracing::info;

use mall_core::OrderStatus;
use mall_db::repository::{coupon, order, stock, voucher};
use mall_db::DbError;

use crate::error::{OrderError, OrderResult};
use crate::OrderService;

impl OrderService {
    /// Cancels an unpaid order on the buyer's behalf.
    pub async fn cancel_order(&self, order_id: &str, user_id: &str) -> OrderResult<()> {
        let existing = self
            .db
            .orders()
            .get_for_user(order_id, user_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if !existing.status.user_can_cancel() {
            return Err(OrderError::invalid_transition(
                order_id,
                existing.status.as_str(),
            ));
        }

        self.cancel_unpaid(order_id).await
    }

    /// Sweeper entry point: cancels an unpaid order whose payment deadline
    /// has passed. Refuses orders still inside their window.
    pub async fn cancel_expired_order(&self, order_id: &str) -> OrderResult<()> {
        let existing = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if !existing.status.user_can_cancel() {
            return Err(OrderError::invalid_transition(
                order_id,
                existing.status.as_str(),
            ));
        }
        if !existing.is_pay_expired(Utc::now()) {
            return Err(OrderError::invalid_transition(order_id, "inside pay window"));
        }

        self.cancel_unpaid(order_id).await
    }

    /// Operator path: voids a paid order. Restores committed stock, reverts
    /// coupon marks, and refunds any voucher amount spent on the order.
    pub async fn admin_cancel_order(&self, order_id: &str) -> OrderResult<()> {
        let existing = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if !existing.status.admin_can_cancel() {
            return Err(OrderError::invalid_transition(
                order_id,
                existing.status.as_str(),
            ));
        }

        let items = self.db.orders().get_items(order_id).await?;
        let now = Utc::now();

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        // Guard first: a concurrent transition loses or wins here, never both.
        let cancelled = order::mark_cancelled(&mut tx, order_id, OrderStatus::Paid, now).await?;
        if !cancelled {
            return Err(OrderError::invalid_transition(order_id, "moved concurrently"));
        }

        for item in &items {
            match &item.seckill_round_id {
                Some(round_id) => stock::restore_seckill(&mut tx, round_id, item.quantity).await?,
                None => stock::restore_regular(&mut tx, &item.config_id, item.quantity).await?,
            }
        }

        coupon::revert_for_order(&mut tx, order_id).await?;
        let refunded = voucher::refund_for_order(&mut tx, order_id, now).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(order_id, refunded_cents = refunded, "paid order cancelled by admin");
        Ok(())
    }

    /// Shared unpaid-cancel core: guard the status, release reservations,
    /// revert coupon marks, all in one transaction.
    async fn cancel_unpaid(&self, order_id: &str) -> OrderResult<()> {
        let items = self.db.orders().get_items(order_id).await?;
        let now = Utc::now();

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let cancelled =
            order::mark_cancelled(&mut tx, order_id, OrderStatus::PendingPayment, now).await?;
        if !cancelled {
            // Settlement (or another cancel) got there first
            return Err(OrderError::invalid_transition(order_id, "moved concurrently"));
        }

        for item in &items {
            match &item.seckill_round_id {
                Some(round_id) => stock::release_seckill(&mut tx, round_id, item.quantity).await?,
                None => stock::release_regular(&mut tx, &item.config_id, item.quantity).await?,
            }
        }

        coupon::revert_for_order(&mut tx, order_id).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(order_id, "unpaid order cancelled");
        Ok(())
    }
}
