//! # Fulfillment Lifecycle
//!
//! Post-payment status movement. Every call moves exactly one adjacent step:
//!
//! ```text
//!   Paid → PendingShip → Shipped → PendingReceive → Received
//! ```
//!
//! Skipping a stage is rejected by the status guard; the chain itself comes
//! from [`OrderStatus::next_fulfillment_stage`].

use chrono::Utc;
use tracing::info;

use mall_core::OrderStatus;
use mall_db::repository::order;
use mall_db::DbError;

use crate::error::{OrderError, OrderResult};
use crate::OrderService;

impl OrderService {
    /// Moves a paid order one step along the fulfillment chain
    /// (operator/warehouse action). Returns the status it moved to.
    pub async fn advance_shipment(&self, order_id: &str) -> OrderResult<OrderStatus> {
        let existing = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        let next = existing
            .status
            .next_fulfillment_stage()
            .ok_or_else(|| OrderError::invalid_transition(order_id, existing.status.as_str()))?;

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        let moved =
            order::advance_status(&mut tx, order_id, existing.status, next, Utc::now()).await?;
        if !moved {
            return Err(OrderError::invalid_transition(order_id, "moved concurrently"));
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(order_id, to = next.as_str(), "shipment advanced");
        Ok(next)
    }

    /// Buyer confirms delivery: PendingReceive → Received.
    pub async fn mark_received(&self, order_id: &str, user_id: &str) -> OrderResult<()> {
        let existing = self
            .db
            .orders()
            .get_for_user(order_id, user_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        let moved = order::mark_received(&mut tx, order_id, user_id, Utc::now()).await?;
        if !moved {
            return Err(OrderError::invalid_transition(
                order_id,
                existing.status.as_str(),
            ));
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(order_id, user_id, "order received");
        Ok(())
    }

    /// Hides a finished or unpaid order from the buyer's listings. Rows are
    /// kept; only `visible` flips.
    pub async fn delete_order(&self, order_id: &str, user_id: &str) -> OrderResult<()> {
        let existing = self
            .db
            .orders()
            .get_for_user(order_id, user_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if !existing.status.can_soft_delete() {
            return Err(OrderError::invalid_transition(
                order_id,
                existing.status.as_str(),
            ));
        }

        let hidden = self.db.orders().soft_delete(order_id, user_id).await?;
        if !hidden {
            return Err(OrderError::invalid_transition(order_id, "moved concurrently"));
        }

        info!(order_id, user_id, "order hidden");
        Ok(())
    }
}
