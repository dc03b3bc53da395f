//! # Order Queries
//!
//! Read-only surface: detail, listing, and per-status stats. All reads are
//! scoped to the requesting user; an order owned by someone else reads as
//! not-found rather than forbidden, so ids cannot be probed.

use serde::{Deserialize, Serialize};

use mall_core::{Order, OrderItem, OrderStatus};

use crate::error::{OrderError, OrderResult};
use crate::OrderService;

// =============================================================================
// DTOs
// =============================================================================

/// An order with its line items, as the storefront renders it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Listing filter. Defaults to the first page of all visible orders.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersFilter {
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub page: u32,
    /// Page size; zero falls back to [`DEFAULT_PAGE_SIZE`].
    #[serde(default)]
    pub page_size: u32,
}

/// Default listing page size.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Maximum listing page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Per-status order counts for the "my orders" badges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub pending_payment: i64,
    pub paid: i64,
    pub pending_ship: i64,
    pub shipped: i64,
    pub pending_receive: i64,
    pub received: i64,
    pub cancelled: i64,
    pub total: i64,
}

// =============================================================================
// Service
// =============================================================================

impl OrderService {
    /// Full detail of one order, items included.
    pub async fn order_detail(&self, order_id: &str, user_id: &str) -> OrderResult<OrderDetail> {
        let order = self
            .db
            .orders()
            .get_for_user(order_id, user_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        let items = self.db.orders().get_items(order_id).await?;

        Ok(OrderDetail { order, items })
    }

    /// A page of the user's visible orders, newest first.
    pub async fn list_orders(
        &self,
        user_id: &str,
        filter: ListOrdersFilter,
    ) -> OrderResult<Vec<Order>> {
        let page_size = match filter.page_size {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };
        let offset = i64::from(filter.page) * i64::from(page_size);

        let orders = self
            .db
            .orders()
            .list_for_user(user_id, filter.status, i64::from(page_size), offset)
            .await?;

        Ok(orders)
    }

    /// Per-status counts across the user's visible orders.
    pub async fn order_stats(&self, user_id: &str) -> OrderResult<OrderStats> {
        let counts = self.db.orders().status_counts(user_id).await?;

        let mut stats = OrderStats::default();
        for (status, count) in counts {
            match status {
                OrderStatus::PendingPayment => stats.pending_payment = count,
                OrderStatus::Paid => stats.paid = count,
                OrderStatus::PendingShip => stats.pending_ship = count,
                OrderStatus::Shipped => stats.shipped = count,
                OrderStatus::PendingReceive => stats.pending_receive = count,
                OrderStatus::Received => stats.received = count,
                OrderStatus::Cancelled => stats.cancelled = count,
            }
            stats.total += count;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults() {
        let filter: ListOrdersFilter = serde_json::from_str("{}").unwrap();
        assert!(filter.status.is_none());
        assert_eq!(filter.page, 0);
        assert_eq!(filter.page_size, 0); // resolved to DEFAULT_PAGE_SIZE at query time
    }

    #[test]
    fn test_filter_parses_status() {
        let filter: ListOrdersFilter =
            serde_json::from_str(r#"{"status":"pending_payment","page":2,"pageSize":10}"#).unwrap();
        assert_eq!(filter.status, Some(OrderStatus::PendingPayment));
        assert_eq!(filter.page, 2);
        assert_eq!(filter.page_size, 10);
    }
}
