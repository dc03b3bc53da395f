//! # Order Repository
//!
//! Persistence for orders and their line items.
//!
//! ## Guarded Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every status change is a conditional update:                           │
//! │                                                                         │
//! │    UPDATE orders SET status = <to>, ... WHERE id = ? AND status = <from>│
//! │                                                                         │
//! │  rows_affected == 0 means the order moved under us (or never existed).  │
//! │  Performed inside the caller's transaction, this is the serialization   │
//! │  point between cancellation and settlement: an order can never be both. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use mall_core::{Order, OrderItem, OrderStatus};

/// Repository for order reads and standalone mutations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

const ORDER_COLUMNS: &str = r#"
    id, order_no, user_id, status,
    pay_amount_cents, actual_pay_amount_cents, discount_cents,
    receiver_name, receiver_phone, receiver_address,
    pay_limit_time, pay_time, cancel_time, receive_time,
    visible, created_at, updated_at
"#;

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Gets an order by ID, scoped to its owning user.
    pub async fn get_for_user(&self, id: &str, user_id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1 AND user_id = ?2");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Gets all items for an order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, config_id,
                   name_snapshot, config_snapshot,
                   unit_price_cents, quantity, discount_cents,
                   is_seckill, seckill_round_id, created_at
            FROM order_items
            WHERE order_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists a user's visible orders, newest first, optionally filtered by
    /// status.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<Order>> {
        let orders = match status {
            Some(status) => {
                let sql = format!(
                    r#"
                    SELECT {ORDER_COLUMNS} FROM orders
                    WHERE user_id = ?1 AND visible = 1 AND status = ?2
                    ORDER BY created_at DESC
                    LIMIT ?3 OFFSET ?4
                    "#
                );
                sqlx::query_as::<_, Order>(&sql)
                    .bind(user_id)
                    .bind(status)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    r#"
                    SELECT {ORDER_COLUMNS} FROM orders
                    WHERE user_id = ?1 AND visible = 1
                    ORDER BY created_at DESC
                    LIMIT ?2 OFFSET ?3
                    "#
                );
                sqlx::query_as::<_, Order>(&sql)
                    .bind(user_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(orders)
    }

    /// Per-status counts of a user's visible orders.
    pub async fn status_counts(&self, user_id: &str) -> DbResult<Vec<(OrderStatus, i64)>> {
        let counts = sqlx::query_as::<_, (OrderStatus, i64)>(
            r#"
            SELECT status, COUNT(*)
            FROM orders
            WHERE user_id = ?1 AND visible = 1
            GROUP BY status
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }

    /// Soft-deletes an order (hides it from listings; rows are never
    /// hard-deleted). Allowed only from PendingPayment, Cancelled, Received.
    pub async fn soft_delete(&self, order_id: &str, user_id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET visible = 0, updated_at = ?1
            WHERE id = ?2 AND user_id = ?3 AND visible = 1
              AND status IN ('pending_payment', 'cancelled', 'received')
            "#,
        )
        .bind(Utc::now())
        .bind(order_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Transaction-Scoped Mutations
// =============================================================================

/// Inserts an order row.
///
/// A UNIQUE violation on `order_no` bubbles up as
/// [`crate::error::DbError::UniqueViolation`]; the creator regenerates the
/// number and retries inside the same transaction.
pub async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    debug!(id = %order.id, order_no = %order.order_no, "inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_no, user_id, status,
            pay_amount_cents, actual_pay_amount_cents, discount_cents,
            receiver_name, receiver_phone, receiver_address,
            pay_limit_time, pay_time, cancel_time, receive_time,
            visible, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7,
            ?8, ?9, ?10,
            ?11, ?12, ?13, ?14,
            ?15, ?16, ?17
        )
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_no)
    .bind(&order.user_id)
    .bind(order.status)
    .bind(order.pay_amount_cents)
    .bind(order.actual_pay_amount_cents)
    .bind(order.discount_cents)
    .bind(&order.receiver_name)
    .bind(&order.receiver_phone)
    .bind(&order.receiver_address)
    .bind(order.pay_limit_time)
    .bind(order.pay_time)
    .bind(order.cancel_time)
    .bind(order.receive_time)
    .bind(order.visible)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts an order line item with its snapshots.
pub async fn insert_item(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, product_id, config_id,
            name_snapshot, config_snapshot,
            unit_price_cents, quantity, discount_cents,
            is_seckill, seckill_round_id, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6,
            ?7, ?8, ?9,
            ?10, ?11, ?12
        )
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.product_id)
    .bind(&item.config_id)
    .bind(&item.name_snapshot)
    .bind(&item.config_snapshot)
    .bind(item.unit_price_cents)
    .bind(item.quantity)
    .bind(item.discount_cents)
    .bind(item.is_seckill)
    .bind(item.seckill_round_id.as_ref())
    .bind(item.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Loads an order inside a transaction (items come via the pool read since
/// they are immutable after creation).
pub async fn get_by_id_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(order)
}

/// Marks the order paid. Guarded on PendingPayment; returns `false` if the
/// order was not in that state (cancelled or already settled concurrently).
pub async fn mark_paid(
    conn: &mut SqliteConnection,
    order_id: &str,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = 'paid', pay_time = ?1, updated_at = ?1
        WHERE id = ?2 AND status = 'pending_payment'
        "#,
    )
    .bind(now)
    .bind(order_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Marks the order cancelled, guarded on the expected source status.
/// Returns `false` if the order was not in `from` (e.g. a second cancel).
pub async fn mark_cancelled(
    conn: &mut SqliteConnection,
    order_id: &str,
    from: OrderStatus,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = 'cancelled', cancel_time = ?1, updated_at = ?1
        WHERE id = ?2 AND status = ?3
        "#,
    )
    .bind(now)
    .bind(order_id)
    .bind(from)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Moves the order one adjacent step along the fulfillment chain.
/// Rejects (returns `false`) when the order is not exactly in `from`.
pub async fn advance_status(
    conn: &mut SqliteConnection,
    order_id: &str,
    from: OrderStatus,
    to: OrderStatus,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = ?1, updated_at = ?2
        WHERE id = ?3 AND status = ?4
        "#,
    )
    .bind(to)
    .bind(now)
    .bind(order_id)
    .bind(from)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Marks the order received by its buyer. Guarded on PendingReceive.
pub async fn mark_received(
    conn: &mut SqliteConnection,
    order_id: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = 'received', receive_time = ?1, updated_at = ?1
        WHERE id = ?2 AND user_id = ?3 AND status = 'pending_receive'
        "#,
    )
    .bind(now)
    .bind(order_id)
    .bind(user_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;

    fn sample_order(id: &str, order_no: &str, user_id: &str) -> Order {
        let now = Utc::now();
        Order {
            id: id.into(),
            order_no: order_no.into(),
            user_id: user_id.into(),
            status: OrderStatus::PendingPayment,
            pay_amount_cents: 1000,
            actual_pay_amount_cents: 900,
            discount_cents: 100,
            receiver_name: "Alice".into(),
            receiver_phone: "13800000000".into(),
            receiver_address: "Hubei Wuhan 1 Example Rd".into(),
            pay_limit_time: now + Duration::minutes(30),
            pay_time: None,
            cancel_time: None,
            receive_time: None,
            visible: true,
            created_at: now,
            updated_at: now,
        }
    }

    async fn insert(db: &Database, order: &Order) {
        let mut tx = db.pool().begin().await.unwrap();
        insert_order(&mut tx, order).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &sample_order("o1", "N1", "u1")).await;

        let loaded = db.orders().get_by_id("o1").await.unwrap().unwrap();
        assert_eq!(loaded.order_no, "N1");
        assert_eq!(loaded.status, OrderStatus::PendingPayment);
        assert_eq!(loaded.actual_pay_amount_cents, 900);

        // Scoped lookup rejects the wrong user
        assert!(db.orders().get_for_user("o1", "u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_order_no_is_unique_violation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &sample_order("o1", "N1", "u1")).await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = insert_order(&mut tx, &sample_order("o2", "N1", "u1"))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_mark_paid_guard() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &sample_order("o1", "N1", "u1")).await;

        let mut tx = db.pool().begin().await.unwrap();
        assert!(mark_paid(&mut tx, "o1", Utc::now()).await.unwrap());
        // Second settlement sees the status already moved
        assert!(!mark_paid(&mut tx, "o1", Utc::now()).await.unwrap());
        tx.commit().await.unwrap();

        let order = db.orders().get_by_id("o1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.pay_time.is_some());
    }

    #[tokio::test]
    async fn test_cancel_loses_to_settlement() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &sample_order("o1", "N1", "u1")).await;

        let mut tx = db.pool().begin().await.unwrap();
        assert!(mark_paid(&mut tx, "o1", Utc::now()).await.unwrap());
        assert!(!mark_cancelled(&mut tx, "o1", OrderStatus::PendingPayment, Utc::now())
            .await
            .unwrap());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_advance_rejects_non_adjacent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &sample_order("o1", "N1", "u1")).await;

        let mut tx = db.pool().begin().await.unwrap();
        assert!(mark_paid(&mut tx, "o1", Utc::now()).await.unwrap());

        // Paid -> Shipped skips PendingShip, guard refuses
        assert!(
            !advance_status(&mut tx, "o1", OrderStatus::PendingShip, OrderStatus::Shipped, Utc::now())
                .await
                .unwrap()
        );
        // The adjacent chain goes through
        assert!(
            advance_status(&mut tx, "o1", OrderStatus::Paid, OrderStatus::PendingShip, Utc::now())
                .await
                .unwrap()
        );
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_received_full_chain() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &sample_order("o1", "N1", "u1")).await;

        let mut tx = db.pool().begin().await.unwrap();
        let now = Utc::now();
        mark_paid(&mut tx, "o1", now).await.unwrap();
        advance_status(&mut tx, "o1", OrderStatus::Paid, OrderStatus::PendingShip, now)
            .await
            .unwrap();
        advance_status(&mut tx, "o1", OrderStatus::PendingShip, OrderStatus::Shipped, now)
            .await
            .unwrap();
        advance_status(&mut tx, "o1", OrderStatus::Shipped, OrderStatus::PendingReceive, now)
            .await
            .unwrap();
        assert!(mark_received(&mut tx, "o1", "u1", now).await.unwrap());
        tx.commit().await.unwrap();

        let order = db.orders().get_by_id("o1").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Received);
        assert!(order.receive_time.is_some());
    }

    #[tokio::test]
    async fn test_soft_delete_gated_by_status() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &sample_order("o1", "N1", "u1")).await;

        let mut tx = db.pool().begin().await.unwrap();
        mark_paid(&mut tx, "o1", Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        // Paid orders stay visible
        assert!(!db.orders().soft_delete("o1", "u1").await.unwrap());

        let mut tx = db.pool().begin().await.unwrap();
        let now = Utc::now();
        advance_status(&mut tx, "o1", OrderStatus::Paid, OrderStatus::PendingShip, now)
            .await
            .unwrap();
        advance_status(&mut tx, "o1", OrderStatus::PendingShip, OrderStatus::Shipped, now)
            .await
            .unwrap();
        advance_status(&mut tx, "o1", OrderStatus::Shipped, OrderStatus::PendingReceive, now)
            .await
            .unwrap();
        mark_received(&mut tx, "o1", "u1", now).await.unwrap();
        tx.commit().await.unwrap();

        assert!(db.orders().soft_delete("o1", "u1").await.unwrap());
        assert!(db
            .orders()
            .list_for_user("u1", None, 10, 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_list_filter_and_counts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        insert(&db, &sample_order("o1", "N1", "u1")).await;
        insert(&db, &sample_order("o2", "N2", "u1")).await;
        insert(&db, &sample_order("o3", "N3", "u2")).await;

        let mut tx = db.pool().begin().await.unwrap();
        mark_paid(&mut tx, "o2", Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        let pending = db
            .orders()
            .list_for_user("u1", Some(OrderStatus::PendingPayment), 10, 0)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "o1");

        let counts = db.orders().status_counts("u1").await.unwrap();
        assert_eq!(counts.len(), 2);
        assert!(counts.contains(&(OrderStatus::PendingPayment, 1)));
        assert!(counts.contains(&(OrderStatus::Paid, 1)));
    }
}
