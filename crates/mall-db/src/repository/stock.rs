//! # Stock Ledger Repository
//!
//! Atomic reserve/release/commit operations for both stock pools.
//!
//! ## The One Rule That Matters
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NEVER read-then-write stock.                                           │
//! │                                                                         │
//! │  BAD (oversells under concurrency):                                     │
//! │    let s = SELECT shelf_num, lock_num ...;                              │
//! │    if s.available() >= qty { UPDATE ... SET lock_num = <computed> }     │
//! │                                                                         │
//! │  GOOD (single conditional update, the check and the increment are      │
//! │  one atomic statement):                                                 │
//! │    UPDATE stock SET lock_num = lock_num + ?                             │
//! │    WHERE config_id = ? AND lock_num + ? <= shelf_num                   │
//! │    → rows_affected == 0 means insufficient stock                        │
//! │                                                                         │
//! │  Every mutation is a relative delta, never an absolute overwrite.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Unit Movement
//! ```text
//! regular pool:   available = shelf_num − lock_num
//! seckill pool:   available = remain_num − lock_num
//!
//!   reserve:  lock_num += qty           (order creation)
//!   release:  lock_num -= qty           (cancel before payment)
//!   commit:   shelf/remain -= qty,      (settlement: reserved → sold)
//!             lock_num  -= qty
//!   restore:  shelf/remain += qty       (admin cancel after payment)
//! ```
//! Both pools decrement their permanent counter only at commit; reservation
//! moves `lock_num` alone.
//!
//! The mutating functions take `&mut SqliteConnection` so the service layer
//! can compose them into one transaction with order persistence and
//! instrument marking.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use mall_core::{SeckillRound, StockEntry};

// =============================================================================
// Read Access
// =============================================================================

/// Repository for stock-pool reads and admin-boundary setup.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Gets the regular stock entry for a configuration.
    pub async fn get_stock(&self, config_id: &str) -> DbResult<Option<StockEntry>> {
        let entry = sqlx::query_as::<_, StockEntry>(
            r#"
            SELECT config_id, shelf_num, lock_num
            FROM stock
            WHERE config_id = ?1
            "#,
        )
        .bind(config_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Gets a seckill round by id.
    pub async fn get_seckill_round(&self, round_id: &str) -> DbResult<Option<SeckillRound>> {
        let round = sqlx::query_as::<_, SeckillRound>(
            r#"
            SELECT id, config_id, seckill_price_cents,
                   shelf_num, remain_num, lock_num,
                   start_time, end_time
            FROM seckill_rounds
            WHERE id = ?1
            "#,
        )
        .bind(round_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(round)
    }

    /// Creates a regular stock entry for a configuration.
    ///
    /// Admin-boundary operation (shelf management is an external
    /// collaborator); used by the seed binary and tests.
    pub async fn create_stock(&self, config_id: &str, shelf_num: i64) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock (config_id, shelf_num, lock_num)
            VALUES (?1, ?2, 0)
            "#,
        )
        .bind(config_id)
        .bind(shelf_num)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Creates a seckill round. Admin-boundary operation.
    pub async fn create_seckill_round(&self, round: &SeckillRound) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO seckill_rounds (
                id, config_id, seckill_price_cents,
                shelf_num, remain_num, lock_num,
                start_time, end_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&round.id)
        .bind(&round.config_id)
        .bind(round.seckill_price_cents)
        .bind(round.shelf_num)
        .bind(round.remain_num)
        .bind(round.lock_num)
        .bind(round.start_time)
        .bind(round.end_time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Transaction-Scoped Ledger Mutations
// =============================================================================

/// Attempts to reserve `qty` units of regular stock.
///
/// Returns `false` when the configuration has fewer than `qty` units
/// available (or no stock row at all); the caller's transaction must then
/// roll back so the batch fails whole with no partial reservation.
pub async fn try_reserve_regular(
    conn: &mut SqliteConnection,
    config_id: &str,
    qty: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE stock
        SET lock_num = lock_num + ?1
        WHERE config_id = ?2 AND lock_num + ?1 <= shelf_num
        "#,
    )
    .bind(qty)
    .bind(config_id)
    .execute(conn)
    .await?;

    let reserved = result.rows_affected() == 1;
    debug!(config_id, qty, reserved, "reserve regular stock");
    Ok(reserved)
}

/// Attempts to reserve `qty` units of seckill-round stock.
pub async fn try_reserve_seckill(
    conn: &mut SqliteConnection,
    round_id: &str,
    qty: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE seckill_rounds
        SET lock_num = lock_num + ?1
        WHERE id = ?2 AND lock_num + ?1 <= remain_num
        "#,
    )
    .bind(qty)
    .bind(round_id)
    .execute(conn)
    .await?;

    let reserved = result.rows_affected() == 1;
    debug!(round_id, qty, reserved, "reserve seckill stock");
    Ok(reserved)
}

/// Releases a regular-stock reservation (cancel before payment).
///
/// Guarded by `lock_num >= qty`; the status-guarded cancel transition
/// upstream guarantees this runs at most once per order.
pub async fn release_regular(
    conn: &mut SqliteConnection,
    config_id: &str,
    qty: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE stock
        SET lock_num = lock_num - ?1
        WHERE config_id = ?2 AND lock_num >= ?1
        "#,
    )
    .bind(qty)
    .bind(config_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::StockUnderflow {
            config_id: config_id.to_string(),
        });
    }

    debug!(config_id, qty, "released regular stock");
    Ok(())
}

/// Releases a seckill-round reservation (cancel before payment).
pub async fn release_seckill(
    conn: &mut SqliteConnection,
    round_id: &str,
    qty: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE seckill_rounds
        SET lock_num = lock_num - ?1
        WHERE id = ?2 AND lock_num >= ?1
        "#,
    )
    .bind(qty)
    .bind(round_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::StockUnderflow {
            config_id: round_id.to_string(),
        });
    }

    debug!(round_id, qty, "released seckill stock");
    Ok(())
}

/// Converts a regular-stock reservation into permanent consumption
/// (settlement only): the unit moves from "reserved" to "sold".
pub async fn commit_regular(
    conn: &mut SqliteConnection,
    config_id: &str,
    qty: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE stock
        SET shelf_num = shelf_num - ?1,
            lock_num = lock_num - ?1
        WHERE config_id = ?2 AND lock_num >= ?1
        "#,
    )
    .bind(qty)
    .bind(config_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::StockUnderflow {
            config_id: config_id.to_string(),
        });
    }

    debug!(config_id, qty, "committed regular stock");
    Ok(())
}

/// Converts a seckill-round reservation into permanent consumption
/// (settlement only).
pub async fn commit_seckill(
    conn: &mut SqliteConnection,
    round_id: &str,
    qty: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE seckill_rounds
        SET remain_num = remain_num - ?1,
            lock_num = lock_num - ?1
        WHERE id = ?2 AND lock_num >= ?1
        "#,
    )
    .bind(qty)
    .bind(round_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::StockUnderflow {
            config_id: round_id.to_string(),
        });
    }

    debug!(round_id, qty, "committed seckill stock");
    Ok(())
}

/// Returns sold units to the regular pool (admin cancel after payment).
pub async fn restore_regular(
    conn: &mut SqliteConnection,
    config_id: &str,
    qty: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE stock
        SET shelf_num = shelf_num + ?1
        WHERE config_id = ?2
        "#,
    )
    .bind(qty)
    .bind(config_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Stock", config_id));
    }

    debug!(config_id, qty, "restored regular stock");
    Ok(())
}

/// Returns sold units to the seckill pool (admin cancel after payment).
pub async fn restore_seckill(
    conn: &mut SqliteConnection,
    round_id: &str,
    qty: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE seckill_rounds
        SET remain_num = remain_num + ?1
        WHERE id = ?2
        "#,
    )
    .bind(qty)
    .bind(round_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("SeckillRound", round_id));
    }

    debug!(round_id, qty, "restored seckill stock");
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{Duration, Utc};
    use mall_core::{Product, ProductConfig};

    async fn db_with_config(shelf: i64) -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();

        let product = Product {
            id: "p1".into(),
            name: "Tea".into(),
            on_shelf: true,
            created_at: now,
            updated_at: now,
        };
        db.catalog().create_product(&product).await.unwrap();

        let config = ProductConfig {
            id: "c1".into(),
            product_id: "p1".into(),
            name: "500ml".into(),
            sale_price_cents: 500,
            on_shelf: true,
        };
        db.catalog().create_config(&config).await.unwrap();

        db.stock().create_stock("c1", shelf).await.unwrap();
        (db, "c1".to_string())
    }

    #[tokio::test]
    async fn test_reserve_until_exhausted() {
        let (db, config_id) = db_with_config(3).await;
        let mut tx = db.pool().begin().await.unwrap();

        assert!(try_reserve_regular(&mut tx, &config_id, 2).await.unwrap());
        assert!(try_reserve_regular(&mut tx, &config_id, 1).await.unwrap());
        // Pool is fully locked now
        assert!(!try_reserve_regular(&mut tx, &config_id, 1).await.unwrap());
        tx.commit().await.unwrap();

        let stock = db.stock().get_stock(&config_id).await.unwrap().unwrap();
        assert_eq!(stock.shelf_num, 3);
        assert_eq!(stock.lock_num, 3);
        assert_eq!(stock.available(), 0);
    }

    #[tokio::test]
    async fn test_reserve_unknown_config_is_insufficient() {
        let (db, _) = db_with_config(3).await;
        let mut tx = db.pool().begin().await.unwrap();

        assert!(!try_reserve_regular(&mut tx, "missing", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_restores_availability() {
        let (db, config_id) = db_with_config(5).await;
        let mut tx = db.pool().begin().await.unwrap();

        assert!(try_reserve_regular(&mut tx, &config_id, 4).await.unwrap());
        release_regular(&mut tx, &config_id, 4).await.unwrap();
        tx.commit().await.unwrap();

        let stock = db.stock().get_stock(&config_id).await.unwrap().unwrap();
        assert_eq!(stock.lock_num, 0);
        assert_eq!(stock.available(), 5);
    }

    #[tokio::test]
    async fn test_release_underflow_guard() {
        let (db, config_id) = db_with_config(5).await;
        let mut tx = db.pool().begin().await.unwrap();

        assert!(try_reserve_regular(&mut tx, &config_id, 1).await.unwrap());
        let err = release_regular(&mut tx, &config_id, 2).await.unwrap_err();
        assert!(matches!(err, DbError::StockUnderflow { .. }));
    }

    #[tokio::test]
    async fn test_commit_moves_reserved_to_sold() {
        let (db, config_id) = db_with_config(5).await;
        let mut tx = db.pool().begin().await.unwrap();

        assert!(try_reserve_regular(&mut tx, &config_id, 2).await.unwrap());
        commit_regular(&mut tx, &config_id, 2).await.unwrap();
        tx.commit().await.unwrap();

        let stock = db.stock().get_stock(&config_id).await.unwrap().unwrap();
        assert_eq!(stock.shelf_num, 3);
        assert_eq!(stock.lock_num, 0);
        assert_eq!(stock.available(), 3);
    }

    #[tokio::test]
    async fn test_seckill_pool_cycle() {
        let (db, config_id) = db_with_config(1).await;
        let now = Utc::now();
        let round = SeckillRound {
            id: "r1".into(),
            config_id,
            seckill_price_cents: 99,
            shelf_num: 10,
            remain_num: 10,
            lock_num: 0,
            start_time: now - Duration::hours(1),
            end_time: now + Duration::hours(1),
        };
        db.stock().create_seckill_round(&round).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert!(try_reserve_seckill(&mut tx, "r1", 1).await.unwrap());
        commit_seckill(&mut tx, "r1", 1).await.unwrap();
        tx.commit().await.unwrap();

        let round = db.stock().get_seckill_round("r1").await.unwrap().unwrap();
        // The allotment never changes; remain drops only at commit
        assert_eq!(round.shelf_num, 10);
        assert_eq!(round.remain_num, 9);
        assert_eq!(round.lock_num, 0);
    }

    #[tokio::test]
    async fn test_seckill_reserve_bounded_by_remain() {
        let (db, config_id) = db_with_config(1).await;
        let now = Utc::now();
        let round = SeckillRound {
            id: "r2".into(),
            config_id,
            seckill_price_cents: 99,
            shelf_num: 10,
            remain_num: 2,
            lock_num: 0,
            start_time: now,
            end_time: now + Duration::hours(1),
        };
        db.stock().create_seckill_round(&round).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert!(try_reserve_seckill(&mut tx, "r2", 2).await.unwrap());
        // shelf_num still has headroom but remain_num is the bound
        assert!(!try_reserve_seckill(&mut tx, "r2", 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_restore_after_commit() {
        let (db, config_id) = db_with_config(5).await;
        let mut tx = db.pool().begin().await.unwrap();

        assert!(try_reserve_regular(&mut tx, &config_id, 2).await.unwrap());
        commit_regular(&mut tx, &config_id, 2).await.unwrap();
        restore_regular(&mut tx, &config_id, 2).await.unwrap();
        tx.commit().await.unwrap();

        let stock = db.stock().get_stock(&config_id).await.unwrap().unwrap();
        assert_eq!(stock.shelf_num, 5);
        assert_eq!(stock.available(), 5);
    }
}
