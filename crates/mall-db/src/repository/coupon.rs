//! # Coupon Repository
//!
//! Persistence for coupon templates and per-user coupon instances.
//!
//! A user coupon row carries only ownership and redemption state; the
//! template (kind, amount, threshold, validity window) lives in `coupons`.
//! Reads join the two into [`UserCoupon`] so pricing never touches raw rows.
//!
//! ## Redemption Guards
//! Marking a coupon used and reverting that mark are both conditional
//! updates scoped to the caller's transaction. A coupon that is already
//! used, or whose validity lapsed between quoting and committing, fails
//! the guard and the whole order creation rolls back.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use mall_core::{CouponKind, UserCoupon};

/// Repository for coupon reads and admin-side issuance.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

const USER_COUPON_SELECT: &str = r#"
    SELECT uc.id, uc.user_id, uc.coupon_id,
           c.name, c.kind, c.amount_cents, c.discount_bps,
           c.threshold_cents, c.stackable, c.valid_from, c.valid_until,
           uc.status, uc.order_id, uc.used_amount_cents, uc.used_at
    FROM user_coupons uc
    JOIN coupons c ON c.id = uc.coupon_id
"#;

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Gets a single user coupon, scoped to its owner.
    pub async fn get_for_user(&self, id: &str, user_id: &str) -> DbResult<Option<UserCoupon>> {
        let sql = format!("{USER_COUPON_SELECT} WHERE uc.id = ?1 AND uc.user_id = ?2");
        let coupon = sqlx::query_as::<_, UserCoupon>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(coupon)
    }

    /// Lists all coupons held by a user, newest grant first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<UserCoupon>> {
        let sql = format!("{USER_COUPON_SELECT} WHERE uc.user_id = ?1 ORDER BY uc.created_at DESC");
        let coupons = sqlx::query_as::<_, UserCoupon>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(coupons)
    }

    /// Creates a coupon template (admin boundary).
    #[allow(clippy::too_many_arguments)]
    pub async fn create_template(
        &self,
        id: &str,
        name: &str,
        kind: CouponKind,
        amount_cents: i64,
        discount_bps: i64,
        threshold_cents: i64,
        stackable: bool,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, name, kind, amount_cents, discount_bps,
                threshold_cents, stackable, valid_from, valid_until
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(kind)
        .bind(amount_cents)
        .bind(discount_bps)
        .bind(threshold_cents)
        .bind(stackable)
        .bind(valid_from)
        .bind(valid_until)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Grants a coupon instance to a user (admin boundary).
    pub async fn grant(&self, id: &str, user_id: &str, coupon_id: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_coupons (id, user_id, coupon_id, status, created_at)
            VALUES (?1, ?2, ?3, 'unused', ?4)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(coupon_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Transaction-Scoped Mutations
// =============================================================================

/// Loads a user coupon for validation inside a transaction.
pub async fn get_for_user_tx(
    conn: &mut SqliteConnection,
    id: &str,
    user_id: &str,
) -> DbResult<Option<UserCoupon>> {
    let sql = format!("{USER_COUPON_SELECT} WHERE uc.id = ?1 AND uc.user_id = ?2");
    let coupon = sqlx::query_as::<_, UserCoupon>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

    Ok(coupon)
}

/// Binds an unused coupon to an order, recording the value it actually
/// contributed. Fails if the coupon was consumed concurrently.
pub async fn mark_used(
    conn: &mut SqliteConnection,
    user_coupon_id: &str,
    order_id: &str,
    used_amount_cents: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(coupon = %user_coupon_id, order = %order_id, "marking coupon used");

    let result = sqlx::query(
        r#"
        UPDATE user_coupons
        SET status = 'used', order_id = ?1, used_amount_cents = ?2, used_at = ?3
        WHERE id = ?4 AND status = 'unused'
        "#,
    )
    .bind(order_id)
    .bind(used_amount_cents)
    .bind(now)
    .bind(user_coupon_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("user_coupon (unused)", user_coupon_id));
    }
    Ok(())
}

/// Reverts coupons bound to a cancelled order back to unused. Returns how
/// many were reverted; a second cancel finds nothing to revert.
pub async fn revert_for_order(conn: &mut SqliteConnection, order_id: &str) -> DbResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE user_coupons
        SET status = 'unused', order_id = NULL, used_amount_cents = NULL, used_at = NULL
        WHERE order_id = ?1 AND status = 'used'
        "#,
    )
    .bind(order_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use mall_core::{CouponState, CouponStatus};

    async fn db_with_coupon() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();

        db.coupons()
            .create_template(
                "t1",
                "10 off over 100",
                CouponKind::FullReduction,
                1000,
                0,
                10000,
                true,
                now - Duration::days(1),
                now + Duration::days(30),
            )
            .await
            .unwrap();
        db.coupons().grant("uc1", "u1", "t1").await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_get_joins_template_fields() {
        let db = db_with_coupon().await;

        let coupon = db.coupons().get_for_user("uc1", "u1").await.unwrap().unwrap();
        assert_eq!(coupon.name, "10 off over 100");
        assert_eq!(coupon.kind, CouponKind::FullReduction);
        assert_eq!(coupon.amount_cents, 1000);
        assert_eq!(coupon.threshold_cents, 10000);
        assert_eq!(coupon.status, CouponStatus::Unused);

        // Ownership scoping
        assert!(db.coupons().get_for_user("uc1", "u2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_used_then_revert() {
        let db = db_with_coupon().await;
        let now = Utc::now();

        let mut tx = db.pool().begin().await.unwrap();
        mark_used(&mut tx, "uc1", "o1", 1000, now).await.unwrap();
        tx.commit().await.unwrap();

        let coupon = db.coupons().get_for_user("uc1", "u1").await.unwrap().unwrap();
        assert_eq!(coupon.status, CouponStatus::Used);
        assert_eq!(
            coupon.state(),
            CouponState::Used {
                order_id: "o1".to_string(),
                amount_cents: 1000,
            }
        );

        let mut tx = db.pool().begin().await.unwrap();
        assert_eq!(revert_for_order(&mut tx, "o1").await.unwrap(), 1);
        // Idempotent: nothing left bound to the order
        assert_eq!(revert_for_order(&mut tx, "o1").await.unwrap(), 0);
        tx.commit().await.unwrap();

        let coupon = db.coupons().get_for_user("uc1", "u1").await.unwrap().unwrap();
        assert_eq!(coupon.status, CouponStatus::Unused);
        assert!(coupon.order_id.is_none());
    }

    #[tokio::test]
    async fn test_mark_used_twice_fails() {
        let db = db_with_coupon().await;
        let now = Utc::now();

        let mut tx = db.pool().begin().await.unwrap();
        mark_used(&mut tx, "uc1", "o1", 1000, now).await.unwrap();
        let err = mark_used(&mut tx, "uc1", "o2", 1000, now).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
