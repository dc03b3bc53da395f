//! # Voucher Repository
//!
//! Stored-value vouchers: a balance that settlement debits and that an
//! administrative cancel can refund.
//!
//! ## Debit Discipline
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  UPDATE user_vouchers                                                │
//! │  SET remain_amount_cents = remain_amount_cents - ?amount             │
//! │  WHERE id = ? AND status = 'active'                                  │
//! │    AND remain_amount_cents >= ?amount                                │
//! │                                                                      │
//! │  The balance check and the subtraction are one statement, so two     │
//! │  settlements racing on one voucher can never overdraw it. A voucher  │
//! │  drained to zero flips to inactive in the same statement.            │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//! Every successful debit writes a `voucher_usages` row so refunds have an
//! exact amount to restore.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use mall_core::UserVoucher;

/// Repository for voucher reads and issuance.
#[derive(Debug, Clone)]
pub struct VoucherRepository {
    pool: SqlitePool,
}

const VOUCHER_COLUMNS: &str = r#"
    id, user_id, name, remain_amount_cents, status,
    valid_from, valid_until, created_at, updated_at
"#;

impl VoucherRepository {
    /// Creates a new VoucherRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VoucherRepository { pool }
    }

    /// Gets a voucher, scoped to its owner.
    pub async fn get_for_user(&self, id: &str, user_id: &str) -> DbResult<Option<UserVoucher>> {
        let sql = format!("SELECT {VOUCHER_COLUMNS} FROM user_vouchers WHERE id = ?1 AND user_id = ?2");
        let voucher = sqlx::query_as::<_, UserVoucher>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(voucher)
    }

    /// Issues a voucher to a user (admin boundary).
    pub async fn issue(&self, voucher: &UserVoucher) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_vouchers (
                id, user_id, name, remain_amount_cents, status,
                valid_from, valid_until, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&voucher.id)
        .bind(&voucher.user_id)
        .bind(&voucher.name)
        .bind(voucher.remain_amount_cents)
        .bind(voucher.status)
        .bind(voucher.valid_from)
        .bind(voucher.valid_until)
        .bind(voucher.created_at)
        .bind(voucher.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Transaction-Scoped Mutations
// =============================================================================

/// Loads a voucher for validation inside a transaction.
pub async fn get_for_user_tx(
    conn: &mut SqliteConnection,
    id: &str,
    user_id: &str,
) -> DbResult<Option<UserVoucher>> {
    let sql = format!("SELECT {VOUCHER_COLUMNS} FROM user_vouchers WHERE id = ?1 AND user_id = ?2");
    let voucher = sqlx::query_as::<_, UserVoucher>(&sql)
        .bind(id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

    Ok(voucher)
}

/// Atomically debits an active voucher. Returns `false` when the voucher is
/// missing, inactive, or the balance does not cover `amount_cents`.
///
/// A voucher whose balance reaches exactly zero is deactivated by the same
/// statement.
pub async fn try_debit(
    conn: &mut SqliteConnection,
    voucher_id: &str,
    amount_cents: i64,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    debug!(voucher = %voucher_id, amount_cents, "debiting voucher");

    let result = sqlx::query(
        r#"
        UPDATE user_vouchers
        SET remain_amount_cents = remain_amount_cents - ?1,
            status = CASE WHEN remain_amount_cents - ?1 = 0
                          THEN 'inactive' ELSE status END,
            updated_at = ?2
        WHERE id = ?3 AND status = 'active'
          AND remain_amount_cents >= ?1
        "#,
    )
    .bind(amount_cents)
    .bind(now)
    .bind(voucher_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Records a successful debit against an order.
pub async fn record_usage(
    conn: &mut SqliteConnection,
    usage_id: &str,
    voucher_id: &str,
    order_id: &str,
    amount_cents: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO voucher_usages (id, voucher_id, order_id, amount_cents, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(usage_id)
    .bind(voucher_id)
    .bind(order_id)
    .bind(amount_cents)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

/// Refunds every unrefunded usage of an order back onto its voucher,
/// reactivating vouchers that had been drained. Returns the total refunded.
pub async fn refund_for_order(
    conn: &mut SqliteConnection,
    order_id: &str,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    let usages = sqlx::query_as::<_, (String, String, i64)>(
        r#"
        SELECT id, voucher_id, amount_cents
        FROM voucher_usages
        WHERE order_id = ?1 AND refunded_at IS NULL
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut total = 0i64;
    for (usage_id, voucher_id, amount_cents) in usages {
        let result = sqlx::query(
            r#"
            UPDATE user_vouchers
            SET remain_amount_cents = remain_amount_cents + ?1,
                status = 'active',
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(amount_cents)
        .bind(now)
        .bind(&voucher_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user_voucher", &voucher_id));
        }

        sqlx::query("UPDATE voucher_usages SET refunded_at = ?1 WHERE id = ?2")
            .bind(now)
            .bind(&usage_id)
            .execute(&mut *conn)
            .await?;

        total += amount_cents;
    }

    Ok(total)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use mall_core::VoucherStatus;

    fn sample_voucher(id: &str, user_id: &str, balance: i64) -> UserVoucher {
        let now = Utc::now();
        UserVoucher {
            id: id.into(),
            user_id: user_id.into(),
            name: "Mall Credit".into(),
            remain_amount_cents: balance,
            status: VoucherStatus::Active,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(90),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_debit_within_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.vouchers().issue(&sample_voucher("v1", "u1", 5000)).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert!(try_debit(&mut tx, "v1", 3000, Utc::now()).await.unwrap());
        tx.commit().await.unwrap();

        let voucher = db.vouchers().get_for_user("v1", "u1").await.unwrap().unwrap();
        assert_eq!(voucher.remain_amount_cents, 2000);
        assert_eq!(voucher.status, VoucherStatus::Active);
    }

    #[tokio::test]
    async fn test_debit_refuses_overdraw() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.vouchers().issue(&sample_voucher("v1", "u1", 2000)).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert!(!try_debit(&mut tx, "v1", 2001, Utc::now()).await.unwrap());
        tx.commit().await.unwrap();

        // Balance is untouched after a refused debit
        let voucher = db.vouchers().get_for_user("v1", "u1").await.unwrap().unwrap();
        assert_eq!(voucher.remain_amount_cents, 2000);
    }

    #[tokio::test]
    async fn test_exact_drain_deactivates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.vouchers().issue(&sample_voucher("v1", "u1", 2000)).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert!(try_debit(&mut tx, "v1", 2000, Utc::now()).await.unwrap());
        // A drained voucher refuses further debits
        assert!(!try_debit(&mut tx, "v1", 1, Utc::now()).await.unwrap());
        tx.commit().await.unwrap();

        let voucher = db.vouchers().get_for_user("v1", "u1").await.unwrap().unwrap();
        assert_eq!(voucher.remain_amount_cents, 0);
        assert_eq!(voucher.status, VoucherStatus::Inactive);
    }

    #[tokio::test]
    async fn test_refund_restores_and_reactivates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.vouchers().issue(&sample_voucher("v1", "u1", 2000)).await.unwrap();
        let now = Utc::now();

        // Order row required by the usages FK
        let order = mall_core::Order {
            id: "o1".into(),
            order_no: "N1".into(),
            user_id: "u1".into(),
            status: mall_core::OrderStatus::Paid,
            pay_amount_cents: 2000,
            actual_pay_amount_cents: 2000,
            discount_cents: 0,
            receiver_name: "Alice".into(),
            receiver_phone: "13800000000".into(),
            receiver_address: "Hubei Wuhan 1 Example Rd".into(),
            pay_limit_time: now + Duration::minutes(30),
            pay_time: Some(now),
            cancel_time: None,
            receive_time: None,
            visible: true,
            created_at: now,
            updated_at: now,
        };
        let mut tx = db.pool().begin().await.unwrap();
        crate::repository::order::insert_order(&mut tx, &order).await.unwrap();
        assert!(try_debit(&mut tx, "v1", 2000, now).await.unwrap());
        record_usage(&mut tx, "use1", "v1", "o1", 2000, now).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert_eq!(refund_for_order(&mut tx, "o1", now).await.unwrap(), 2000);
        // Second refund finds nothing unrefunded
        assert_eq!(refund_for_order(&mut tx, "o1", now).await.unwrap(), 0);
        tx.commit().await.unwrap();

        let voucher = db.vouchers().get_for_user("v1", "u1").await.unwrap().unwrap();
        assert_eq!(voucher.remain_amount_cents, 2000);
        assert_eq!(voucher.status, VoucherStatus::Active);
    }
}
