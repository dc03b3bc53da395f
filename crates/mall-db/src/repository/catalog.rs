//! # Catalog Repository
//!
//! Reads over products, configurations, and shipping addresses. The order
//! core only consumes these rows to resolve prices and build snapshots;
//! catalog and address CRUD UX are external collaborators, so the write
//! surface here is limited to what seeding and admin boundaries need.

use sqlx::SqlitePool;

use crate::error::DbResult;
use mall_core::{Address, Product, ProductConfig};

/// Repository for catalog and address reads.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Gets a product by ID.
    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, on_shelf, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product configuration by ID.
    pub async fn get_config(&self, id: &str) -> DbResult<Option<ProductConfig>> {
        let config = sqlx::query_as::<_, ProductConfig>(
            r#"
            SELECT id, product_id, name, sale_price_cents, on_shelf
            FROM product_configs
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    /// Gets a shipping address owned by the given user.
    ///
    /// The user filter is part of the query: another user's address id
    /// behaves exactly like a missing one.
    pub async fn get_address_for_user(
        &self,
        address_id: &str,
        user_id: &str,
    ) -> DbResult<Option<Address>> {
        let address = sqlx::query_as::<_, Address>(
            r#"
            SELECT id, user_id, receiver_name, receiver_phone,
                   province, city, detail, created_at
            FROM user_addresses
            WHERE id = ?1 AND user_id = ?2
            "#,
        )
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    /// Inserts a product. Admin-boundary operation (seed/tests).
    pub async fn create_product(&self, product: &Product) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, on_shelf, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.on_shelf)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a product configuration. Admin-boundary operation.
    pub async fn create_config(&self, config: &ProductConfig) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO product_configs (id, product_id, name, sale_price_cents, on_shelf)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&config.id)
        .bind(&config.product_id)
        .bind(&config.name)
        .bind(config.sale_price_cents)
        .bind(config.on_shelf)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a shipping address. Admin-boundary operation.
    pub async fn create_address(&self, address: &Address) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_addresses (
                id, user_id, receiver_name, receiver_phone,
                province, city, detail, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&address.id)
        .bind(&address.user_id)
        .bind(&address.receiver_name)
        .bind(&address.receiver_phone)
        .bind(&address.province)
        .bind(&address.city)
        .bind(&address.detail)
        .bind(address.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
