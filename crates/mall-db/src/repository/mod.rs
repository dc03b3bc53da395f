//! # Repository Module
//!
//! Database repository implementations for the mall order core.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Order Service                                                         │
//! │       │                                                                 │
//! │       │  db.stock().get_stock("cfg-1")                                 │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  StockRepository                                                       │
//! │  ├── get_stock(&self, config_id)                                       │
//! │  ├── get_seckill_round(&self, round_id)                                │
//! │  └── create_stock(&self, config_id, shelf_num)                         │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories hold the pool and serve reads plus admin-boundary inserts.
//! Mutations that must land atomically with other writes are free functions
//! taking `&mut SqliteConnection`, composed by the order service inside one
//! transaction.
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Products, configs, addresses
//! - [`stock::StockRepository`] - Regular and seckill stock pools
//! - [`order::OrderRepository`] - Orders, items, status transitions
//! - [`coupon::CouponRepository`] - Coupon templates and user coupons
//! - [`voucher::VoucherRepository`] - Stored-value vouchers and usages

pub mod catalog;
pub mod coupon;
pub mod order;
pub mod stock;
pub mod voucher;
