//! # Shop engine public API
//!
//! The `shop_api` module exposes the programmatic API of the shop engine. It is modular, so clients pick the parts
//! they need:
//!
//! * [`order_flow_api`] handles checkout and everything that happens to an order afterwards.
//! * [`cart_api`] manages shopping carts.
//! * [`catalog_api`] administers categories, products, stock and category offers.
//! * [`coupon_api`] administers coupons and lists the ones a user can still apply.
//! * [`accounts_api`] manages users, their addresses and referrals.
//! * [`wallet_api`] exposes wallet balances and history, and administrator adjustments.
//! * [`wishlist_api`] keeps the products a shopper has saved for later.
//! * [`reports_api`] builds the sales dashboard: the sales report, chart data and best sellers.
//!
//! Every API is created by supplying a backend that implements the matching trait in [`crate::traits`]:
//!
//! ```rust,ignore
//! use shop_engine::{CartApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/shop.db", 25).await?;
//! let api = CartApi::new(db);
//! let cart = api.add_item("alice", product_id, 2).await?;
//! ```
pub mod accounts_api;
pub mod cart_api;
pub mod cart_objects;
pub mod catalog_api;
pub mod coupon_api;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod report_objects;
pub mod reports_api;
pub mod wallet_api;
pub mod wallet_objects;
pub mod wishlist_api;
