//! Shop Engine
//!
//! The shop engine owns the order lifecycle of an online store: pricing with category offers, carts, coupons,
//! checkout with cash-on-delivery, wallet or gateway payment, cancellations and returns with refunds to the customer's
//! wallet, the wallet ledger itself, and referral bonuses.
//!
//! The library is divided into three main sections:
//! 1. Backend contracts ([`mod@traits`]) and the SQLite implementation of them ([`SqliteDatabase`]). You should never
//!    need to access the database directly. The exception is the data types stored in the database, which are
//!    defined in [`mod@db_types`] and are public.
//! 2. The public API ([`mod@shop_api`]). Each API wraps a backend and enforces the business rules that don't belong
//!    in a single database transaction, such as order ownership.
//! 3. Pure business rules ([`mod@helpers`]): pricing, coupon arithmetic and the settlement rules.
//!
//! The engine also emits events (see [`mod@events`]) when orders are placed, paid or annulled, and when money is
//! credited to a wallet. Hooks registered for these events run asynchronously and can never fail the operation that
//! raised them.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod policy;
pub mod shop_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use shop_api::{
    accounts_api::AccountApi,
    cart_api::CartApi,
    catalog_api::CatalogApi,
    coupon_api::{CouponApi, CouponPage},
    errors::{ErrorKind, ShopError},
    order_flow_api::OrderFlowApi,
    order_objects,
    report_objects,
    reports_api::ReportsApi,
    wallet_api::WalletApi,
    wishlist_api::WishlistApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db as sqlite_db, SqliteDatabase};
