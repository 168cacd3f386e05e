//! # Backend interface contracts
//!
//! This module defines the behaviour that a database backend needs to expose in order to be supported by the shop
//! engine. The public APIs in [`crate::shop_api`] are generic over these traits.
//!
//! * [`OrderFlowManagement`] defines the highest level of behaviour: placing orders and settling cancellations,
//!   returns, status changes and payment callbacks.
//! * [`CartManagement`] manages shopping carts.
//! * [`CatalogManagement`] manages categories, products, stock and category offers.
//! * [`CouponManagement`] manages coupons.
//! * [`AccountManagement`] manages user records, addresses and referrals.
//! * [`WalletManagement`] provides access to wallets and their transaction history.
//! * [`WishlistManagement`] keeps each shopper's wishlist.
//! * [`SalesReporting`] reads the sales figures behind the admin dashboard.
mod account_management;
mod cart_management;
mod catalog_management;
mod coupon_management;
mod order_flow_management;
mod sales_reporting;
mod wallet_management;
mod wishlist_management;

pub use account_management::AccountManagement;
pub use cart_management::CartManagement;
pub use catalog_management::CatalogManagement;
pub use coupon_management::CouponManagement;
pub use order_flow_management::OrderFlowManagement;
pub use sales_reporting::SalesReporting;
pub use wallet_management::WalletManagement;
pub use wishlist_management::WishlistManagement;
