use shop_common::Money;

use crate::{
    db_types::{Order, OrderId, OrderStatus, PaymentStatus, ReturnDecision},
    policy::ShopPolicy,
    shop_api::{
        errors::ShopError,
        order_objects::{CheckoutRequest, FullOrder, OrderQueryFilter, PlacedOrder, SettlementResult},
    },
};

/// This trait defines the highest level of behaviour for backends supporting the shop engine: turning carts into
/// orders and settling every later change to an order.
///
/// Every method that moves stock or money runs as a single atomic database transaction. Either all of its effects
/// happen, or none do.
///
/// Ownership checks (does this order belong to the calling user?) are the caller's responsibility. See
/// [`crate::OrderFlowApi`].
#[allow(async_fn_in_trait)]
pub trait OrderFlowManagement: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Turns the user's cart into an order.
    ///
    /// In a single transaction:
    /// * every line is re-priced against the current offers and re-checked for availability,
    /// * stock is taken for every line with a conditional write,
    /// * the coupon, if any, is validated and redeemed, and its discount apportioned over the lines,
    /// * wallet orders are paid from the wallet,
    /// * the order and its items are written, and the cart is emptied.
    ///
    /// If the request carries an idempotency key that this user has used before, the earlier order is returned and
    /// nothing else happens.
    async fn place_order(
        &self,
        user_id: &str,
        request: CheckoutRequest,
        policy: &ShopPolicy,
    ) -> Result<PlacedOrder, ShopError>;

    async fn fetch_order(&self, id: OrderId) -> Result<Option<FullOrder>, ShopError>;

    /// All of the user's orders, newest first.
    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, ShopError>;

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, ShopError>;

    /// Cancels every active item, puts their stock back and refunds what was paid for them, if anything was.
    async fn cancel_order(&self, id: OrderId, policy: &ShopPolicy) -> Result<SettlementResult, ShopError>;

    /// Cancels a single item. If it was the last active item, the whole order becomes `Cancelled`.
    async fn cancel_order_item(
        &self,
        id: OrderId,
        item_id: i64,
        policy: &ShopPolicy,
    ) -> Result<SettlementResult, ShopError>;

    /// Opens a return request for an item of a delivered order. Nothing moves until an admin resolves it.
    async fn request_item_return(&self, id: OrderId, item_id: i64, reason: &str) -> Result<FullOrder, ShopError>;

    /// Accepts or rejects a pending return request. Accepting restocks the item and refunds it.
    async fn resolve_return(
        &self,
        id: OrderId,
        item_id: i64,
        decision: ReturnDecision,
        policy: &ShopPolicy,
    ) -> Result<SettlementResult, ShopError>;

    /// Returns every active item of a delivered order in one go.
    async fn return_order(&self, id: OrderId, policy: &ShopPolicy) -> Result<SettlementResult, ShopError>;

    /// Moves the order forward along its fulfilment path. Active items that are behind the new status follow it.
    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<FullOrder, ShopError>;

    async fn update_item_status(
        &self,
        id: OrderId,
        item_id: i64,
        status: OrderStatus,
    ) -> Result<FullOrder, ShopError>;

    /// Records a payment status reported by the payment gateway.
    ///
    /// A completed charge can collect more than the order is still worth, because lines may have been cancelled
    /// after the charge was raised, or the whole order may have been cancelled. The excess is credited to the wallet
    /// and reported as the refund.
    async fn update_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
        policy: &ShopPolicy,
    ) -> Result<SettlementResult, ShopError>;

    /// Stores the gateway's charge reference and the amount the charge was raised for.
    async fn record_charge(&self, id: OrderId, charge_id: &str, amount: Money) -> Result<Order, ShopError>;
}
