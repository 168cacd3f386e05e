use std::fmt::Debug;

use log::*;
use shop_common::Money;

use crate::{
    db_types::{Order, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ReturnDecision},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent, OrderPlacedEvent, WalletCreditedEvent},
    helpers::amount_due,
    policy::ShopPolicy,
    shop_api::{
        errors::ShopError,
        order_objects::{CheckoutRequest, FullOrder, OrderQueryFilter, PlacedOrder, SettlementResult},
    },
    traits::OrderFlowManagement,
};

/// `OrderFlowApi` is the primary API for the order lifecycle: checkout, cancellation, returns, fulfilment updates and
/// payment callbacks.
///
/// Methods that act on behalf of a shopper take the caller's `user_id` and refuse to touch orders that belong to
/// someone else. Those orders are reported as not found, so that order ids cannot be probed. The `admin_*` methods
/// and the status updates perform no ownership check; the server only exposes them to administrators.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    policy: ShopPolicy,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, policy: ShopPolicy::default() }
    }

    pub fn with_policy(mut self, policy: ShopPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &ShopPolicy {
        &self.policy
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderFlowManagement
{
    /// Turns the user's cart into an order.
    ///
    /// Submitting the same idempotency key twice returns the first order; no stock, coupon or wallet movement happens
    /// the second time, and no event is raised.
    pub async fn checkout(&self, user_id: &str, request: CheckoutRequest) -> Result<PlacedOrder, ShopError> {
        let method = request.payment_method;
        let placed = self.db.place_order(user_id, request, &self.policy).await?;
        if placed.is_new {
            info!(
                "🔄️📦️ Order {} placed by {user_id} for {} via {method}",
                placed.order.id(),
                placed.order.order.total_price
            );
            for emitter in &self.producers.order_placed_producer {
                emitter.publish_event(OrderPlacedEvent::new(placed.order.clone())).await;
            }
        } else {
            debug!("🔄️📦️ Repeat checkout from {user_id}. Returning order {}", placed.order.id());
        }
        Ok(placed)
    }

    /// Fetches an order owned by `user_id`.
    pub async fn order_for_user(&self, user_id: &str, id: OrderId) -> Result<FullOrder, ShopError> {
        match self.db.fetch_order(id).await? {
            Some(order) if order.belongs_to(user_id) => Ok(order),
            Some(_) => {
                warn!("🔄️ {user_id} asked for order {id}, which belongs to someone else");
                Err(ShopError::OrderNotFound(id))
            },
            None => Err(ShopError::OrderNotFound(id)),
        }
    }

    pub async fn admin_order(&self, id: OrderId) -> Result<FullOrder, ShopError> {
        self.db.fetch_order(id).await?.ok_or(ShopError::OrderNotFound(id))
    }

    /// The user's orders, newest first
    pub async fn orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, ShopError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, ShopError> {
        self.db.search_orders(query).await
    }

    pub async fn cancel_order(&self, user_id: &str, id: OrderId) -> Result<SettlementResult, ShopError> {
        self.order_for_user(user_id, id).await?;
        self.admin_cancel_order(id).await
    }

    pub async fn admin_cancel_order(&self, id: OrderId) -> Result<SettlementResult, ShopError> {
        let result = self.db.cancel_order(id, &self.policy).await?;
        self.after_settlement(&result, "Order cancelled").await;
        Ok(result)
    }

    pub async fn cancel_item(&self, user_id: &str, id: OrderId, item_id: i64) -> Result<SettlementResult, ShopError> {
        self.order_for_user(user_id, id).await?;
        let result = self.db.cancel_order_item(id, item_id, &self.policy).await?;
        self.after_settlement(&result, "Order item cancelled").await;
        Ok(result)
    }

    /// Opens a return request for one delivered item. An empty reason is recorded as "No reason provided".
    pub async fn request_return(
        &self,
        user_id: &str,
        id: OrderId,
        item_id: i64,
        reason: Option<&str>,
    ) -> Result<FullOrder, ShopError> {
        self.order_for_user(user_id, id).await?;
        self.db.request_item_return(id, item_id, reason.unwrap_or_default()).await
    }

    /// An administrator accepts or rejects a pending return request.
    pub async fn resolve_return(
        &self,
        id: OrderId,
        item_id: i64,
        decision: ReturnDecision,
    ) -> Result<SettlementResult, ShopError> {
        let result = self.db.resolve_return(id, item_id, decision, &self.policy).await?;
        self.after_settlement(&result, "Returned item refunded").await;
        Ok(result)
    }

    pub async fn return_order(&self, user_id: &str, id: OrderId) -> Result<SettlementResult, ShopError> {
        self.order_for_user(user_id, id).await?;
        let result = self.db.return_order(id, &self.policy).await?;
        self.after_settlement(&result, "Order returned").await;
        Ok(result)
    }

    pub async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<FullOrder, ShopError> {
        self.db.update_order_status(id, status).await
    }

    pub async fn update_item_status(
        &self,
        id: OrderId,
        item_id: i64,
        status: OrderStatus,
    ) -> Result<FullOrder, ShopError> {
        self.db.update_item_status(id, item_id, status).await
    }

    /// Applies a payment status report from the gateway. Repeated reports are harmless.
    ///
    /// If the charge collected more than the order is still worth, the difference is refunded to the wallet, and the
    /// usual settlement events are raised for it.
    pub async fn payment_callback(&self, id: OrderId, status: PaymentStatus) -> Result<SettlementResult, ShopError> {
        let before = self.admin_order(id).await?;
        let result = self.db.update_payment_status(id, status, &self.policy).await?;
        let order = &result.order.order;
        let newly_paid = before.order.payment_status != PaymentStatus::Completed &&
            order.payment_status == PaymentStatus::Completed;
        if newly_paid {
            debug!("🔄️💰️ Order {id} has been paid through the gateway");
            for emitter in &self.producers.order_paid_producer {
                emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
            }
        }
        if result.refund.is_positive() {
            trace!("🔄️💰️ Notifying wallet credit subscribers");
            for emitter in &self.producers.wallet_credited_producer {
                let reason = format!("Refund of gateway payment ({id})");
                emitter.publish_event(WalletCreditedEvent::new(&order.user_id, result.refund, reason)).await;
            }
        }
        Ok(result)
    }

    /// Checks that the user's order can be charged through the gateway. Returns the order and the amount to charge,
    /// which leaves out any lines that were cancelled while the order was waiting for payment.
    pub async fn prepare_gateway_charge(&self, user_id: &str, id: OrderId) -> Result<(Order, Money), ShopError> {
        let full = self.order_for_user(user_id, id).await?;
        let order = &full.order;
        if order.payment_method != PaymentMethod::Gateway {
            return Err(ShopError::Validation(format!("Order {id} is not a gateway payment")));
        }
        if order.status.is_terminal() {
            return Err(ShopError::invalid_state(id, order.status, "It can no longer be paid"));
        }
        if !matches!(order.payment_status, PaymentStatus::Pending | PaymentStatus::Failed) {
            return Err(ShopError::AlreadyProcessed(format!("Payment for order {id}")));
        }
        let amount = amount_due(&full.items);
        if !amount.is_positive() {
            return Err(ShopError::invalid_state(id, order.status, "Nothing is left to pay"));
        }
        if amount != order.total_price {
            debug!("🔄️💰️ Order {id} totals {}, but only {amount} is still due", order.total_price);
        }
        Ok((full.order, amount))
    }

    pub async fn record_charge(&self, id: OrderId, charge_id: &str, amount: Money) -> Result<Order, ShopError> {
        self.db.record_charge(id, charge_id, amount).await
    }

    async fn after_settlement(&self, result: &SettlementResult, reason: &str) {
        let order = &result.order.order;
        if result.refund.is_positive() {
            trace!("🔄️💰️ Notifying wallet credit subscribers");
            for emitter in &self.producers.wallet_credited_producer {
                let event = WalletCreditedEvent::new(&order.user_id, result.refund, format!("{reason} ({})", order.id));
                emitter.publish_event(event).await;
            }
        }
        if order.status.is_terminal() {
            trace!("🔄️📦️ Notifying order annulled subscribers");
            for emitter in &self.producers.order_annulled_producer {
                emitter.publish_event(OrderAnnulledEvent::new(order.clone(), result.refund)).await;
            }
        }
    }
}
