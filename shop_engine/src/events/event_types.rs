use serde::{Deserialize, Serialize};
use shop_common::Money;

use crate::{
    db_types::{Order, OrderStatus, WalletTransaction},
    shop_api::order_objects::FullOrder,
};

/// A new order was written. Re-submitted checkouts do not raise this event again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order: FullOrder,
}

impl OrderPlacedEvent {
    pub fn new(order: FullOrder) -> Self {
        Self { order }
    }
}

/// The gateway reported that the charge for an order completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An order reached a terminal state (cancelled or returned), with whatever was refunded along the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub status: OrderStatus,
    pub refund: Money,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order, refund: Money) -> Self {
        let status = order.status;
        Self { order, status, refund }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCreditedEvent {
    pub user_id: String,
    pub amount: Money,
    pub reason: String,
}

impl WalletCreditedEvent {
    pub fn new<S: Into<String>>(user_id: &str, amount: Money, reason: S) -> Self {
        Self { user_id: user_id.to_string(), amount, reason: reason.into() }
    }
}

impl From<&WalletTransaction> for WalletCreditedEvent {
    fn from(tx: &WalletTransaction) -> Self {
        Self::new(&tx.user_id, tx.amount, tx.description.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderPlaced(OrderPlacedEvent),
    OrderPaid(OrderPaidEvent),
    OrderAnnulled(OrderAnnulledEvent),
    WalletCredited(WalletCreditedEvent),
}
