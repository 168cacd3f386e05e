//! Rules for moving orders through their lifecycle and deciding when money goes back to the customer.
use shop_common::Money;

use crate::{
    db_types::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus},
    shop_api::errors::ShopError,
};

/// Status and payment status of a freshly placed order. Wallet orders are paid at placement; everything else waits
/// for cash on delivery or a gateway callback.
pub fn initial_statuses(method: PaymentMethod) -> (OrderStatus, PaymentStatus) {
    match method {
        PaymentMethod::Wallet => (OrderStatus::Processing, PaymentStatus::Completed),
        PaymentMethod::Cod | PaymentMethod::Gateway => (OrderStatus::Pending, PaymentStatus::Pending),
    }
}

/// Money goes back to the wallet only if it was actually collected: wallet orders always, gateway orders once the
/// charge completed, and COD orders once they were delivered (cash changed hands at the door).
pub fn is_refund_eligible(order: &Order) -> bool {
    match order.payment_method {
        PaymentMethod::Wallet => true,
        PaymentMethod::Gateway => order.payment_status == PaymentStatus::Completed,
        PaymentMethod::Cod => order.status == OrderStatus::Delivered,
    }
}

/// What the customer paid for this line: the line total less its share of the coupon discount.
pub fn refund_for_item(item: &OrderItem) -> Money {
    (item.line_total() - item.discount_share).floor_zero()
}

/// What the customer still owes for an order: the paid-for value of every line that has not been cancelled or
/// returned. Gateway charges are raised for this amount rather than the original total.
pub fn amount_due(items: &[OrderItem]) -> Money {
    items.iter().filter(|i| i.is_active()).map(refund_for_item).sum()
}

/// The part of a completed gateway charge that paid for lines cancelled before the money arrived.
pub fn overpayment(order: &Order, items: &[OrderItem]) -> Money {
    match order.charged_amount {
        Some(charged) => (charged - amount_due(items)).floor_zero(),
        None => Money::ZERO,
    }
}

pub fn check_order_cancellable(order: &Order) -> Result<(), ShopError> {
    match order.status {
        OrderStatus::Cancelled => Err(ShopError::AlreadyProcessed(format!("Cancellation of order {}", order.id))),
        OrderStatus::Returned => Err(ShopError::invalid_state(order.id, order.status, "It cannot be cancelled")),
        OrderStatus::Delivered => Err(ShopError::invalid_state(
            order.id,
            order.status,
            "Delivered orders cannot be cancelled. Return the items instead",
        )),
        _ => Ok(()),
    }
}

pub fn check_item_cancellable(order: &Order, item: &OrderItem) -> Result<(), ShopError> {
    check_order_cancellable(order)?;
    match item.status {
        OrderStatus::Cancelled => Err(ShopError::AlreadyProcessed(format!("Cancellation of {}", item.name))),
        OrderStatus::Returned | OrderStatus::Delivered => Err(ShopError::invalid_state(
            order.id,
            order.status,
            format!("{} is {} and cannot be cancelled", item.name, item.status),
        )),
        _ => Ok(()),
    }
}

pub fn check_order_returnable(order: &Order) -> Result<(), ShopError> {
    match order.status {
        OrderStatus::Delivered => Ok(()),
        OrderStatus::Returned => Err(ShopError::AlreadyProcessed(format!("Return of order {}", order.id))),
        status => Err(ShopError::invalid_state(order.id, status, "Only delivered orders can be returned")),
    }
}

pub fn check_item_returnable(order: &Order, item: &OrderItem) -> Result<(), ShopError> {
    check_order_returnable(order)?;
    if item.return_request.is_some() {
        return Err(ShopError::AlreadyProcessed(format!("Return request for {}", item.name)));
    }
    if !item.is_active() {
        return Err(ShopError::invalid_state(
            order.id,
            order.status,
            format!("{} is {} and cannot be returned", item.name, item.status),
        ));
    }
    Ok(())
}

fn check_forward_transition(from: OrderStatus, to: OrderStatus) -> Result<(), ShopError> {
    match (from.rank(), to.rank()) {
        (Some(a), Some(b)) if b > a => Ok(()),
        _ => Err(ShopError::InvalidStatusTransition { from, to }),
    }
}

/// Admin status pushes only move an order forward along Pending → Processing → Shipped → Delivered. Cancellation
/// and returns have their own operations, and terminal orders are frozen.
pub fn check_order_status_update(order: &Order, target: OrderStatus) -> Result<(), ShopError> {
    if order.status.is_terminal() {
        return Err(ShopError::invalid_state(order.id, order.status, "Its status can no longer change"));
    }
    check_forward_transition(order.status, target)
}

pub fn check_item_status_update(order: &Order, item: &OrderItem, target: OrderStatus) -> Result<(), ShopError> {
    if order.status.is_terminal() {
        return Err(ShopError::invalid_state(order.id, order.status, "Its items can no longer change"));
    }
    check_forward_transition(item.status, target)
}

/// Outcome of a payment status report from the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatusChange {
    /// The order already has this payment status
    Unchanged,
    /// Record the new payment status. If `advance` is set, the order (and its pending lines) move to Processing.
    Update { advance: bool },
    /// The charge completed after the order was cancelled or returned. Everything collected goes back to the wallet.
    RefundLatePayment,
}

pub fn gateway_status_change(order: &Order, reported: PaymentStatus) -> Result<GatewayStatusChange, ShopError> {
    if order.payment_method != PaymentMethod::Gateway {
        return Err(ShopError::Validation(format!("Order {} is not a gateway payment", order.id)));
    }
    if !matches!(reported, PaymentStatus::Completed | PaymentStatus::Failed) {
        return Err(ShopError::Validation(format!("{reported} is not a valid gateway payment status")));
    }
    if order.status.is_terminal() {
        let unpaid = matches!(order.payment_status, PaymentStatus::Pending | PaymentStatus::Failed);
        if unpaid && reported == PaymentStatus::Completed {
            return Ok(GatewayStatusChange::RefundLatePayment);
        }
        return Err(ShopError::invalid_state(order.id, order.status, "Payment updates are no longer accepted"));
    }
    if order.payment_status == reported {
        return Ok(GatewayStatusChange::Unchanged);
    }
    if order.payment_status != PaymentStatus::Pending && order.payment_status != PaymentStatus::Failed {
        return Err(ShopError::AlreadyProcessed(format!("Payment for order {}", order.id)));
    }
    let advance = reported == PaymentStatus::Completed && order.status == OrderStatus::Pending;
    Ok(GatewayStatusChange::Update { advance })
}
