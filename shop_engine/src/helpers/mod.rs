//! Pure business rules. Nothing in here touches the database, so every function can be unit tested in isolation
//! and reused by any backend.
mod addresses;
mod discounts;
mod pricing;
mod referral_code;
mod reports;
mod settlement;

pub use addresses::validate_address;
pub use discounts::{
    apportion_discount,
    check_coupon_applicable,
    coupon_discount,
    validate_new_coupon,
    validate_new_offer,
};
pub use pricing::{active_offer, apply_discount, effective_price};
pub use referral_code::new_referral_code;
pub use reports::{chart_points, report_window};
pub use settlement::{
    amount_due,
    check_item_cancellable,
    check_item_returnable,
    check_item_status_update,
    check_order_cancellable,
    check_order_returnable,
    check_order_status_update,
    gateway_status_change,
    initial_statuses,
    is_refund_eligible,
    overpayment,
    refund_for_item,
    GatewayStatusChange,
};
