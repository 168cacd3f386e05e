use shop_common::Money;
use thiserror::Error;

use crate::db_types::{OrderId, OrderStatus};

/// The broad class of an error. Callers (e.g. the HTTP server) map these to their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Forbidden,
    Conflict,
    Unexpected,
}

#[derive(Debug, Clone, Error)]
pub enum ShopError {
    // --- NotFound
    #[error("Product {0} not found")]
    ProductNotFound(i64),
    #[error("Category {0} not found")]
    CategoryNotFound(i64),
    #[error("Offer {0} not found")]
    OfferNotFound(i64),
    #[error("Cart not found")]
    CartNotFound,
    #[error("Cart item {0} not found")]
    CartItemNotFound(i64),
    #[error("Coupon not found")]
    CouponNotFound,
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),
    #[error("Item {item} not found in order {order}")]
    OrderItemNotFound { order: OrderId, item: i64 },
    #[error("No return request exists for item {0}")]
    ReturnRequestNotFound(i64),
    #[error("Address {0} not found")]
    AddressNotFound(i64),
    #[error("Invalid referral code")]
    ReferralCodeNotFound,
    #[error("User {0} not found")]
    UserNotFound(String),
    #[error("Product {0} not found in the wishlist")]
    WishlistItemNotFound(i64),
    // --- Validation
    #[error("{0}")]
    Validation(String),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Max limit exceeded. {0}")]
    LimitExceeded(String),
    #[error("Insufficient stock for {product}. Only {available} left")]
    InsufficientStock { product: String, available: i64 },
    #[error("Insufficient wallet balance. Balance is {balance}, but {required} is required")]
    InsufficientBalance { balance: Money, required: Money },
    #[error("Coupon {0} has expired")]
    CouponExpired(String),
    #[error("Usage limit reached for coupon {0}")]
    UsageLimitReached(String),
    #[error("Cash on delivery is not available for orders above {0}")]
    CodCeilingExceeded(Money),
    // --- Forbidden
    #[error("{0} is currently unavailable")]
    ProductUnavailable(String),
    #[error("The {0} category is currently unavailable")]
    CategoryUnavailable(String),
    #[error("User {0} is blocked")]
    UserBlocked(String),
    // --- Conflict
    #[error("{0} has already been processed")]
    AlreadyProcessed(String),
    #[error("Order {order} is {status}. {reason}")]
    InvalidOrderState { order: OrderId, status: OrderStatus, reason: String },
    #[error("Cannot change status from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },
    #[error("A referral has already been applied to this account")]
    AlreadyReferred,
    #[error("Coupon with this name already exists.")]
    DuplicateCoupon,
    #[error("An active offer already exists for this category in the given period")]
    OverlappingOffer,
    #[error("{0} is already in the wishlist")]
    AlreadyInWishlist(String),
    // --- Unexpected
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
}

impl ShopError {
    pub fn kind(&self) -> ErrorKind {
        use ShopError::*;
        match self {
            ProductNotFound(_) |
            CategoryNotFound(_) |
            OfferNotFound(_) |
            CartNotFound |
            CartItemNotFound(_) |
            CouponNotFound |
            OrderNotFound(_) |
            OrderItemNotFound { .. } |
            ReturnRequestNotFound(_) |
            AddressNotFound(_) |
            ReferralCodeNotFound |
            UserNotFound(_) |
            WishlistItemNotFound(_) => ErrorKind::NotFound,
            Validation(_) |
            EmptyCart |
            LimitExceeded(_) |
            InsufficientStock { .. } |
            InsufficientBalance { .. } |
            CouponExpired(_) |
            UsageLimitReached(_) |
            CodCeilingExceeded(_) => ErrorKind::Validation,
            ProductUnavailable(_) | CategoryUnavailable(_) | UserBlocked(_) => ErrorKind::Forbidden,
            AlreadyProcessed(_) |
            InvalidOrderState { .. } |
            InvalidStatusTransition { .. } |
            AlreadyReferred |
            DuplicateCoupon |
            OverlappingOffer |
            AlreadyInWishlist(_) => ErrorKind::Conflict,
            DatabaseError(_) | GatewayError(_) => ErrorKind::Unexpected,
        }
    }

    pub fn invalid_state<S: Into<String>>(order: OrderId, status: OrderStatus, reason: S) -> Self {
        Self::InvalidOrderState { order, status, reason: reason.into() }
    }
}

impl From<sqlx::Error> for ShopError {
    fn from(e: sqlx::Error) -> Self {
        ShopError::DatabaseError(e.to_string())
    }
}
