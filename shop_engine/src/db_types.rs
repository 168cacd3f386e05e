//! Data types that are stored in, and read from, the shop database.
//!
//! These are plain data carriers. Business rules that operate on them live in [`crate::helpers`] and in the backend
//! implementations.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
pub use shop_common::Money;
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

/// Implements `Display`, `FromStr` and the infallible `From<String>` conversion for simple unit enums, using the
/// variant names as the string representation.
macro_rules! string_enum {
    ($name:ident, $fallback:ident, [$($variant:ident),+]) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, stringify!($variant)),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(Self::$variant),)+
                    s => Err(ConversionError(format!("{s} is not a valid {}", stringify!($name)))),
                }
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                value.parse().unwrap_or_else(|_| {
                    error!(
                        "Invalid {}: {value}. But this conversion cannot fail. Defaulting to {}",
                        stringify!($name),
                        stringify!($fallback)
                    );
                    Self::$fallback
                })
            }
        }
    };
}

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
pub enum Role {
    User,
    Admin,
}

string_enum!(Role, User, [User, Admin]);

//--------------------------------------        User         ---------------------------------------------------------
/// A shopper known to the engine. The id is supplied by the authentication layer; the engine only records the
/// shop-specific attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       Address        --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Address {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub phone: String,
    pub locality: String,
    pub district: String,
    pub state: String,
    pub pincode: String,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// The single-line form that is captured on an order at checkout.
    pub fn formatted(&self) -> String {
        format!("{}, {}, {} - {}", self.locality, self.district, self.state, self.pincode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    pub name: String,
    pub phone: String,
    pub locality: String,
    pub district: String,
    pub state: String,
    pub pincode: String,
}

impl NewAddress {
    /// Returns the name of the first missing field, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("phone", &self.phone),
            ("locality", &self.locality),
            ("district", &self.district),
            ("state", &self.state),
            ("pincode", &self.pincode),
        ]
        .into_iter()
        .find(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
    }
}

/// A partial edit of an address. Fields left out keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
}

impl AddressUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// The address as it will read after the edit.
    pub fn apply_to(self, current: &Address) -> NewAddress {
        NewAddress {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            phone: self.phone.unwrap_or_else(|| current.phone.clone()),
            locality: self.locality.unwrap_or_else(|| current.locality.clone()),
            district: self.district.unwrap_or_else(|| current.district.clone()),
            state: self.state.unwrap_or_else(|| current.state.clone()),
            pincode: self.pincode.unwrap_or_else(|| current.pincode.clone()),
        }
    }
}

//--------------------------------------       Category       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub is_blocked: bool,
    pub current_offer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
}

//--------------------------------------       Product        --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category_id: i64,
    pub images: Json<Vec<String>>,
    pub stock: i64,
    pub sales_price: Money,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: i64,
    #[serde(default)]
    pub images: Vec<String>,
    pub stock: i64,
    pub sales_price: Money,
}

//--------------------------------------      Discounts       --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
pub enum DiscountType {
    #[serde(rename = "FLAT", alias = "flat", alias = "Flat")]
    Flat,
    #[serde(rename = "PERCENTAGE", alias = "percentage", alias = "Percentage")]
    Percentage,
}

string_enum!(DiscountType, Flat, [Flat, Percentage]);

/// A discount rule. Flat discounts are an amount of money; percentage discounts are whole percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discount {
    Flat(Money),
    Percentage(i64),
}

impl Discount {
    pub fn new(discount_type: DiscountType, value: i64) -> Self {
        match discount_type {
            DiscountType::Flat => Self::Flat(Money::from(value)),
            DiscountType::Percentage => Self::Percentage(value),
        }
    }
}

impl Display for Discount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Discount::Flat(m) => write!(f, "{m} off"),
            Discount::Percentage(p) => write!(f, "{p}% off"),
        }
    }
}

//--------------------------------------    CategoryOffer     --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CategoryOffer {
    pub id: i64,
    pub category_id: i64,
    pub discount_type: DiscountType,
    /// Minor units for flat offers, percentage points for percentage offers
    pub discount_value: i64,
    pub start_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl CategoryOffer {
    pub fn discount(&self) -> Discount {
        Discount::new(self.discount_type, self.discount_value)
    }

    /// An offer applies when it is switched on and `now` falls inside `[start_date, expiry_date]`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.expiry_date
    }

    /// True if the two offers' validity windows share any instant.
    pub fn overlaps(&self, start: DateTime<Utc>, expiry: DateTime<Utc>) -> bool {
        self.start_date < expiry && start < self.expiry_date
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategoryOffer {
    pub category_id: i64,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub start_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
}

//--------------------------------------         Cart         --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CartItem {
    pub id: i64,
    pub user_id: String,
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    pub price: Money,
}

impl CartItem {
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: String,
    pub items: Vec<CartItem>,
    pub total_price: Money,
}

impl Cart {
    pub fn empty(user_id: &str) -> Self {
        Self { user_id: user_id.to_string(), items: vec![], total_price: Money::ZERO }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, item_id: i64) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == item_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityAction {
    Increase,
    Decrease,
}

//--------------------------------------       Wishlist       --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WishlistItem {
    pub id: i64,
    pub user_id: String,
    pub product_id: i64,
    pub name: String,
    /// Effective unit price when the wishlist was last viewed
    pub price: Money,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wishlist {
    pub user_id: String,
    pub items: Vec<WishlistItem>,
    pub total_price: Money,
}

impl Wishlist {
    pub fn contains(&self, product_id: i64) -> bool {
        self.items.iter().any(|i| i.product_id == product_id)
    }
}

//--------------------------------------        Coupon        --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Coupon {
    pub id: i64,
    pub name: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_price: Money,
    pub max_price: Option<Money>,
    pub expiry_date: DateTime<Utc>,
    pub usage_limit: i64,
    pub used_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn discount(&self) -> Discount {
        Discount::new(self.discount_type, self.discount_value)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date < now
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCoupon {
    pub name: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    #[serde(default)]
    pub min_price: Money,
    #[serde(default)]
    pub max_price: Option<Money>,
    pub expiry_date: DateTime<Utc>,
    pub usage_limit: i64,
}

//--------------------------------------     OrderStatus      --------------------------------------------------------
/// Fulfilment status. Used for orders as a whole and for each order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
pub enum OrderStatus {
    /// Placed, but payment is still outstanding (COD or an unpaid gateway charge)
    Pending,
    /// Paid (or COD confirmed) and being prepared
    Processing,
    Shipped,
    Delivered,
    /// Terminal
    Cancelled,
    /// Terminal
    Returned,
}

string_enum!(OrderStatus, Pending, [Pending, Processing, Shipped, Delivered, Cancelled, Returned]);

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Returned)
    }

    /// Position along the fulfilment path. Terminal states have no rank.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Processing => Some(1),
            Self::Shipped => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled | Self::Returned => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
pub enum PaymentMethod {
    #[serde(rename = "COD", alias = "Cod")]
    Cod,
    Wallet,
    Gateway,
}

string_enum!(PaymentMethod, Cod, [Cod, Wallet, Gateway]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

string_enum!(PaymentStatus, Pending, [Pending, Completed, Failed, Refunded]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
pub enum ReturnStatus {
    Pending,
    Accepted,
    Rejected,
}

string_enum!(ReturnStatus, Pending, [Pending, Accepted, Rejected]);

/// The admin's verdict on a return request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnDecision {
    Accepted,
    Rejected,
}

impl From<ReturnDecision> for ReturnStatus {
    fn from(value: ReturnDecision) -> Self {
        match value {
            ReturnDecision::Accepted => ReturnStatus::Accepted,
            ReturnDecision::Rejected => ReturnStatus::Rejected,
        }
    }
}

//--------------------------------------        OrderId        --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct OrderId(pub i64);

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl OrderId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

//--------------------------------------         Order         --------------------------------------------------------
/// The order header. Line items are carried separately (see [`OrderItem`] and
/// [`crate::shop_api::FullOrder`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: String,
    /// Shipping address captured at checkout
    pub address: String,
    /// Σ price × quantity over the lines, before any coupon
    pub subtotal: Money,
    /// Coupon discount applied to the whole order
    pub discount: Money,
    /// Amount payable: `subtotal - discount`, never negative
    pub total_price: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub coupon_id: Option<i64>,
    pub charge_id: Option<String>,
    /// What the gateway was asked to collect. Cancellations before payment make this smaller than `total_price`.
    pub charged_amount: Option<Money>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order header that is about to be written. Prices and discounts are final at this point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: String,
    pub address: String,
    pub subtotal: Money,
    pub discount: Money,
    pub total_price: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub coupon_id: Option<i64>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub name: String,
    pub price: Money,
    pub quantity: i64,
    pub discount_share: Money,
}

impl NewOrderItem {
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub status: ReturnStatus,
    pub reason: String,
    pub requested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: i64,
    pub name: String,
    /// Effective unit price at the moment the order was placed
    pub price: Money,
    pub quantity: i64,
    /// This line's share of the order's coupon discount
    pub discount_share: Money,
    pub status: OrderStatus,
    pub return_request: Option<ReturnRequest>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.price * self.quantity
    }

    /// Still part of the live order, i.e. neither cancelled nor returned
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

//--------------------------------------        Wallet         --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

string_enum!(TransactionType, Credit, [Credit, Debit]);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub user_id: String,
    pub balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Money,
    pub description: String,
    pub order_id: Option<OrderId>,
    /// Unique marker of the business event behind this entry. A second entry for the same event is refused.
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            TransactionType::Credit => self.amount,
            TransactionType::Debit => -self.amount,
        }
    }
}
