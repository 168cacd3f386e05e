use serde::{Deserialize, Serialize};
use shop_common::Money;

use crate::db_types::{Cart, QuantityAction};

/// A request to put a product in the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCart {
    pub product_id: i64,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateQuantity {
    pub action: QuantityAction,
}

/// A priced cart line on its way to the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    pub price: Money,
}

/// A cart line that can no longer be checked out as it stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProblem {
    pub item_id: i64,
    pub product_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockProblem {
    pub item_id: i64,
    pub product_id: i64,
    pub name: String,
    pub requested: i64,
    pub available: i64,
}

/// The cart with freshly computed prices, plus advisories about lines the shopper must fix before checkout. Nothing
/// is removed automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub cart: Cart,
    pub blocked_products: Vec<CartProblem>,
    pub blocked_categories: Vec<CartProblem>,
    pub insufficient_stock: Vec<StockProblem>,
}

impl CartView {
    pub fn new(cart: Cart) -> Self {
        Self { cart, blocked_products: vec![], blocked_categories: vec![], insufficient_stock: vec![] }
    }

    pub fn is_checkout_ready(&self) -> bool {
        !self.cart.is_empty() &&
            self.blocked_products.is_empty() &&
            self.blocked_categories.is_empty() &&
            self.insufficient_stock.is_empty()
    }
}
