use crate::{
    db_types::{Cart, QuantityAction},
    policy::ShopPolicy,
    shop_api::{cart_objects::CartView, errors::ShopError},
};

/// The shopping cart. Every mutation re-prices the affected line against the current category offers, and the cart
/// total is always the sum of its lines.
///
/// Stock is only checked here, never reserved. It is taken out of stock when the order is placed.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// Adds `quantity` units of a product to the user's cart, merging with an existing line for the same product.
    ///
    /// ## Failure modes:
    /// - `quantity` is less than one.
    /// - The user is blocked.
    /// - The product or its category does not exist, or is blocked.
    /// - The resulting line quantity exceeds the policy limit, or the available stock.
    async fn add_to_cart(
        &self,
        user_id: &str,
        product_id: i64,
        quantity: i64,
        policy: &ShopPolicy,
    ) -> Result<Cart, ShopError>;

    /// Re-prices every line, saves the new prices, and reports lines that cannot currently be checked out.
    /// Users without a cart get an empty one.
    async fn fetch_cart(&self, user_id: &str) -> Result<CartView, ShopError>;

    async fn remove_from_cart(&self, user_id: &str, item_id: i64) -> Result<Cart, ShopError>;

    /// Increments or decrements the quantity of a cart line by one.
    async fn update_cart_quantity(
        &self,
        user_id: &str,
        item_id: i64,
        action: QuantityAction,
        policy: &ShopPolicy,
    ) -> Result<Cart, ShopError>;
}
