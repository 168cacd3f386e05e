use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Cart, QuantityAction},
    policy::ShopPolicy,
    shop_api::{cart_objects::CartView, errors::ShopError},
    traits::CartManagement,
};

pub struct CartApi<B> {
    db: B,
    policy: ShopPolicy,
}

impl<B: Debug> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi ({:?})", self.db)
    }
}

impl<B> CartApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, policy: ShopPolicy::default() }
    }

    pub fn with_policy(mut self, policy: ShopPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    pub async fn add_item(&self, user_id: &str, product_id: i64, quantity: i64) -> Result<Cart, ShopError> {
        trace!("🛒️ {user_id} is adding {quantity} of product #{product_id}");
        self.db.add_to_cart(user_id, product_id, quantity, &self.policy).await
    }

    /// The user's cart with freshly computed prices, and advisory lists of lines that would block checkout.
    pub async fn cart(&self, user_id: &str) -> Result<CartView, ShopError> {
        let view = self.db.fetch_cart(user_id).await?;
        if !view.is_checkout_ready() {
            debug!(
                "🛒️ Cart for {user_id} has {} blocked products, {} blocked categories and {} stock shortfalls",
                view.blocked_products.len(),
                view.blocked_categories.len(),
                view.insufficient_stock.len()
            );
        }
        Ok(view)
    }

    pub async fn remove_item(&self, user_id: &str, item_id: i64) -> Result<Cart, ShopError> {
        self.db.remove_from_cart(user_id, item_id).await
    }

    pub async fn update_quantity(&self, user_id: &str, item_id: i64, action: QuantityAction) -> Result<Cart, ShopError> {
        self.db.update_cart_quantity(user_id, item_id, action, &self.policy).await
    }
}
