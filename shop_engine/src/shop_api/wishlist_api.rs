use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Cart, Wishlist},
    policy::ShopPolicy,
    shop_api::errors::ShopError,
    traits::WishlistManagement,
};

pub struct WishlistApi<B> {
    db: B,
    policy: ShopPolicy,
}

impl<B: Debug> Debug for WishlistApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WishlistApi ({:?})", self.db)
    }
}

impl<B> WishlistApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, policy: ShopPolicy::default() }
    }

    pub fn with_policy(mut self, policy: ShopPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<B> WishlistApi<B>
where B: WishlistManagement
{
    pub async fn wishlist(&self, user_id: &str) -> Result<Wishlist, ShopError> {
        self.db.fetch_wishlist(user_id).await
    }

    pub async fn add(&self, user_id: &str, product_id: i64) -> Result<Wishlist, ShopError> {
        let wishlist = self.db.add_to_wishlist(user_id, product_id).await?;
        debug!("🛒️ Product #{product_id} saved to {user_id}'s wishlist");
        Ok(wishlist)
    }

    pub async fn remove(&self, user_id: &str, product_id: i64) -> Result<Wishlist, ShopError> {
        self.db.remove_from_wishlist(user_id, product_id).await
    }

    pub async fn move_to_cart(&self, user_id: &str, product_id: i64) -> Result<Cart, ShopError> {
        let cart = self.db.move_to_cart(user_id, product_id, &self.policy).await?;
        debug!("🛒️ Product #{product_id} moved from {user_id}'s wishlist to the cart");
        Ok(cart)
    }
}
