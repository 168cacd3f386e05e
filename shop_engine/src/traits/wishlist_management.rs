use crate::{
    db_types::{Cart, Wishlist},
    policy::ShopPolicy,
    shop_api::errors::ShopError,
};

/// Products a shopper has saved for later.
///
/// Wishlist prices are informational. They are refreshed against the current offers whenever the wishlist is
/// fetched, and nothing is reserved.
#[allow(async_fn_in_trait)]
pub trait WishlistManagement {
    /// Saves a product. Blocked products cannot be saved, and saving a product twice is an error.
    async fn add_to_wishlist(&self, user_id: &str, product_id: i64) -> Result<Wishlist, ShopError>;

    /// Returns the wishlist with every price brought up to date.
    async fn fetch_wishlist(&self, user_id: &str) -> Result<Wishlist, ShopError>;

    async fn remove_from_wishlist(&self, user_id: &str, product_id: i64) -> Result<Wishlist, ShopError>;

    /// Puts one unit of a saved product in the cart and takes it off the wishlist, atomically. The usual cart
    /// limits apply; if the cart line is already at its limit, nothing changes.
    async fn move_to_cart(&self, user_id: &str, product_id: i64, policy: &ShopPolicy) -> Result<Cart, ShopError>;
}
