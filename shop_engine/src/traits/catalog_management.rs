use crate::{
    db_types::{Category, CategoryOffer, NewCategory, NewCategoryOffer, NewProduct, Product},
    policy::ShopPolicy,
    shop_api::errors::ShopError,
};

/// Store-front administration: categories, products, stock and category offers.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn create_category(&self, category: NewCategory) -> Result<Category, ShopError>;

    async fn fetch_category(&self, id: i64) -> Result<Option<Category>, ShopError>;

    async fn fetch_categories(&self) -> Result<Vec<Category>, ShopError>;

    /// Blocking a category makes every product in it unavailable for new carts and checkouts.
    async fn set_category_blocked(&self, id: i64, blocked: bool) -> Result<Category, ShopError>;

    /// Creates a product. The category must exist.
    async fn create_product(&self, product: NewProduct) -> Result<Product, ShopError>;

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, ShopError>;

    async fn fetch_products(&self, category_id: Option<i64>) -> Result<Vec<Product>, ShopError>;

    async fn set_product_blocked(&self, id: i64, blocked: bool) -> Result<Product, ShopError>;

    async fn set_product_stock(&self, id: i64, stock: i64) -> Result<Product, ShopError>;

    /// Validates and stores a new category offer, and makes it the category's current offer.
    ///
    /// ## Failure modes:
    /// - The category does not exist.
    /// - The offer values break the limits in `policy`.
    /// - Another active offer for the category overlaps the new offer's validity window.
    async fn create_offer(&self, offer: NewCategoryOffer, policy: &ShopPolicy) -> Result<CategoryOffer, ShopError>;

    /// Lists offers, newest first. If `category_id` is given, only offers for that category are returned.
    async fn fetch_offers(&self, category_id: Option<i64>) -> Result<Vec<CategoryOffer>, ShopError>;

    async fn set_offer_active(&self, id: i64, active: bool) -> Result<CategoryOffer, ShopError>;
}
