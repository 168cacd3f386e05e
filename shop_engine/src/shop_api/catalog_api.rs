use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Category, CategoryOffer, NewCategory, NewCategoryOffer, NewProduct, Product},
    policy::ShopPolicy,
    shop_api::errors::ShopError,
    traits::CatalogManagement,
};

/// Administration of categories, products, stock levels and category offers.
pub struct CatalogApi<B> {
    db: B,
    policy: ShopPolicy,
}

impl<B: Debug> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi ({:?})", self.db)
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, policy: ShopPolicy::default() }
    }

    pub fn with_policy(mut self, policy: ShopPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub async fn create_category(&self, category: NewCategory) -> Result<Category, ShopError> {
        self.db.create_category(category).await
    }

    pub async fn categories(&self) -> Result<Vec<Category>, ShopError> {
        self.db.fetch_categories().await
    }

    pub async fn block_category(&self, id: i64, blocked: bool) -> Result<Category, ShopError> {
        self.db.set_category_blocked(id, blocked).await
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<Product, ShopError> {
        self.db.create_product(product).await
    }

    pub async fn product(&self, id: i64) -> Result<Product, ShopError> {
        self.db.fetch_product(id).await?.ok_or(ShopError::ProductNotFound(id))
    }

    pub async fn products(&self, category_id: Option<i64>) -> Result<Vec<Product>, ShopError> {
        self.db.fetch_products(category_id).await
    }

    pub async fn block_product(&self, id: i64, blocked: bool) -> Result<Product, ShopError> {
        self.db.set_product_blocked(id, blocked).await
    }

    pub async fn set_stock(&self, id: i64, stock: i64) -> Result<Product, ShopError> {
        if stock < 0 {
            return Err(ShopError::Validation("Stock cannot be negative".into()));
        }
        self.db.set_product_stock(id, stock).await
    }

    /// Adds an offer to a category. The offer becomes the category's current offer.
    pub async fn create_offer(&self, offer: NewCategoryOffer) -> Result<CategoryOffer, ShopError> {
        let category_id = offer.category_id;
        let offer = self.db.create_offer(offer, &self.policy).await?;
        info!("🗃️ Offer #{} ({}) created for category #{category_id}", offer.id, offer.discount());
        Ok(offer)
    }

    pub async fn offers(&self, category_id: Option<i64>) -> Result<Vec<CategoryOffer>, ShopError> {
        self.db.fetch_offers(category_id).await
    }

    pub async fn set_offer_active(&self, id: i64, active: bool) -> Result<CategoryOffer, ShopError> {
        self.db.set_offer_active(id, active).await
    }
}
