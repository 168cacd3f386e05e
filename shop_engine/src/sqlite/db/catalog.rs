//! Categories, products, stock levels and category offers.
use chrono::{DateTime, Utc};
use log::{debug, trace};
use shop_common::Money;
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use super::is_unique_violation;
use crate::{
    db_types::{Category, CategoryOffer, NewCategory, NewCategoryOffer, NewProduct, Product},
    helpers::{active_offer, effective_price},
    shop_api::errors::ShopError,
};

/// A product, its category, and the unit price a shopper would pay for it right now.
#[derive(Debug, Clone)]
pub struct PricedProduct {
    pub product: Product,
    pub category: Category,
    pub price: Money,
}

impl PricedProduct {
    /// Fails if the product or its category has been blocked by an admin.
    pub fn check_available(&self) -> Result<(), ShopError> {
        if self.product.is_blocked {
            return Err(ShopError::ProductUnavailable(self.product.name.clone()));
        }
        if self.category.is_blocked {
            return Err(ShopError::CategoryUnavailable(self.category.name.clone()));
        }
        Ok(())
    }
}

//--------------------------------------      Categories      --------------------------------------------------------

pub async fn insert_category(category: NewCategory, conn: &mut SqliteConnection) -> Result<Category, ShopError> {
    let name = category.name.trim().to_string();
    if name.is_empty() {
        return Err(ShopError::Validation("Category name is required".into()));
    }
    let now = Utc::now();
    let result = sqlx::query_as("INSERT INTO categories (name, created_at, updated_at) VALUES ($1, $2, $2) RETURNING *")
        .bind(&name)
        .bind(now)
        .fetch_one(conn)
        .await;
    match result {
        Ok(category) => Ok(category),
        Err(e) if is_unique_violation(&e) => Err(ShopError::Validation(format!("Category {name} already exists"))),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_category(id: i64, conn: &mut SqliteConnection) -> Result<Option<Category>, sqlx::Error> {
    let category = sqlx::query_as("SELECT * FROM categories WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(category)
}

pub async fn fetch_categories(conn: &mut SqliteConnection) -> Result<Vec<Category>, sqlx::Error> {
    let categories = sqlx::query_as("SELECT * FROM categories ORDER BY name ASC").fetch_all(conn).await?;
    Ok(categories)
}

pub async fn set_category_blocked(id: i64, blocked: bool, conn: &mut SqliteConnection) -> Result<Category, ShopError> {
    let category: Option<Category> =
        sqlx::query_as("UPDATE categories SET is_blocked = $1, updated_at = $2 WHERE id = $3 RETURNING *")
            .bind(blocked)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(conn)
            .await?;
    category.ok_or(ShopError::CategoryNotFound(id))
}

//--------------------------------------       Products       --------------------------------------------------------

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let now = Utc::now();
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (name, description, category_id, images, stock, sales_price, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *;
        "#,
    )
    .bind(product.name.trim())
    .bind(product.description)
    .bind(product.category_id)
    .bind(Json(product.images))
    .bind(product.stock)
    .bind(product.sales_price)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_products(
    category_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Product>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM products");
    if let Some(id) = category_id {
        builder.push(" WHERE category_id = ");
        builder.push_bind(id);
    }
    builder.push(" ORDER BY id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let products = builder.build_query_as::<Product>().fetch_all(conn).await?;
    Ok(products)
}

pub async fn set_product_blocked(id: i64, blocked: bool, conn: &mut SqliteConnection) -> Result<Product, ShopError> {
    let product: Option<Product> =
        sqlx::query_as("UPDATE products SET is_blocked = $1, updated_at = $2 WHERE id = $3 RETURNING *")
            .bind(blocked)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(conn)
            .await?;
    product.ok_or(ShopError::ProductNotFound(id))
}

pub async fn set_product_stock(id: i64, stock: i64, conn: &mut SqliteConnection) -> Result<Product, ShopError> {
    if stock < 0 {
        return Err(ShopError::Validation("Stock cannot be negative".into()));
    }
    let product: Option<Product> =
        sqlx::query_as("UPDATE products SET stock = $1, updated_at = $2 WHERE id = $3 RETURNING *")
            .bind(stock)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(conn)
            .await?;
    product.ok_or(ShopError::ProductNotFound(id))
}

/// Takes `quantity` units out of stock. The write only happens if enough stock remains at the moment of the update,
/// so two concurrent checkouts can never drive the stock below zero.
pub async fn decrement_stock(product_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<(), ShopError> {
    let result =
        sqlx::query("UPDATE products SET stock = stock - $1, updated_at = $2 WHERE id = $3 AND stock >= $1")
            .bind(quantity)
            .bind(Utc::now())
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
    if result.rows_affected() == 0 {
        let product = fetch_product(product_id, conn).await?.ok_or(ShopError::ProductNotFound(product_id))?;
        debug!("🗃️ Cannot take {quantity} of product #{product_id} from stock. Only {} left", product.stock);
        return Err(ShopError::InsufficientStock { product: product.name, available: product.stock });
    }
    trace!("🗃️ {quantity} of product #{product_id} taken from stock");
    Ok(())
}

pub async fn restore_stock(product_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<(), ShopError> {
    let result = sqlx::query("UPDATE products SET stock = stock + $1, updated_at = $2 WHERE id = $3")
        .bind(quantity)
        .bind(Utc::now())
        .bind(product_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ShopError::ProductNotFound(product_id));
    }
    trace!("🗃️ {quantity} of product #{product_id} returned to stock");
    Ok(())
}

pub async fn cheapest_price_in_category(
    category_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Money>, sqlx::Error> {
    let price: Option<i64> = sqlx::query_scalar("SELECT MIN(sales_price) FROM products WHERE category_id = $1")
        .bind(category_id)
        .fetch_one(conn)
        .await?;
    Ok(price.map(Money::from))
}

/// Loads a product together with its category and works out its current effective price.
pub async fn price_product(
    product_id: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<PricedProduct, ShopError> {
    let product = fetch_product(product_id, conn).await?.ok_or(ShopError::ProductNotFound(product_id))?;
    let category =
        fetch_category(product.category_id, conn).await?.ok_or(ShopError::CategoryNotFound(product.category_id))?;
    let offers = fetch_offers_for_category(category.id, conn).await?;
    let price = effective_price(product.sales_price, active_offer(&offers, now), now);
    Ok(PricedProduct { product, category, price })
}

//--------------------------------------        Offers        --------------------------------------------------------

/// Stores a new offer and makes it the category's current offer.
///
/// The caller is responsible for validating the offer values. This function only enforces that no other active
/// offer for the same category overlaps the new offer's validity window.
pub async fn insert_offer(offer: NewCategoryOffer, conn: &mut SqliteConnection) -> Result<CategoryOffer, ShopError> {
    let existing = fetch_offers_for_category(offer.category_id, conn).await?;
    if existing.iter().any(|o| o.is_active && o.overlaps(offer.start_date, offer.expiry_date)) {
        return Err(ShopError::OverlappingOffer);
    }
    let now = Utc::now();
    let offer: CategoryOffer = sqlx::query_as(
        r#"
            INSERT INTO category_offers (category_id, discount_type, discount_value, start_date, expiry_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(offer.category_id)
    .bind(offer.discount_type)
    .bind(offer.discount_value)
    .bind(offer.start_date)
    .bind(offer.expiry_date)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    sqlx::query("UPDATE categories SET current_offer_id = $1, updated_at = $2 WHERE id = $3")
        .bind(offer.id)
        .bind(now)
        .bind(offer.category_id)
        .execute(conn)
        .await?;
    debug!("🗃️ Offer #{} ({}) created for category #{}", offer.id, offer.discount(), offer.category_id);
    Ok(offer)
}

pub async fn fetch_offer(id: i64, conn: &mut SqliteConnection) -> Result<Option<CategoryOffer>, sqlx::Error> {
    let offer = sqlx::query_as("SELECT * FROM category_offers WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(offer)
}

pub async fn fetch_offers_for_category(
    category_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<CategoryOffer>, sqlx::Error> {
    let offers = sqlx::query_as("SELECT * FROM category_offers WHERE category_id = $1 ORDER BY created_at DESC")
        .bind(category_id)
        .fetch_all(conn)
        .await?;
    Ok(offers)
}

pub async fn fetch_all_offers(conn: &mut SqliteConnection) -> Result<Vec<CategoryOffer>, sqlx::Error> {
    let offers = sqlx::query_as("SELECT * FROM category_offers ORDER BY created_at DESC").fetch_all(conn).await?;
    Ok(offers)
}

/// Switches an offer on or off. Switching an offer on is refused if it would overlap another active offer.
pub async fn set_offer_active(id: i64, active: bool, conn: &mut SqliteConnection) -> Result<CategoryOffer, ShopError> {
    let offer = fetch_offer(id, conn).await?.ok_or(ShopError::OfferNotFound(id))?;
    if active {
        let others = fetch_offers_for_category(offer.category_id, conn).await?;
        let overlap = others
            .iter()
            .filter(|o| o.id != offer.id)
            .any(|o| o.is_active && o.overlaps(offer.start_date, offer.expiry_date));
        if overlap {
            return Err(ShopError::OverlappingOffer);
        }
    }
    let offer: CategoryOffer = sqlx::query_as("UPDATE category_offers SET is_active = $1 WHERE id = $2 RETURNING *")
        .bind(active)
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(offer)
}
