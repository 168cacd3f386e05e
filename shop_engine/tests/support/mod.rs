//! Shared setup for the integration tests. Each test binary pulls in what it needs.
#![allow(dead_code)]
use log::*;
use shop_engine::{
    db_types::{Money, NewAddress, NewCategory, NewProduct, PaymentMethod},
    order_objects::CheckoutRequest,
    test_utils::new_test_db,
    traits::OrderFlowManagement,
    AccountApi,
    CartApi,
    CatalogApi,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn setup() -> SqliteDatabase {
    new_test_db().await
}

pub async fn tear_down(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.pool().close().await;
    if let Err(e) = Sqlite::drop_database(&url).await {
        error!("🚀️ Failed to drop database {url}: {e}");
    }
}

/// Creates a product (in a category of its own) and returns its id.
pub async fn stock_product(db: &SqliteDatabase, name: &str, price: i64, stock: i64) -> i64 {
    let catalog = CatalogApi::new(db.clone());
    let category =
        catalog.create_category(NewCategory { name: format!("{name} shelf") }).await.expect("Error creating category");
    let product = NewProduct {
        name: name.to_string(),
        description: String::new(),
        category_id: category.id,
        images: vec![],
        stock,
        sales_price: Money::from_major(price),
    };
    catalog.create_product(product).await.expect("Error creating product").id
}

pub async fn address_for(db: &SqliteDatabase, user: &str) -> i64 {
    let address = NewAddress {
        name: user.to_string(),
        phone: "+91 98450 12345".into(),
        locality: "Park Street".into(),
        district: "Kolkata".into(),
        state: "West Bengal".into(),
        pincode: "700016".into(),
    };
    AccountApi::new(db.clone()).add_address(user, address).await.expect("Error adding address").id
}

pub async fn fill_cart(db: &SqliteDatabase, user: &str, product_id: i64, quantity: i64) {
    CartApi::new(db.clone()).add_item(user, product_id, quantity).await.expect("Error adding to cart");
}

/// A checkout request for the user's first address, creating one if needed.
pub async fn checkout_request(db: &SqliteDatabase, user: &str, method: PaymentMethod) -> CheckoutRequest {
    let accounts = AccountApi::new(db.clone());
    let address_id = match accounts.addresses(user).await.expect("Error fetching addresses").first() {
        Some(a) => a.id,
        None => address_for(db, user).await,
    };
    CheckoutRequest { address_id, payment_method: method, coupon_id: None, idempotency_key: None }
}
