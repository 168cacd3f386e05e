use chrono::Utc;
use log::trace;
use shop_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Cart, CartItem},
    shop_api::{cart_objects::CartLine, errors::ShopError},
};

/// Assembles a cart from its lines. The total is always derived from the lines, never stored.
pub fn cart_from_items(user_id: &str, items: Vec<CartItem>) -> Cart {
    let total_price = items.iter().map(CartItem::line_total).sum::<Money>();
    Cart { user_id: user_id.to_string(), items, total_price }
}

pub async fn fetch_cart_items(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM cart_items WHERE user_id = $1 ORDER BY id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_cart(user_id: &str, conn: &mut SqliteConnection) -> Result<Cart, sqlx::Error> {
    let items = fetch_cart_items(user_id, conn).await?;
    Ok(cart_from_items(user_id, items))
}

pub async fn fetch_cart_item(
    user_id: &str,
    item_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<CartItem>, sqlx::Error> {
    let item = sqlx::query_as("SELECT * FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(item)
}

pub async fn fetch_cart_item_for_product(
    user_id: &str,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<CartItem>, sqlx::Error> {
    let item = sqlx::query_as("SELECT * FROM cart_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(item)
}

/// Writes a cart line for the product, replacing the quantity and price of any existing line for the same product.
pub async fn upsert_cart_line(
    user_id: &str,
    line: CartLine,
    conn: &mut SqliteConnection,
) -> Result<CartItem, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO cart_items (user_id, product_id, name, quantity, price, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, product_id) DO UPDATE
                SET quantity = excluded.quantity, price = excluded.price, name = excluded.name
            RETURNING id, user_id, product_id, name, quantity, price;
        "#,
    )
    .bind(user_id)
    .bind(line.product_id)
    .bind(line.name)
    .bind(line.quantity)
    .bind(line.price)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    trace!("🛒️ Cart line saved for {user_id}: {item:?}");
    Ok(item)
}

pub async fn set_item_quantity_and_price(
    item_id: i64,
    quantity: i64,
    price: Money,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE cart_items SET quantity = $1, price = $2 WHERE id = $3")
        .bind(quantity)
        .bind(price)
        .bind(item_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_item_price(item_id: i64, price: Money, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE cart_items SET price = $1 WHERE id = $2").bind(price).bind(item_id).execute(conn).await?;
    Ok(())
}

pub async fn delete_cart_item(user_id: &str, item_id: i64, conn: &mut SqliteConnection) -> Result<(), ShopError> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ShopError::CartItemNotFound(item_id));
    }
    Ok(())
}

pub async fn clear_cart(user_id: &str, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(conn).await?;
    Ok(result.rows_affected())
}
