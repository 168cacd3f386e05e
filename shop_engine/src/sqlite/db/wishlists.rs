use chrono::Utc;
use log::trace;
use shop_common::Money;
use sqlx::SqliteConnection;

use super::is_unique_violation;
use crate::{
    db_types::{Wishlist, WishlistItem},
    shop_api::errors::ShopError,
};

pub fn wishlist_from_items(user_id: &str, items: Vec<WishlistItem>) -> Wishlist {
    let total_price = items.iter().map(|i| i.price).sum::<Money>();
    Wishlist { user_id: user_id.to_string(), items, total_price }
}

pub async fn fetch_wishlist_items(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<WishlistItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM wishlist_items WHERE user_id = $1 ORDER BY added_at ASC, id ASC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn fetch_wishlist(user_id: &str, conn: &mut SqliteConnection) -> Result<Wishlist, sqlx::Error> {
    let items = fetch_wishlist_items(user_id, conn).await?;
    Ok(wishlist_from_items(user_id, items))
}

/// Saves a product to the user's wishlist. Each product can only be saved once.
pub async fn insert_wishlist_item(
    user_id: &str,
    product_id: i64,
    name: &str,
    price: Money,
    conn: &mut SqliteConnection,
) -> Result<WishlistItem, ShopError> {
    let result = sqlx::query_as(
        r#"INSERT INTO wishlist_items (user_id, product_id, name, price, added_at) VALUES ($1, $2, $3, $4, $5)
        RETURNING *"#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(name)
    .bind(price)
    .bind(Utc::now())
    .fetch_one(conn)
    .await;
    match result {
        Ok(item) => Ok(item),
        Err(e) if is_unique_violation(&e) => Err(ShopError::AlreadyInWishlist(name.to_string())),
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_wishlist_item(user_id: &str, product_id: i64, conn: &mut SqliteConnection) -> Result<(), ShopError> {
    let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ShopError::WishlistItemNotFound(product_id));
    }
    trace!("🗃️ Product #{product_id} removed from {user_id}'s wishlist");
    Ok(())
}

pub async fn set_wishlist_price(item_id: i64, price: Money, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE wishlist_items SET price = $1 WHERE id = $2").bind(price).bind(item_id).execute(conn).await?;
    Ok(())
}
