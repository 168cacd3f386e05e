use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Address, NewAddress},
    shop_api::errors::ShopError,
};

pub async fn insert_address(
    user_id: &str,
    address: NewAddress,
    conn: &mut SqliteConnection,
) -> Result<Address, sqlx::Error> {
    let address = sqlx::query_as(
        r#"
            INSERT INTO addresses (user_id, name, phone, locality, district, state, pincode, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(address.name.trim())
    .bind(address.phone.trim())
    .bind(address.locality.trim())
    .bind(address.district.trim())
    .bind(address.state.trim())
    .bind(address.pincode.trim())
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(address)
}

pub async fn fetch_addresses(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Address>, sqlx::Error> {
    let addresses =
        sqlx::query_as("SELECT * FROM addresses WHERE user_id = $1 ORDER BY id ASC").bind(user_id).fetch_all(conn).await?;
    Ok(addresses)
}

/// Fetches the address with the given id, but only if it belongs to `user_id`.
pub async fn fetch_address_for_user(
    user_id: &str,
    address_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Address, ShopError> {
    let address: Option<Address> = sqlx::query_as("SELECT * FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(address_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    address.ok_or(ShopError::AddressNotFound(address_id))
}

/// Overwrites every field of the user's address. Fails if the address does not belong to `user_id`.
pub async fn update_address(
    user_id: &str,
    address_id: i64,
    address: NewAddress,
    conn: &mut SqliteConnection,
) -> Result<Address, ShopError> {
    let updated: Option<Address> = sqlx::query_as(
        r#"
            UPDATE addresses SET name = $1, phone = $2, locality = $3, district = $4, state = $5, pincode = $6
            WHERE id = $7 AND user_id = $8
            RETURNING *;
        "#,
    )
    .bind(address.name.trim())
    .bind(address.phone.trim())
    .bind(address.locality.trim())
    .bind(address.district.trim())
    .bind(address.state.trim())
    .bind(address.pincode.trim())
    .bind(address_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    updated.ok_or(ShopError::AddressNotFound(address_id))
}

pub async fn delete_address(user_id: &str, address_id: i64, conn: &mut SqliteConnection) -> Result<(), ShopError> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
        .bind(address_id)
        .bind(user_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ShopError::AddressNotFound(address_id));
    }
    Ok(())
}
