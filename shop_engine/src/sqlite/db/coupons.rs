use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use super::is_unique_violation;
use crate::{
    db_types::{Coupon, NewCoupon},
    shop_api::{errors::ShopError, wallet_objects::page_offset},
};

pub async fn insert_coupon(coupon: NewCoupon, conn: &mut SqliteConnection) -> Result<Coupon, ShopError> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO coupons (name, discount_type, discount_value, min_price, max_price, expiry_date, usage_limit,
                created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(coupon.name.trim())
    .bind(coupon.discount_type)
    .bind(coupon.discount_value)
    .bind(coupon.min_price)
    .bind(coupon.max_price)
    .bind(coupon.expiry_date)
    .bind(coupon.usage_limit)
    .bind(Utc::now())
    .fetch_one(conn)
    .await;
    match result {
        Ok(coupon) => Ok(coupon),
        Err(e) if is_unique_violation(&e) => Err(ShopError::DuplicateCoupon),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_coupon(id: i64, conn: &mut SqliteConnection) -> Result<Option<Coupon>, sqlx::Error> {
    let coupon = sqlx::query_as("SELECT * FROM coupons WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(coupon)
}

pub async fn delete_coupon(id: i64, conn: &mut SqliteConnection) -> Result<(), ShopError> {
    let result = sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(ShopError::CouponNotFound);
    }
    Ok(())
}

/// Newest coupons first. `page` is 1-based.
pub async fn fetch_coupons(page: i64, page_size: i64, conn: &mut SqliteConnection) -> Result<Vec<Coupon>, sqlx::Error> {
    let offset = page_offset(page, page_size);
    let coupons = sqlx::query_as("SELECT * FROM coupons ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2")
        .bind(page_size)
        .bind(offset)
        .fetch_all(conn)
        .await?;
    Ok(coupons)
}

pub async fn count_coupons(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM coupons").fetch_one(conn).await?;
    Ok(count)
}

/// The number of orders `user_id` has placed with the coupon.
pub async fn user_coupon_uses(user_id: &str, coupon_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let uses: Option<i64> = sqlx::query_scalar("SELECT uses FROM coupon_usages WHERE user_id = $1 AND coupon_id = $2")
        .bind(user_id)
        .bind(coupon_id)
        .fetch_optional(conn)
        .await?;
    Ok(uses.unwrap_or(0))
}

/// Coupons that `user_id` could still use at `now`: unexpired, under the global usage limit, and used fewer than
/// `max_uses_per_user` times by this user.
pub async fn fetch_available_coupons(
    user_id: &str,
    now: DateTime<Utc>,
    max_uses_per_user: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Coupon>, sqlx::Error> {
    let coupons = sqlx::query_as(
        r#"
            SELECT * FROM coupons
            WHERE expiry_date >= $1
              AND used_count < usage_limit
              AND id NOT IN (SELECT coupon_id FROM coupon_usages WHERE user_id = $2 AND uses >= $3)
            ORDER BY expiry_date ASC
        "#,
    )
    .bind(now)
    .bind(user_id)
    .bind(max_uses_per_user)
    .fetch_all(conn)
    .await?;
    Ok(coupons)
}

/// Records one more use of the coupon by `user_id`.
///
/// Both counters are bumped with conditional writes, so the global limit and the per-user cap hold even when the same
/// coupon is redeemed concurrently.
pub async fn record_coupon_use(
    coupon: &Coupon,
    user_id: &str,
    max_uses_per_user: i64,
    conn: &mut SqliteConnection,
) -> Result<(), ShopError> {
    let result = sqlx::query("UPDATE coupons SET used_count = used_count + 1 WHERE id = $1 AND used_count < usage_limit")
        .bind(coupon.id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ShopError::UsageLimitReached(coupon.name.clone()));
    }
    let result = sqlx::query(
        r#"
            INSERT INTO coupon_usages (user_id, coupon_id, uses) VALUES ($1, $2, 1)
            ON CONFLICT (user_id, coupon_id) DO UPDATE SET uses = uses + 1 WHERE uses < $3
        "#,
    )
    .bind(user_id)
    .bind(coupon.id)
    .bind(max_uses_per_user)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ShopError::UsageLimitReached(coupon.name.clone()));
    }
    debug!("🎟️ Coupon {} redeemed by {user_id}", coupon.name);
    Ok(())
}
