use chrono::Utc;
use log::{debug, warn};
use sqlx::SqliteConnection;

use super::is_unique_violation;
use crate::{db_types::User, helpers::new_referral_code, shop_api::errors::ShopError};

const REFERRAL_CODE_ATTEMPTS: usize = 5;

pub async fn fetch_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn fetch_user_by_referral_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE referral_code = $1")
        .bind(code.trim().to_uppercase())
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

/// Returns the user record for `user_id`, creating it (with a fresh referral code) if this is the first time the id
/// has been seen.
pub async fn fetch_or_create_user(user_id: &str, conn: &mut SqliteConnection) -> Result<User, ShopError> {
    if let Some(user) = fetch_user(user_id, conn).await? {
        return Ok(user);
    }
    for _ in 0..REFERRAL_CODE_ATTEMPTS {
        let code = new_referral_code();
        let now = Utc::now();
        let result = sqlx::query_as(
            r#"INSERT INTO users (id, referral_code, created_at, updated_at) VALUES ($1, $2, $3, $3)
            ON CONFLICT (id) DO NOTHING RETURNING *"#,
        )
        .bind(user_id)
        .bind(&code)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await;
        match result {
            Ok(Some(user)) => {
                debug!("🗃️ New user {user_id} created with referral code {code}");
                return Ok(user);
            },
            // Someone else created the user in the meantime
            Ok(None) => return fetch_user(user_id, conn).await?.ok_or_else(|| ShopError::UserNotFound(user_id.into())),
            Err(e) if is_unique_violation(&e) => {
                warn!("🗃️ Referral code {code} is already taken. Trying another one.");
            },
            Err(e) => return Err(e.into()),
        }
    }
    Err(ShopError::DatabaseError(format!("Could not allocate a unique referral code for {user_id}")))
}

pub async fn set_blocked(user_id: &str, blocked: bool, conn: &mut SqliteConnection) -> Result<User, ShopError> {
    let user: Option<User> =
        sqlx::query_as("UPDATE users SET is_blocked = $1, updated_at = $2 WHERE id = $3 RETURNING *")
            .bind(blocked)
            .bind(Utc::now())
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
    user.ok_or_else(|| ShopError::UserNotFound(user_id.to_string()))
}

/// Records the referrer for `user_id`. This only succeeds once per user; subsequent calls return
/// [`ShopError::AlreadyReferred`].
pub async fn set_referred_by(user_id: &str, referrer_id: &str, conn: &mut SqliteConnection) -> Result<(), ShopError> {
    let result = sqlx::query("UPDATE users SET referred_by = $1, updated_at = $2 WHERE id = $3 AND referred_by IS NULL")
        .bind(referrer_id)
        .bind(Utc::now())
        .bind(user_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ShopError::AlreadyReferred);
    }
    Ok(())
}
