//! The wallet ledger. A wallet's balance only ever changes together with a matching transaction row, so the balance
//! always equals the sum of credits less the sum of debits.
use chrono::Utc;
use log::{debug, trace};
use shop_common::Money;
use sqlx::SqliteConnection;

use super::is_unique_violation;
use crate::{
    db_types::{TransactionType, Wallet, WalletTransaction},
    shop_api::{
        errors::ShopError,
        wallet_objects::{page_offset, WalletEntry},
    },
};

pub const WELCOME_BONUS_DESCRIPTION: &str = "Welcome bonus credited to your wallet!";

pub async fn fetch_wallet(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<Wallet>, sqlx::Error> {
    let wallet = sqlx::query_as("SELECT * FROM wallets WHERE user_id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(wallet)
}

/// Returns the user's wallet, opening it with `welcome_bonus` if it does not exist yet.
///
/// The user record must already exist.
pub async fn fetch_or_create_wallet(
    user_id: &str,
    welcome_bonus: Money,
    conn: &mut SqliteConnection,
) -> Result<Wallet, ShopError> {
    if let Some(wallet) = fetch_wallet(user_id, conn).await? {
        return Ok(wallet);
    }
    let now = Utc::now();
    let wallet: Option<Wallet> = sqlx::query_as(
        r#"INSERT INTO wallets (user_id, balance, created_at, updated_at) VALUES ($1, 0, $2, $2)
        ON CONFLICT (user_id) DO NOTHING RETURNING *"#,
    )
    .bind(user_id)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;
    match wallet {
        Some(_) if welcome_bonus.is_positive() => {
            debug!("👛️ New wallet opened for {user_id}. Crediting welcome bonus of {welcome_bonus}");
            let entry = WalletEntry::new(welcome_bonus, WELCOME_BONUS_DESCRIPTION)
                .with_reference(format!("welcome:{user_id}"));
            credit(user_id, entry, conn).await?;
            fetch_wallet(user_id, conn).await?.ok_or_else(|| ShopError::UserNotFound(user_id.to_string()))
        },
        Some(wallet) => {
            debug!("👛️ New wallet opened for {user_id}");
            Ok(wallet)
        },
        None => fetch_wallet(user_id, conn).await?.ok_or_else(|| ShopError::UserNotFound(user_id.to_string())),
    }
}

async fn insert_transaction(
    user_id: &str,
    kind: TransactionType,
    entry: WalletEntry,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, ShopError> {
    if !entry.amount.is_positive() {
        return Err(ShopError::Validation("Wallet transaction amounts must be greater than zero".into()));
    }
    let reference = entry.reference.clone();
    let result = sqlx::query_as(
        r#"
            INSERT INTO wallet_transactions (user_id, kind, amount, description, order_id, reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(kind)
    .bind(entry.amount)
    .bind(entry.description)
    .bind(entry.order_id)
    .bind(entry.reference)
    .bind(Utc::now())
    .fetch_one(conn)
    .await;
    match result {
        Ok(tx) => Ok(tx),
        Err(e) if is_unique_violation(&e) => {
            let reference = reference.unwrap_or_default();
            debug!("👛️ A wallet transaction with reference {reference} already exists");
            Err(ShopError::AlreadyProcessed(format!("Wallet transaction {reference}")))
        },
        Err(e) => Err(e.into()),
    }
}

/// Adds money to an existing wallet.
pub async fn credit(
    user_id: &str,
    entry: WalletEntry,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, ShopError> {
    let tx = insert_transaction(user_id, TransactionType::Credit, entry, conn).await?;
    let result = sqlx::query("UPDATE wallets SET balance = balance + $1, updated_at = $2 WHERE user_id = $3")
        .bind(tx.amount)
        .bind(Utc::now())
        .bind(user_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ShopError::UserNotFound(user_id.to_string()));
    }
    trace!("👛️ {} credited to {user_id}: {}", tx.amount, tx.description);
    Ok(tx)
}

/// Takes money out of an existing wallet. The write is conditional on the balance covering the amount, so
/// concurrent debits can never overdraw the wallet.
pub async fn debit(
    user_id: &str,
    entry: WalletEntry,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, ShopError> {
    let amount = entry.amount;
    let result =
        sqlx::query("UPDATE wallets SET balance = balance - $1, updated_at = $2 WHERE user_id = $3 AND balance >= $1")
            .bind(amount)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
    if result.rows_affected() == 0 {
        let wallet = fetch_wallet(user_id, conn).await?.ok_or_else(|| ShopError::UserNotFound(user_id.to_string()))?;
        return Err(ShopError::InsufficientBalance { balance: wallet.balance, required: amount });
    }
    let tx = insert_transaction(user_id, TransactionType::Debit, entry, conn).await?;
    trace!("👛️ {} debited from {user_id}: {}", tx.amount, tx.description);
    Ok(tx)
}

/// Newest first. `page` is 1-based.
pub async fn fetch_transactions(
    user_id: &str,
    page: i64,
    page_size: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, sqlx::Error> {
    let offset = page_offset(page, page_size);
    let txs = sqlx::query_as(
        "SELECT * FROM wallet_transactions WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(page_size)
    .bind(offset)
    .fetch_all(conn)
    .await?;
    Ok(txs)
}

pub async fn count_transactions(user_id: &str, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM wallet_transactions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}
