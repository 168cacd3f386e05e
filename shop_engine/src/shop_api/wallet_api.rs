use std::fmt::Debug;

use log::*;

use crate::{
    db_types::WalletTransaction,
    policy::ShopPolicy,
    shop_api::{
        errors::ShopError,
        wallet_objects::{WalletAdjustment, WalletView},
    },
    traits::WalletManagement,
};

pub struct WalletApi<B> {
    db: B,
    policy: ShopPolicy,
}

impl<B: Debug> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi ({:?})", self.db)
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, policy: ShopPolicy::default() }
    }

    pub fn with_policy(mut self, policy: ShopPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<B> WalletApi<B>
where B: WalletManagement
{
    /// The wallet balance and one page of its history, newest first. A first visit opens the wallet.
    pub async fn wallet(&self, user_id: &str, page: i64) -> Result<WalletView, ShopError> {
        self.db.fetch_wallet(user_id, page, &self.policy).await
    }

    /// A manual credit or debit by an administrator.
    pub async fn adjust(&self, user_id: &str, adjustment: WalletAdjustment) -> Result<WalletTransaction, ShopError> {
        if !adjustment.amount.is_positive() {
            return Err(ShopError::Validation("Amount must be greater than zero".into()));
        }
        let tx = self.db.adjust_wallet(user_id, adjustment, &self.policy).await?;
        trace!("👛️ Adjustment #{} recorded for {user_id}", tx.id);
        Ok(tx)
    }
}
