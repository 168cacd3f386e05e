use crate::{
    db_types::WalletTransaction,
    policy::ShopPolicy,
    shop_api::{
        errors::ShopError,
        wallet_objects::{WalletAdjustment, WalletView},
    },
};

/// Read access to wallets, plus manual adjustments.
///
/// Wallets are opened lazily, with the welcome bonus from `policy`, the first time they are needed.
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    /// Returns the wallet balance and one page (1-based, newest first) of its transaction history.
    async fn fetch_wallet(&self, user_id: &str, page: i64, policy: &ShopPolicy) -> Result<WalletView, ShopError>;

    /// Credits or debits the wallet by hand. Debits may not take the balance below zero.
    async fn adjust_wallet(
        &self,
        user_id: &str,
        adjustment: WalletAdjustment,
        policy: &ShopPolicy,
    ) -> Result<WalletTransaction, ShopError>;
}
