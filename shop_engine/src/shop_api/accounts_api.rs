//! User records, address books, blocking and referrals.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Address, AddressUpdate, NewAddress, User},
    policy::ShopPolicy,
    shop_api::{errors::ShopError, wallet_objects::ReferralOutcome},
    traits::AccountManagement,
};

pub struct AccountApi<B> {
    db: B,
    policy: ShopPolicy,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, policy: ShopPolicy::default() }
    }

    pub fn with_policy(mut self, policy: ShopPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    /// The user record for an authenticated id, created on first sight.
    pub async fn user(&self, user_id: &str) -> Result<User, ShopError> {
        self.db.fetch_or_create_user(user_id).await
    }

    pub async fn block_user(&self, user_id: &str, blocked: bool) -> Result<User, ShopError> {
        self.db.set_user_blocked(user_id, blocked).await
    }

    /// Fails with `UserBlocked` if an administrator has blocked this user.
    pub async fn check_not_blocked(&self, user_id: &str) -> Result<(), ShopError> {
        match self.db.fetch_user(user_id).await? {
            Some(user) if user.is_blocked => Err(ShopError::UserBlocked(user_id.to_string())),
            _ => Ok(()),
        }
    }

    pub async fn add_address(&self, user_id: &str, address: NewAddress) -> Result<Address, ShopError> {
        self.db.add_address(user_id, address).await
    }

    pub async fn addresses(&self, user_id: &str) -> Result<Vec<Address>, ShopError> {
        self.db.fetch_addresses(user_id).await
    }

    pub async fn update_address(
        &self,
        user_id: &str,
        address_id: i64,
        update: AddressUpdate,
    ) -> Result<Address, ShopError> {
        if update.is_empty() {
            return Err(ShopError::Validation("Nothing to update".into()));
        }
        self.db.update_address(user_id, address_id, update).await
    }

    pub async fn delete_address(&self, user_id: &str, address_id: i64) -> Result<(), ShopError> {
        self.db.delete_address(user_id, address_id).await
    }

    /// Links the user to whoever owns `code`, and pays both of them the referral bonuses.
    pub async fn apply_referral(&self, user_id: &str, code: &str) -> Result<ReferralOutcome, ShopError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ShopError::Validation("A referral code is required".into()));
        }
        let outcome = self.db.apply_referral(user_id, code, &self.policy).await?;
        debug!("👛️ Referral bonuses paid to {user_id} and {}", outcome.referrer_id);
        Ok(outcome)
    }
}
