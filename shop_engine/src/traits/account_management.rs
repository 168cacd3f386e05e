use crate::{
    db_types::{Address, AddressUpdate, NewAddress, User},
    policy::ShopPolicy,
    shop_api::{errors::ShopError, wallet_objects::ReferralOutcome},
};

/// Shop-side user records: profile flags, the address book, and referrals.
///
/// User ids come from the authentication layer. A user record is created the first time an id is seen.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    async fn fetch_or_create_user(&self, user_id: &str) -> Result<User, ShopError>;

    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, ShopError>;

    /// Blocked users cannot add to their cart or place orders.
    async fn set_user_blocked(&self, user_id: &str, blocked: bool) -> Result<User, ShopError>;

    async fn add_address(&self, user_id: &str, address: NewAddress) -> Result<Address, ShopError>;

    async fn fetch_addresses(&self, user_id: &str) -> Result<Vec<Address>, ShopError>;

    /// Applies a partial edit to one of the user's addresses. The edited address must still be valid as a whole.
    async fn update_address(
        &self,
        user_id: &str,
        address_id: i64,
        update: AddressUpdate,
    ) -> Result<Address, ShopError>;

    async fn delete_address(&self, user_id: &str, address_id: i64) -> Result<(), ShopError>;

    /// Links `user_id` to the owner of `code` and credits both wallets with the referral bonuses, atomically.
    ///
    /// ## Failure modes:
    /// - No user has this referral code.
    /// - The code is the user's own.
    /// - The user has already been referred.
    async fn apply_referral(
        &self,
        user_id: &str,
        code: &str,
        policy: &ShopPolicy,
    ) -> Result<ReferralOutcome, ShopError>;
}
