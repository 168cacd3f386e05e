use crate::{
    db_types::{Coupon, NewCoupon},
    policy::ShopPolicy,
    shop_api::errors::ShopError,
};

/// Coupon administration and lookup. Coupons are redeemed as part of order placement (see
/// [`crate::traits::OrderFlowManagement::place_order`]), not through this trait.
#[allow(async_fn_in_trait)]
pub trait CouponManagement {
    async fn create_coupon(&self, coupon: NewCoupon, policy: &ShopPolicy) -> Result<Coupon, ShopError>;

    async fn delete_coupon(&self, id: i64) -> Result<(), ShopError>;

    async fn fetch_coupon(&self, id: i64) -> Result<Option<Coupon>, ShopError>;

    /// Returns one page of coupons (newest first) and the total number of coupons.
    async fn fetch_coupons(&self, page: i64, page_size: i64) -> Result<(Vec<Coupon>, i64), ShopError>;

    /// Coupons the user could still redeem right now.
    async fn fetch_available_coupons(&self, user_id: &str, policy: &ShopPolicy) -> Result<Vec<Coupon>, ShopError>;
}
