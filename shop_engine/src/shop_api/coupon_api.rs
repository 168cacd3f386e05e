use std::fmt::Debug;

use crate::{
    db_types::{Coupon, NewCoupon},
    policy::ShopPolicy,
    shop_api::{errors::ShopError, wallet_objects::page_count},
    traits::CouponManagement,
};

pub struct CouponApi<B> {
    db: B,
    policy: ShopPolicy,
}

impl<B: Debug> Debug for CouponApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CouponApi ({:?})", self.db)
    }
}

/// One page of the coupon listing
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CouponPage {
    pub coupons: Vec<Coupon>,
    pub page: i64,
    pub total_pages: i64,
}

impl<B> CouponApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, policy: ShopPolicy::default() }
    }

    pub fn with_policy(mut self, policy: ShopPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<B> CouponApi<B>
where B: CouponManagement
{
    pub async fn create_coupon(&self, coupon: NewCoupon) -> Result<Coupon, ShopError> {
        self.db.create_coupon(coupon, &self.policy).await
    }

    pub async fn delete_coupon(&self, id: i64) -> Result<(), ShopError> {
        self.db.delete_coupon(id).await
    }

    pub async fn coupon(&self, id: i64) -> Result<Coupon, ShopError> {
        self.db.fetch_coupon(id).await?.ok_or(ShopError::CouponNotFound)
    }

    pub async fn coupons(&self, page: i64) -> Result<CouponPage, ShopError> {
        let page = page.max(1);
        let (coupons, total) = self.db.fetch_coupons(page, self.policy.page_size).await?;
        Ok(CouponPage { coupons, page, total_pages: page_count(total, self.policy.page_size) })
    }

    /// Coupons the user could still apply at checkout
    pub async fn available_coupons(&self, user_id: &str) -> Result<Vec<Coupon>, ShopError> {
        self.db.fetch_available_coupons(user_id, &self.policy).await
    }
}
