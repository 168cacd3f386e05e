use serde::{Deserialize, Serialize};
use shop_common::Money;

/// Maximum quantity of a single product per cart line.
pub const MAX_LINE_QUANTITY: i64 = 5;
/// How many times one user may use the same coupon.
pub const MAX_COUPON_USES_PER_USER: i64 = 5;
/// Page size for wallet transaction and coupon listings.
pub const DEFAULT_PAGE_SIZE: i64 = 5;

/// The business constants that the engine enforces. The server loads overrides from its configuration; everything
/// else uses [`ShopPolicy::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopPolicy {
    pub max_line_quantity: i64,
    pub max_coupon_uses_per_user: i64,
    /// Cash-on-delivery is refused for orders whose payable total is above this amount
    pub cod_ceiling: Money,
    /// Credited to every wallet when it is first opened
    pub welcome_bonus: Money,
    pub referrer_bonus: Money,
    pub referee_bonus: Money,
    /// Upper bound for percentage category offers
    pub max_offer_percent: i64,
    /// A flat category offer may not exceed this percentage of the cheapest product in the category
    pub flat_offer_ceiling_percent: i64,
    /// Upper bound for percentage coupons
    pub max_coupon_percent: i64,
    pub page_size: i64,
}

impl Default for ShopPolicy {
    fn default() -> Self {
        Self {
            max_line_quantity: MAX_LINE_QUANTITY,
            max_coupon_uses_per_user: MAX_COUPON_USES_PER_USER,
            cod_ceiling: Money::from_major(1000),
            welcome_bonus: Money::from_major(4000),
            referrer_bonus: Money::from_major(200),
            referee_bonus: Money::from_major(100),
            max_offer_percent: 50,
            flat_offer_ceiling_percent: 50,
            max_coupon_percent: 50,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
