use chrono::{DateTime, Utc};
use shop_common::Money;

use crate::{
    db_types::{Coupon, Discount, DiscountType, NewCategoryOffer, NewCoupon},
    policy::ShopPolicy,
    shop_api::errors::ShopError,
};

fn invalid<S: Into<String>>(msg: S) -> ShopError {
    ShopError::Validation(msg.into())
}

/// Checks a coupon definition before it is stored.
pub fn validate_new_coupon(coupon: &NewCoupon, policy: &ShopPolicy, now: DateTime<Utc>) -> Result<(), ShopError> {
    if coupon.name.trim().is_empty() {
        return Err(invalid("Coupon name is required"));
    }
    if coupon.discount_value <= 0 {
        return Err(invalid("Discount value must be greater than zero"));
    }
    if coupon.min_price.is_negative() {
        return Err(invalid("Minimum price cannot be negative"));
    }
    if coupon.usage_limit < 0 {
        return Err(invalid("Usage limit cannot be negative"));
    }
    if coupon.expiry_date <= now {
        return Err(invalid("Expiry date must be in the future"));
    }
    match coupon.discount_type {
        DiscountType::Flat => {
            if !coupon.min_price.is_positive() {
                return Err(invalid("Flat coupons require a minimum order price"));
            }
            if Money::from(coupon.discount_value) * 2 > coupon.min_price {
                return Err(invalid("A flat discount can be at most half of the minimum order price"));
            }
        },
        DiscountType::Percentage => {
            if coupon.discount_value > policy.max_coupon_percent {
                return Err(invalid(format!(
                    "Percentage coupons cannot exceed {}%",
                    policy.max_coupon_percent
                )));
            }
            match coupon.max_price {
                None => return Err(invalid("Percentage coupons require a maximum order price")),
                Some(max) if max <= coupon.min_price => {
                    return Err(invalid("Maximum order price must be greater than the minimum order price"))
                },
                Some(_) => {},
            }
        },
    }
    Ok(())
}

/// Checks a category offer definition before it is stored. `cheapest` is the lowest base price currently in the
/// category, if the category has any products.
pub fn validate_new_offer(
    offer: &NewCategoryOffer,
    cheapest: Option<Money>,
    policy: &ShopPolicy,
) -> Result<(), ShopError> {
    if offer.discount_value <= 0 {
        return Err(invalid("Discount value must be greater than zero"));
    }
    if offer.expiry_date <= offer.start_date {
        return Err(invalid("Expiry date must be after the start date"));
    }
    match offer.discount_type {
        DiscountType::Percentage if offer.discount_value > policy.max_offer_percent => {
            Err(invalid(format!("Percentage offers cannot exceed {}%", policy.max_offer_percent)))
        },
        DiscountType::Flat => match cheapest {
            Some(price) if Money::from(offer.discount_value) > price.percent(policy.flat_offer_ceiling_percent) => {
                Err(invalid(format!(
                    "A flat offer can be at most {}% of the cheapest product in the category ({price})",
                    policy.flat_offer_ceiling_percent
                )))
            },
            _ => Ok(()),
        },
        DiscountType::Percentage => Ok(()),
    }
}

/// Checks that `user_id`'s order with the given `subtotal` may use `coupon`. `user_uses` is the number of orders
/// this user has already placed with the coupon.
pub fn check_coupon_applicable(
    coupon: &Coupon,
    user_uses: i64,
    subtotal: Money,
    now: DateTime<Utc>,
    policy: &ShopPolicy,
) -> Result<(), ShopError> {
    if coupon.is_expired_at(now) {
        return Err(ShopError::CouponExpired(coupon.name.clone()));
    }
    if user_uses >= policy.max_coupon_uses_per_user || coupon.used_count >= coupon.usage_limit {
        return Err(ShopError::UsageLimitReached(coupon.name.clone()));
    }
    if subtotal < coupon.min_price {
        return Err(invalid(format!("A minimum purchase of {} is required to use this coupon", coupon.min_price)));
    }
    if let (DiscountType::Percentage, Some(max)) = (coupon.discount_type, coupon.max_price) {
        if subtotal > max {
            return Err(invalid(format!("This coupon is only valid for orders up to {max}")));
        }
    }
    Ok(())
}

/// The discount a coupon grants on an order subtotal. Never more than the subtotal itself.
pub fn coupon_discount(coupon: &Coupon, subtotal: Money) -> Money {
    let discount = match coupon.discount() {
        Discount::Flat(amount) => amount,
        Discount::Percentage(percent) => subtotal.percent(percent),
    };
    discount.min(subtotal).floor_zero()
}

/// Splits `total` across order lines in proportion to their quantities.
///
/// Each line gets `total * qty / Σqty` rounded down to the minor unit, and the cents left over go one at a time to
/// the lines with the largest remainders. The shares are never negative and always add up to `total` exactly.
pub fn apportion_discount(total: Money, quantities: &[i64]) -> Vec<Money> {
    let total_qty: i64 = quantities.iter().sum();
    if total_qty <= 0 || !total.is_positive() {
        return vec![Money::ZERO; quantities.len()];
    }
    let total_value = i128::from(total.value());
    let denominator = i128::from(total_qty);
    let mut shares = Vec::with_capacity(quantities.len());
    let mut remainders = Vec::with_capacity(quantities.len());
    for (i, qty) in quantities.iter().enumerate() {
        let numerator = total_value * i128::from(*qty);
        shares.push(numerator / denominator);
        remainders.push((numerator % denominator, i));
    }
    let mut leftover = total_value - shares.iter().sum::<i128>();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for (_, i) in remainders {
        if leftover <= 0 {
            break;
        }
        shares[i] += 1;
        leftover -= 1;
    }
    #[allow(clippy::cast_possible_truncation)]
    shares.into_iter().map(|s| Money::from(s as i64)).collect()
}
