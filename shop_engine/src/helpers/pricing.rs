use chrono::{DateTime, Utc};
use shop_common::Money;

use crate::db_types::{CategoryOffer, Discount};

/// Applies a discount rule to a unit price. The result is never negative.
pub fn apply_discount(price: Money, discount: Discount) -> Money {
    let reduced = match discount {
        Discount::Flat(amount) => price - amount,
        Discount::Percentage(percent) => price - price.percent(percent),
    };
    reduced.floor_zero()
}

/// Picks the offer that applies at `now`. Offer creation prevents overlapping active offers, but if legacy data
/// contains more than one, the most recently created wins.
pub fn active_offer(offers: &[CategoryOffer], now: DateTime<Utc>) -> Option<&CategoryOffer> {
    offers.iter().filter(|o| o.is_active_at(now)).max_by_key(|o| (o.created_at, o.id))
}

/// The price a shopper pays for one unit of a product right now: the base price less the category's active offer,
/// if there is one.
pub fn effective_price(base: Money, offer: Option<&CategoryOffer>, now: DateTime<Utc>) -> Money {
    match offer {
        Some(offer) if offer.is_active_at(now) => apply_discount(base, offer.discount()),
        _ => base,
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;
    use crate::db_types::DiscountType;

    fn offer(id: i64, discount_type: DiscountType, value: i64, start: i64, end: i64) -> CategoryOffer {
        let now = Utc::now();
        CategoryOffer {
            id,
            category_id: 1,
            discount_type,
            discount_value: value,
            start_date: now + Duration::days(start),
            expiry_date: now + Duration::days(end),
            is_active: true,
            created_at: now + Duration::seconds(id),
        }
    }

    #[test]
    fn percentage_offer() {
        let now = Utc::now();
        let o = offer(1, DiscountType::Percentage, 20, -1, 1);
        assert_eq!(effective_price(Money::from_major(100), Some(&o), now), Money::from_major(80));
    }

    #[test]
    fn expired_offer_reverts_to_base_price() {
        let o = offer(1, DiscountType::Percentage, 20, -1, 1);
        let later = Utc::now() + Duration::days(2);
        assert_eq!(effective_price(Money::from_major(100), Some(&o), later), Money::from_major(100));
    }

    #[test]
    fn flat_offer_is_floored_at_zero() {
        let now = Utc::now();
        let o = offer(1, DiscountType::Flat, 5_000, -1, 1);
        assert_eq!(effective_price(Money::from_major(30), Some(&o), now), Money::ZERO);
        assert_eq!(effective_price(Money::from_major(80), Some(&o), now), Money::from_major(30));
    }

    #[test]
    fn inactive_flag_disables_offer() {
        let now = Utc::now();
        let mut o = offer(1, DiscountType::Percentage, 20, -1, 1);
        o.is_active = false;
        assert_eq!(effective_price(Money::from_major(100), Some(&o), now), Money::from_major(100));
        assert_eq!(effective_price(Money::from_major(100), None, now), Money::from_major(100));
    }

    #[test]
    fn picks_newest_active_offer() {
        let now = Utc::now();
        let offers = vec![
            offer(1, DiscountType::Percentage, 10, -2, 2),
            offer(2, DiscountType::Percentage, 30, -1, 3),
            offer(3, DiscountType::Percentage, 40, 1, 3),
        ];
        assert_eq!(active_offer(&offers, now).map(|o| o.id), Some(2));
        assert!(active_offer(&offers, now + Duration::days(10)).is_none());
    }
}
