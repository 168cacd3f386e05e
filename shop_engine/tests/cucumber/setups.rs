use chrono::{Duration, Utc};
use cucumber::given;
use shop_engine::{
    db_types::{DiscountType, Money, NewCategory, NewCategoryOffer, NewCoupon, NewProduct, TransactionType},
    shop_api::wallet_objects::WalletAdjustment,
};

use crate::cucumber::{shop_world::ShopSystem, ShopWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut ShopWorld) {
    let system = ShopSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a category {string}")]
async fn category(world: &mut ShopWorld, name: String) {
    let category = world.system().catalog.create_category(NewCategory { name: name.clone() }).await.expect("category");
    world.categories.insert(name, category.id);
}

#[given(expr = "a product {string} in {string} priced at {word} with {int} in stock")]
async fn product(world: &mut ShopWorld, name: String, category: String, price: String, stock: i64) {
    let product = NewProduct {
        name: name.clone(),
        description: format!("A fine {name}"),
        category_id: world.category_id(&category),
        images: vec![],
        stock,
        sales_price: price.parse::<Money>().expect("price"),
    };
    let product = world.system().catalog.create_product(product).await.expect("Error creating product");
    world.products.insert(name, product.id);
}

#[given(expr = "a {int}% offer on {string}")]
async fn percentage_offer(world: &mut ShopWorld, percent: i64, category: String) {
    let now = Utc::now();
    let offer = NewCategoryOffer {
        category_id: world.category_id(&category),
        discount_type: DiscountType::Percentage,
        discount_value: percent,
        start_date: now - Duration::hours(1),
        expiry_date: now + Duration::days(1),
    };
    let offer = world.system().catalog.create_offer(offer).await.expect("Error creating offer");
    world.offers.insert(category, offer.id);
}

#[given(expr = "a flat coupon {string} worth {word} for orders of at least {word}")]
async fn flat_coupon(world: &mut ShopWorld, name: String, value: String, min_price: String) {
    let coupon = NewCoupon {
        name: name.clone(),
        discount_type: DiscountType::Flat,
        discount_value: value.parse::<Money>().expect("value").value(),
        min_price: min_price.parse::<Money>().expect("min price"),
        max_price: None,
        expiry_date: Utc::now() + Duration::days(30),
        usage_limit: 100,
    };
    let coupon = world.system().coupons.create_coupon(coupon).await.expect("Error creating coupon");
    world.coupons.insert(name, coupon.id);
}

#[given(expr = "{word} has {word} in their wallet")]
async fn wallet_balance(world: &mut ShopWorld, user: String, amount: String) {
    let target = amount.parse::<Money>().expect("amount");
    let wallets = &world.system().wallets;
    let balance = wallets.wallet(&user, 1).await.expect("Error opening wallet").wallet.balance;
    let (kind, amount) = if target > balance {
        (TransactionType::Credit, target - balance)
    } else {
        (TransactionType::Debit, balance - target)
    };
    if amount.is_positive() {
        let adjustment = WalletAdjustment { kind, amount, description: "Test setup".into(), order_id: None };
        wallets.adjust(&user, adjustment).await.expect("Error adjusting wallet");
    }
}
