use chrono::{Duration, Utc};
use cucumber::{then, when};
use shop_engine::{
    db_types::{Money, OrderStatus, PaymentMethod, PaymentStatus, ReturnDecision},
    order_objects::CheckoutRequest,
    sqlite_db::catalog,
    traits::CatalogManagement,
};

use crate::cucumber::ShopWorld;

fn money(s: &str) -> Money {
    s.parse().unwrap_or_else(|e| panic!("{s} is not an amount: {e}"))
}

//----------------------------------------------   Cart  ----------------------------------------------------

#[when(expr = "{word} adds {int} {string} to the cart")]
async fn add_to_cart(world: &mut ShopWorld, user: String, quantity: i64, product: String) {
    let product_id = world.product_id(&product);
    let result = world.system().carts.add_item(&user, product_id, quantity).await;
    world.record(result);
}

#[then(expr = "{word}'s cart total is {word}")]
async fn cart_total(world: &mut ShopWorld, user: String, total: String) {
    let view = world.system().carts.cart(&user).await.expect("Error fetching cart");
    assert_eq!(view.cart.total_price, money(&total));
}

#[then(expr = "{word}'s cart is empty")]
async fn cart_empty(world: &mut ShopWorld, user: String) {
    let view = world.system().carts.cart(&user).await.expect("Error fetching cart");
    assert!(view.cart.is_empty(), "Cart still has {} lines", view.cart.items.len());
}

//----------------------------------------------   Pricing  ----------------------------------------------------

#[when(expr = "the offer on {string} expires")]
async fn expire_offer(world: &mut ShopWorld, category: String) {
    let id = *world.offers.get(&category).expect("No offer for this category");
    sqlx::query("UPDATE category_offers SET expiry_date = $1 WHERE id = $2")
        .bind(Utc::now() - Duration::minutes(1))
        .bind(id)
        .execute(world.system().db.pool())
        .await
        .expect("Error expiring offer");
}

#[then(expr = "the price of {string} is {word}")]
async fn check_price(world: &mut ShopWorld, product: String, price: String) {
    let id = world.product_id(&product);
    let mut conn = world.system().db.pool().acquire().await.expect("No connection");
    let priced = catalog::price_product(id, Utc::now(), &mut conn).await.expect("Error pricing product");
    assert_eq!(priced.price, money(&price));
}

#[then(expr = "the stock of {string} is {int}")]
async fn check_stock(world: &mut ShopWorld, product: String, stock: i64) {
    let id = world.product_id(&product);
    let product = world.system().db.fetch_product(id).await.expect("Error fetching product").expect("No product");
    assert_eq!(product.stock, stock);
}

//----------------------------------------------   Checkout  ----------------------------------------------------

async fn place_order(
    world: &mut ShopWorld,
    user: &str,
    method: &str,
    coupon: Option<&str>,
    idempotency_key: Option<String>,
) {
    let address_id = world.address_for(user).await;
    let payment_method = match method {
        "COD" | "Cod" | "cash" => PaymentMethod::Cod,
        m => m.parse().unwrap_or_else(|e| panic!("Unknown payment method {m}: {e}")),
    };
    let coupon_id = coupon.map(|c| *world.coupons.get(c).unwrap_or_else(|| panic!("Unknown coupon {c}")));
    let request = CheckoutRequest { address_id, payment_method, coupon_id, idempotency_key };
    let result = world.system().orders.checkout(user, request).await;
    if let Some(placed) = world.record(result) {
        world.last_order = Some(placed.order);
    }
}

#[when(expr = "{word} places an order paying by {word}")]
async fn place_plain_order(world: &mut ShopWorld, user: String, method: String) {
    place_order(world, &user, &method, None, None).await;
}

#[when(expr = "{word} places an order paying by {word} with coupon {string}")]
async fn place_order_with_coupon(world: &mut ShopWorld, user: String, method: String, coupon: String) {
    place_order(world, &user, &method, Some(&coupon), None).await;
}

#[when(expr = "{word} places an order paying by {word} with checkout key {string}")]
async fn place_order_with_key(world: &mut ShopWorld, user: String, method: String, key: String) {
    place_order(world, &user, &method, None, Some(key)).await;
}

//----------------------------------------------   Settlement  ----------------------------------------------------

#[when(expr = "{word} cancels the order")]
async fn cancel_order(world: &mut ShopWorld, user: String) {
    let id = world.order_id();
    let result = world.system().orders.cancel_order(&user, id).await;
    if let Some(settled) = world.record(result) {
        world.last_refund = Some(settled.refund);
        world.last_order = Some(settled.order);
    }
}

#[when(expr = "{word} cancels the {string} item")]
async fn cancel_item(world: &mut ShopWorld, user: String, product: String) {
    let (id, item_id) = (world.order_id(), world.item_id(&product));
    let result = world.system().orders.cancel_item(&user, id, item_id).await;
    if let Some(settled) = world.record(result) {
        world.last_refund = Some(settled.refund);
        world.last_order = Some(settled.order);
    }
}

#[when(expr = "{word} asks to return the {string} item because {string}")]
async fn request_return(world: &mut ShopWorld, user: String, product: String, reason: String) {
    let (id, item_id) = (world.order_id(), world.item_id(&product));
    let result = world.system().orders.request_return(&user, id, item_id, Some(&reason)).await;
    if let Some(order) = world.record(result) {
        world.last_order = Some(order);
    }
}

#[when(expr = "the admin {word} the return of the {string} item")]
async fn resolve_return(world: &mut ShopWorld, verdict: String, product: String) {
    let decision = match verdict.as_str() {
        "accepts" => ReturnDecision::Accepted,
        "rejects" => ReturnDecision::Rejected,
        v => panic!("Unknown verdict {v}"),
    };
    let (id, item_id) = (world.order_id(), world.item_id(&product));
    let result = world.system().orders.resolve_return(id, item_id, decision).await;
    if let Some(settled) = world.record(result) {
        world.last_refund = Some(settled.refund);
        world.last_order = Some(settled.order);
    }
}

#[when(expr = "{word} returns the order")]
async fn return_order(world: &mut ShopWorld, user: String) {
    let id = world.order_id();
    let result = world.system().orders.return_order(&user, id).await;
    if let Some(settled) = world.record(result) {
        world.last_refund = Some(settled.refund);
        world.last_order = Some(settled.order);
    }
}

#[when(expr = "the admin marks the order as {word}")]
async fn mark_order(world: &mut ShopWorld, status: String) {
    let status: OrderStatus = status.parse().expect("Unknown status");
    let id = world.order_id();
    let result = world.system().orders.update_order_status(id, status).await;
    if let Some(order) = world.record(result) {
        world.last_order = Some(order);
    }
}

#[when(expr = "the gateway reports the payment as {word}")]
async fn gateway_callback(world: &mut ShopWorld, status: String) {
    let status: PaymentStatus = status.parse().expect("Unknown payment status");
    let id = world.order_id();
    let result = world.system().orders.payment_callback(id, status).await;
    if let Some(settled) = world.record(result) {
        world.last_refund = Some(settled.refund);
        world.last_order = Some(settled.order);
    }
}

//----------------------------------------------   Referrals  ----------------------------------------------------

#[when(expr = "{word} applies {word}'s referral code")]
async fn apply_referral(world: &mut ShopWorld, user: String, referrer: String) {
    let code = world.system().accounts.user(&referrer).await.expect("Error fetching referrer").referral_code;
    let result = world.system().accounts.apply_referral(&user, &code).await;
    world.record(result);
}

//----------------------------------------------   Checks  ----------------------------------------------------

#[then("the request succeeds")]
async fn request_succeeds(world: &mut ShopWorld) {
    if let Some(e) = &world.last_error {
        panic!("Expected success, but the request failed with: {e}");
    }
}

#[then(expr = "the request fails with {string}")]
async fn request_fails(world: &mut ShopWorld, message: String) {
    let err = world.last_error.as_ref().expect("Expected the request to fail");
    assert!(err.to_string().contains(&message), "Unexpected error: {err}");
}

#[then(expr = "the order is {word}")]
async fn order_status(world: &mut ShopWorld, status: String) {
    let id = world.order_id();
    let order = world.system().orders.admin_order(id).await.expect("Error fetching order");
    assert_eq!(order.order.status.to_string(), status);
}

#[then(expr = "the order payment is {word}")]
async fn payment_status(world: &mut ShopWorld, status: String) {
    let id = world.order_id();
    let order = world.system().orders.admin_order(id).await.expect("Error fetching order");
    assert_eq!(order.order.payment_status.to_string(), status);
}

#[then(expr = "the order total is {word} with a discount of {word}")]
async fn order_total(world: &mut ShopWorld, total: String, discount: String) {
    let order = &world.last_order.as_ref().expect("No order").order;
    assert_eq!(order.total_price, money(&total));
    assert_eq!(order.discount, money(&discount));
}

#[then(expr = "the {string} item carries a discount share of {word}")]
async fn discount_share(world: &mut ShopWorld, product: String, share: String) {
    let order = world.last_order.as_ref().expect("No order");
    let item = order.items.iter().find(|i| i.name == product).expect("No such item");
    assert_eq!(item.discount_share, money(&share));
}

#[then(expr = "the {string} item is {word}")]
async fn item_status(world: &mut ShopWorld, product: String, status: String) {
    let id = world.order_id();
    let order = world.system().orders.admin_order(id).await.expect("Error fetching order");
    let item = order.items.iter().find(|i| i.name == product).expect("No such item");
    assert_eq!(item.status.to_string(), status);
}

#[then(expr = "the refund is {word}")]
async fn refund(world: &mut ShopWorld, amount: String) {
    assert_eq!(world.last_refund.expect("Nothing was settled"), money(&amount));
}

#[then(expr = "{word}'s wallet balance is {word}")]
async fn wallet_balance(world: &mut ShopWorld, user: String, amount: String) {
    let view = world.system().wallets.wallet(&user, 1).await.expect("Error fetching wallet");
    assert_eq!(view.wallet.balance, money(&amount));
}

#[then(expr = "{word}'s wallet matches its history")]
async fn wallet_consistent(world: &mut ShopWorld, user: String) {
    let wallets = &world.system().wallets;
    let first = wallets.wallet(&user, 1).await.expect("Error fetching wallet");
    let mut sum = Money::ZERO;
    for page in 1..=first.total_pages {
        let view = wallets.wallet(&user, page).await.expect("Error fetching wallet");
        sum += view.transactions.iter().map(|t| t.signed_amount()).sum::<Money>();
    }
    assert_eq!(first.wallet.balance, sum);
}

#[then(expr = "{word} has {int} order(s)")]
async fn order_count(world: &mut ShopWorld, user: String, count: usize) {
    let orders = world.system().orders.orders_for_user(&user).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count);
}
