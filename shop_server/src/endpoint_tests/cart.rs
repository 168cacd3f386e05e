use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::json;
use shop_common::Money;
use shop_engine::{
    db_types::{Cart, CartItem, Role},
    shop_api::cart_objects::{CartView, StockProblem},
    CartApi,
    ShopError,
};

use super::{
    helpers::{get_request, issuer, json, post_request, token_for},
    mocks::MockCartManager,
};
use crate::{
    middleware::SessionMiddlewareFactory,
    routes::{AddToCartRoute, MyCartRoute},
};

fn mug_cart(user_id: &str, quantity: i64) -> Cart {
    let price = Money::from_major(250);
    let item = CartItem {
        id: 3,
        user_id: user_id.to_string(),
        product_id: 11,
        name: "Enamel mug".to_string(),
        quantity,
        price,
    };
    Cart { user_id: user_id.to_string(), items: vec![item], total_price: price * quantity }
}

fn configure_with(cart_manager: MockCartManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let api = CartApi::new(cart_manager);
        cfg.service(
            web::scope("/user")
                .wrap(SessionMiddlewareFactory::new(issuer()))
                .service(MyCartRoute::<MockCartManager>::new())
                .service(AddToCartRoute::<MockCartManager>::new()),
        )
        .app_data(web::Data::new(api));
    }
}

#[actix_web::test]
async fn fetch_cart_without_token() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("", "/user/cart", configure_with(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"message":"Not authorized. No session token was provided."}"#);
}

#[actix_web::test]
async fn fetch_cart_with_garbage_token() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request("not-a-token", "/user/cart", configure_with(MockCartManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn fetch_my_cart() {
    let _ = env_logger::try_init().ok();
    let mut cart_manager = MockCartManager::new();
    cart_manager.expect_fetch_cart().times(1).returning(|user_id| {
        let mut view = CartView::new(mug_cart(user_id, 2));
        view.insufficient_stock.push(StockProblem {
            item_id: 3,
            product_id: 11,
            name: "Enamel mug".into(),
            requested: 2,
            available: 1,
        });
        Ok(view)
    });
    let token = token_for("alice", Role::User);
    let (status, body) = get_request(&token, "/user/cart", configure_with(cart_manager)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["message"], "Cart fetched");
    assert_eq!(body["cart"]["cart"]["user_id"], "alice");
    assert_eq!(body["cart"]["cart"]["total_price"], 50000);
    assert_eq!(body["cart"]["insufficient_stock"][0]["available"], 1);
}

#[actix_web::test]
async fn add_to_cart_over_stock() {
    let _ = env_logger::try_init().ok();
    let mut cart_manager = MockCartManager::new();
    cart_manager
        .expect_add_to_cart()
        .withf(|_, product_id, quantity, _| *product_id == 11 && *quantity == 5)
        .times(1)
        .returning(|_, _, _, _| Err(ShopError::InsufficientStock { product: "Enamel mug".into(), available: 4 }));
    let token = token_for("alice", Role::User);
    let body = json!({ "product_id": 11, "quantity": 5 });
    let (status, body) = post_request(&token, "/user/cart", body, configure_with(cart_manager)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"message":"Insufficient stock for Enamel mug. Only 4 left"}"#);
}

#[actix_web::test]
async fn add_to_cart() {
    let _ = env_logger::try_init().ok();
    let mut cart_manager = MockCartManager::new();
    cart_manager.expect_add_to_cart().times(1).returning(|user_id, _, quantity, _| Ok(mug_cart(user_id, quantity)));
    let token = token_for("bob", Role::User);
    let body = json!({ "product_id": 11, "quantity": 3 });
    let (status, body) = post_request(&token, "/user/cart", body, configure_with(cart_manager)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["message"], "Item added to cart");
    assert_eq!(body["cart"]["items"][0]["quantity"], 3);
    assert_eq!(body["cart"]["total_price"], 75000);
}
