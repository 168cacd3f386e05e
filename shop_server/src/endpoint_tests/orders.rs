use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Duration;
use serde_json::json;
use shop_common::Money;
use shop_engine::{
    db_types::{OrderStatus, PaymentMethod, ReturnRequest, ReturnStatus, Role},
    events::EventProducers,
    order_objects::{PlacedOrder, SettlementResult},
    OrderFlowApi,
    ShopError,
};

use super::{
    helpers::{get_request, issue_token, issuer, json, post_request, sample_order, timestamp, token_for},
    mocks::MockOrderFlowManager,
};
use crate::{
    auth::SessionClaims,
    middleware::SessionMiddlewareFactory,
    routes::{CancelMyOrderRoute, CheckoutRoute, MyOrderRoute, ReturnMyItemRoute},
};

fn configure_with(order_manager: MockOrderFlowManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let api = OrderFlowApi::new(order_manager, EventProducers::default());
        cfg.service(
            web::scope("/user")
                .wrap(SessionMiddlewareFactory::new(issuer()))
                .service(CheckoutRoute::<MockOrderFlowManager>::new())
                .service(MyOrderRoute::<MockOrderFlowManager>::new())
                .service(CancelMyOrderRoute::<MockOrderFlowManager>::new())
                .service(ReturnMyItemRoute::<MockOrderFlowManager>::new()),
        )
        .app_data(web::Data::new(api));
    }
}

fn checkout_body() -> serde_json::Value {
    json!({ "address_id": 1, "payment_method": "COD", "idempotency_key": "6b1f0c2e" })
}

#[actix_web::test]
async fn checkout_with_expired_session() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(SessionClaims::new("alice", Role::User), Duration::minutes(-1));
    let (status, body) =
        post_request(&token, "/user/orders", checkout_body(), configure_with(MockOrderFlowManager::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"message":"Session has expired. Please sign in again."}"#);
}

#[actix_web::test]
async fn checkout_new_order() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager
        .expect_place_order()
        .withf(|_, request, _| request.payment_method == PaymentMethod::Cod && request.address_id == 1)
        .times(1)
        .returning(|user_id, _, _| {
            let order = sample_order(7, user_id, PaymentMethod::Cod, OrderStatus::Pending);
            Ok(PlacedOrder { order, is_new: true })
        });
    let token = token_for("alice", Role::User);
    let (status, body) = post_request(&token, "/user/orders", checkout_body(), configure_with(order_manager)).await;
    assert_eq!(status, StatusCode::CREATED);
    let body = json(&body);
    assert_eq!(body["message"], "Order placed");
    assert_eq!(body["order"]["id"], 7);
    assert_eq!(body["order"]["user_id"], "alice");
    assert_eq!(body["order"]["payment_method"], "COD");
    assert_eq!(body["order"]["items"][0]["quantity"], 2);
}

#[actix_web::test]
async fn repeated_checkout_returns_first_order() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager.expect_place_order().times(1).returning(|user_id, _, _| {
        let order = sample_order(7, user_id, PaymentMethod::Cod, OrderStatus::Pending);
        Ok(PlacedOrder { order, is_new: false })
    });
    let token = token_for("alice", Role::User);
    let (status, body) = post_request(&token, "/user/orders", checkout_body(), configure_with(order_manager)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["message"], "Order already placed");
    assert_eq!(body["order"]["id"], 7);
}

#[actix_web::test]
async fn cod_above_ceiling() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager
        .expect_place_order()
        .returning(|_, _, policy| Err(ShopError::CodCeilingExceeded(policy.cod_ceiling)));
    let token = token_for("alice", Role::User);
    let (status, body) = post_request(&token, "/user/orders", checkout_body(), configure_with(order_manager)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"message":"Cash on delivery is not available for orders above 1000.00"}"#);
}

#[actix_web::test]
async fn database_failures_are_masked() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager
        .expect_place_order()
        .returning(|_, _, _| Err(ShopError::DatabaseError("database is locked".into())));
    let token = token_for("alice", Role::User);
    let (status, body) = post_request(&token, "/user/orders", checkout_body(), configure_with(order_manager)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"message":"Internal Server error"}"#);
}

#[actix_web::test]
async fn someone_elses_order_is_not_found() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager
        .expect_fetch_order()
        .returning(|id| Ok(Some(sample_order(id.value(), "bob", PaymentMethod::Wallet, OrderStatus::Processing))));
    let token = token_for("alice", Role::User);
    let (status, body) = get_request(&token, "/user/orders/9", configure_with(order_manager)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"message":"Order #9 not found"}"#);
}

#[actix_web::test]
async fn fetch_my_order() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager
        .expect_fetch_order()
        .returning(|id| Ok(Some(sample_order(id.value(), "alice", PaymentMethod::Wallet, OrderStatus::Processing))));
    let token = token_for("alice", Role::User);
    let (status, body) = get_request(&token, "/user/orders/9", configure_with(order_manager)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["order"]["status"], "Processing");
    assert_eq!(body["order"]["payment_status"], "Completed");
}

#[actix_web::test]
async fn cancel_wallet_order_refunds() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager
        .expect_fetch_order()
        .returning(|id| Ok(Some(sample_order(id.value(), "alice", PaymentMethod::Wallet, OrderStatus::Processing))));
    order_manager.expect_cancel_order().times(1).returning(|id, _| {
        let order = sample_order(id.value(), "alice", PaymentMethod::Wallet, OrderStatus::Cancelled);
        Ok(SettlementResult::new(order, Money::from_major(500)))
    });
    let token = token_for("alice", Role::User);
    let (status, body) = post_request(&token, "/user/orders/4/cancel", json!({}), configure_with(order_manager)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["message"], "Order cancelled");
    assert_eq!(body["order"]["status"], "Cancelled");
    assert_eq!(body["refund"], 50000);
}

#[actix_web::test]
async fn cannot_cancel_someone_elses_order() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager
        .expect_fetch_order()
        .returning(|id| Ok(Some(sample_order(id.value(), "bob", PaymentMethod::Wallet, OrderStatus::Processing))));
    order_manager.expect_cancel_order().never();
    let token = token_for("alice", Role::User);
    let (status, _) = post_request(&token, "/user/orders/4/cancel", json!({}), configure_with(order_manager)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn request_return_with_reason() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager
        .expect_fetch_order()
        .returning(|id| Ok(Some(sample_order(id.value(), "alice", PaymentMethod::Cod, OrderStatus::Delivered))));
    order_manager
        .expect_request_item_return()
        .withf(|_, item_id, reason| *item_id == 1 && reason.contains("Chipped rim"))
        .times(1)
        .returning(|id, _, reason| {
            let mut order = sample_order(id.value(), "alice", PaymentMethod::Cod, OrderStatus::Delivered);
            order.items[0].return_request = Some(ReturnRequest {
                status: ReturnStatus::Pending,
                reason: reason.to_string(),
                requested_at: timestamp(),
                updated_at: timestamp(),
            });
            Ok(order)
        });
    let token = token_for("alice", Role::User);
    let body = json!({ "reason": "Chipped rim" });
    let (status, body) = post_request(&token, "/user/orders/5/items/1/return", body, configure_with(order_manager)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["message"], "Return request submitted");
    assert_eq!(body["order"]["items"][0]["return_request"]["status"], "Pending");
    assert_eq!(body["order"]["items"][0]["return_request"]["reason"], "Chipped rim");
}
