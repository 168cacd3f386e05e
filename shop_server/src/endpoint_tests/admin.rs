use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::json;
use shop_engine::{
    db_types::{OrderStatus, PaymentMethod, Role, User},
    events::EventProducers,
    AccountApi,
    OrderFlowApi,
    ShopError,
};

use super::{
    helpers::{get_request, issuer, json, patch_request, sample_order, timestamp, token_for},
    mocks::{MockAccountManager, MockOrderFlowManager},
};
use crate::{
    middleware::SessionMiddlewareFactory,
    routes::{BlockUserRoute, SearchOrdersRoute, UpdateOrderStatusRoute},
};

fn configure_with(
    order_manager: MockOrderFlowManager,
    account_manager: MockAccountManager,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let orders_api = OrderFlowApi::new(order_manager, EventProducers::default());
        let accounts_api = AccountApi::new(account_manager);
        cfg.service(
            web::scope("/admin")
                .wrap(SessionMiddlewareFactory::new(issuer()))
                .service(SearchOrdersRoute::<MockOrderFlowManager>::new())
                .service(UpdateOrderStatusRoute::<MockOrderFlowManager>::new())
                .service(BlockUserRoute::<MockAccountManager>::new()),
        )
        .app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(accounts_api));
    }
}

#[actix_web::test]
async fn shoppers_cannot_search_orders() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager.expect_search_orders().never();
    let token = token_for("alice", Role::User);
    let (status, body) =
        get_request(&token, "/admin/orders", configure_with(order_manager, MockAccountManager::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Insufficient Permissions"));
}

#[actix_web::test]
async fn search_orders_by_status_and_method() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager
        .expect_search_orders()
        .withf(|q| {
            q.status == Some(vec![OrderStatus::Pending, OrderStatus::Processing]) &&
                q.payment_method == Some(PaymentMethod::Cod) &&
                q.user_id.is_none()
        })
        .times(1)
        .returning(|_| {
            let orders = vec![
                sample_order(1, "alice", PaymentMethod::Cod, OrderStatus::Pending).order,
                sample_order(2, "bob", PaymentMethod::Cod, OrderStatus::Processing).order,
            ];
            Ok(orders)
        });
    let token = token_for("root", Role::Admin);
    let path = "/admin/orders?status=Pending,Processing&payment_method=COD";
    let (status, body) = get_request(&token, path, configure_with(order_manager, MockAccountManager::new())).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["orders"].as_array().map(|a| a.len()), Some(2));
    assert_eq!(body["orders"][1]["user_id"], "bob");
}

#[actix_web::test]
async fn search_with_unknown_status() {
    let _ = env_logger::try_init().ok();
    let token = token_for("root", Role::Admin);
    let path = "/admin/orders?status=Lost";
    let (status, _) =
        get_request(&token, path, configure_with(MockOrderFlowManager::new(), MockAccountManager::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn status_cannot_move_backwards() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager
        .expect_update_order_status()
        .withf(|id, status| id.value() == 3 && *status == OrderStatus::Processing)
        .returning(|_, to| Err(ShopError::InvalidStatusTransition { from: OrderStatus::Shipped, to }));
    let token = token_for("root", Role::Admin);
    let body = json!({ "status": "Processing" });
    let (status, body) =
        patch_request(&token, "/admin/orders/3/status", body, configure_with(order_manager, MockAccountManager::new()))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"message":"Cannot change status from Shipped to Processing"}"#);
}

#[actix_web::test]
async fn block_a_user() {
    let _ = env_logger::try_init().ok();
    let mut account_manager = MockAccountManager::new();
    account_manager.expect_set_user_blocked().times(1).returning(|user_id, blocked| {
        Ok(User {
            id: user_id.to_string(),
            referral_code: "K7QX2M".to_string(),
            referred_by: None,
            is_blocked: blocked,
            created_at: timestamp(),
            updated_at: timestamp(),
        })
    });
    let token = token_for("root", Role::Admin);
    let body = json!({ "blocked": true });
    let (status, body) =
        patch_request(&token, "/admin/users/mallory/block", body, configure_with(MockOrderFlowManager::new(), account_manager))
            .await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["message"], "User blocked");
    assert_eq!(body["user"]["id"], "mallory");
    assert_eq!(body["user"]["is_blocked"], true);
}
