use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::json;
use shop_common::{Money, Secret};
use shop_engine::{
    db_types::{OrderStatus, PaymentMethod, PaymentStatus, Role},
    events::EventProducers,
    order_objects::SettlementResult,
    OrderFlowApi,
};

use super::{
    helpers::{issuer, json, post_request, sample_order, signed_post, token_for},
    mocks::MockOrderFlowManager,
};
use crate::{
    config::ServerOptions,
    gateway::{Charge, GatewayError, PaymentGateway},
    helpers::calculate_hmac,
    middleware::{HmacMiddlewareFactory, SessionMiddlewareFactory, GATEWAY_SIGNATURE_HEADER},
    routes::{CreateChargeRoute, PaymentStatusRoute},
};

const WEBHOOK_SECRET: &str = "whsec_endpoint_tests";
const CALLBACK: &str = r#"{"order_id":12,"status":"Completed","charge_id":"order_N5q0cJ"}"#;

fn configure_callbacks(order_manager: MockOrderFlowManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let api = OrderFlowApi::new(order_manager, EventProducers::default());
        cfg.service(
            web::scope("/gateway")
                .wrap(HmacMiddlewareFactory::new(GATEWAY_SIGNATURE_HEADER, Secret::new(WEBHOOK_SECRET.to_string())))
                .service(PaymentStatusRoute::<MockOrderFlowManager>::new()),
        )
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(ServerOptions::default()));
    }
}

#[actix_web::test]
async fn unsigned_callback_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager.expect_update_payment_status().never();
    let (status, body) = signed_post("/gateway/payment-status", CALLBACK, None, configure_callbacks(order_manager)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"message":"Invalid request signature."}"#);
}

#[actix_web::test]
async fn forged_callback_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager.expect_update_payment_status().never();
    let signature = calculate_hmac("not-the-webhook-secret", CALLBACK.as_bytes());
    let header = Some((GATEWAY_SIGNATURE_HEADER, signature));
    let (status, _) = signed_post("/gateway/payment-status", CALLBACK, header, configure_callbacks(order_manager)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn signed_callback_marks_order_paid() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager
        .expect_fetch_order()
        .returning(|id| Ok(Some(sample_order(id.value(), "alice", PaymentMethod::Gateway, OrderStatus::Pending))));
    order_manager
        .expect_update_payment_status()
        .withf(|id, status, _| id.value() == 12 && *status == PaymentStatus::Completed)
        .times(1)
        .returning(|id, status, _| {
            let mut order = sample_order(id.value(), "alice", PaymentMethod::Gateway, OrderStatus::Processing);
            order.order.payment_status = status;
            Ok(SettlementResult::new(order, Money::ZERO))
        });
    let signature = calculate_hmac(WEBHOOK_SECRET, CALLBACK.as_bytes());
    let header = Some((GATEWAY_SIGNATURE_HEADER, signature));
    let (status, body) =
        signed_post("/gateway/payment-status", CALLBACK, header, configure_callbacks(order_manager)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["message"], "Payment status updated");
    assert_eq!(body["order"]["payment_status"], "Completed");
    assert_eq!(body["order"]["status"], "Processing");
    assert_eq!(body["refund"], 0);
}

/// Answers every charge request without calling out to the network.
struct FakeGateway;

impl PaymentGateway for FakeGateway {
    fn currency(&self) -> &str {
        "INR"
    }

    async fn create_charge(&self, amount: Money, currency: &str, receipt: &str) -> Result<Charge, GatewayError> {
        Ok(Charge {
            id: "order_N5q0cJ".to_string(),
            amount: amount.value(),
            currency: currency.to_string(),
            receipt: Some(receipt.to_string()),
        })
    }
}

fn configure_charges(order_manager: MockOrderFlowManager) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let api = OrderFlowApi::new(order_manager, EventProducers::default());
        cfg.service(
            web::scope("/user")
                .wrap(SessionMiddlewareFactory::new(issuer()))
                .service(CreateChargeRoute::<MockOrderFlowManager, FakeGateway>::new()),
        )
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(FakeGateway));
    }
}

#[actix_web::test]
async fn charge_for_gateway_order() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager
        .expect_fetch_order()
        .returning(|id| Ok(Some(sample_order(id.value(), "alice", PaymentMethod::Gateway, OrderStatus::Pending))));
    order_manager
        .expect_record_charge()
        .withf(|id, charge_id, amount| {
            id.value() == 12 && charge_id.contains("order_N5q0cJ") && *amount == Money::from_major(500)
        })
        .times(1)
        .returning(|id, charge_id, amount| {
            let mut order = sample_order(id.value(), "alice", PaymentMethod::Gateway, OrderStatus::Pending).order;
            order.charge_id = Some(charge_id.to_string());
            order.charged_amount = Some(amount);
            Ok(order)
        });
    let token = token_for("alice", Role::User);
    let (status, body) = post_request(&token, "/user/orders/12/charge", json!({}), configure_charges(order_manager)).await;
    assert_eq!(status, StatusCode::CREATED);
    let body = json(&body);
    assert_eq!(body["charge"]["id"], "order_N5q0cJ");
    assert_eq!(body["charge"]["amount"], 50000);
    assert_eq!(body["charge"]["currency"], "INR");
    assert_eq!(body["charge"]["receipt"], "order_12");
}

#[actix_web::test]
async fn no_charge_for_cod_orders() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager
        .expect_fetch_order()
        .returning(|id| Ok(Some(sample_order(id.value(), "alice", PaymentMethod::Cod, OrderStatus::Pending))));
    order_manager.expect_record_charge().never();
    let token = token_for("alice", Role::User);
    let (status, body) = post_request(&token, "/user/orders/12/charge", json!({}), configure_charges(order_manager)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"message":"Order #12 is not a gateway payment"}"#);
}

#[actix_web::test]
async fn cancelled_lines_are_left_out_of_the_charge() {
    let _ = env_logger::try_init().ok();
    let mut order_manager = MockOrderFlowManager::new();
    order_manager.expect_fetch_order().returning(|id| {
        let mut order = sample_order(id.value(), "alice", PaymentMethod::Gateway, OrderStatus::Pending);
        let mut rug = order.items[0].clone();
        rug.id = 2;
        rug.name = "Jute rug".to_string();
        rug.price = Money::from_major(200);
        rug.quantity = 1;
        rug.status = OrderStatus::Cancelled;
        order.items.push(rug);
        order.order.subtotal = Money::from_major(700);
        order.order.total_price = Money::from_major(700);
        Ok(Some(order))
    });
    order_manager
        .expect_record_charge()
        .withf(|_, _, amount| *amount == Money::from_major(500))
        .times(1)
        .returning(|id, charge_id, amount| {
            let mut order = sample_order(id.value(), "alice", PaymentMethod::Gateway, OrderStatus::Pending).order;
            order.charge_id = Some(charge_id.to_string());
            order.charged_amount = Some(amount);
            Ok(order)
        });
    let token = token_for("alice", Role::User);
    let (status, body) = post_request(&token, "/user/orders/12/charge", json!({}), configure_charges(order_manager)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json(&body)["charge"]["amount"], 50000);
}
