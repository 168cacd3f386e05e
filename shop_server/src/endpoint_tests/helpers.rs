use actix_web::{
    body::MessageBody,
    http::{header::ContentType, StatusCode},
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use log::debug;
use serde_json::Value;
use shop_common::Money;
use shop_engine::{
    db_types::{Order, OrderId, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, Role},
    order_objects::FullOrder,
};

use crate::{
    auth::{SessionClaims, TokenIssuer},
    config::AuthConfig,
};

// Only ever used to sign tokens in these tests
pub const TEST_SECRET: &str = "endpoint-tests-session-secret";

pub fn issuer() -> TokenIssuer {
    TokenIssuer::new(&AuthConfig::new(TEST_SECRET))
}

pub fn token_for(user_id: &str, role: Role) -> String {
    issue_token(SessionClaims::new(user_id, role), Duration::hours(1))
}

pub fn issue_token(claims: SessionClaims, valid_for: Duration) -> String {
    issuer().issue_token_valid_for(&claims, valid_for).expect("Failed to sign token")
}

pub async fn get_request<F>(token: &str, path: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    send(TestRequest::get().uri(path), token, configure).await
}

pub async fn post_request<F>(token: &str, path: &str, body: Value, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    send(TestRequest::post().uri(path).set_json(body), token, configure).await
}

pub async fn patch_request<F>(token: &str, path: &str, body: Value, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    send(TestRequest::patch().uri(path).set_json(body), token, configure).await
}

/// Posts a raw body with an optional signature header, the way the payment gateway calls back.
pub async fn signed_post<F>(path: &str, body: &str, signature: Option<(&str, String)>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let mut req = TestRequest::post().uri(path).insert_header(ContentType::json()).set_payload(body.to_string());
    if let Some(header) = signature {
        req = req.insert_header(header);
    }
    send(req, "", configure).await
}

async fn send<F>(req: TestRequest, token: &str, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let req = if token.is_empty() { req } else { req.insert_header(("Authorization", format!("Bearer {token}"))) };
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    // Middleware rejections come back as errors rather than responses
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap_or_default();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).expect("Response was not JSON")
}

pub fn timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// A single-line order for 2 × 250.00
pub fn sample_order(id: i64, user_id: &str, method: PaymentMethod, status: OrderStatus) -> FullOrder {
    let total = Money::from_major(500);
    let payment_status = match (method, status) {
        (PaymentMethod::Wallet, _) => PaymentStatus::Completed,
        (_, OrderStatus::Delivered) => PaymentStatus::Completed,
        _ => PaymentStatus::Pending,
    };
    let order = Order {
        id: OrderId(id),
        user_id: user_id.to_string(),
        address: "1 Main Road, Pune 411001".to_string(),
        subtotal: total,
        discount: Money::ZERO,
        total_price: total,
        status,
        payment_method: method,
        payment_status,
        coupon_id: None,
        charge_id: None,
        charged_amount: None,
        idempotency_key: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    };
    let item = OrderItem {
        id: 1,
        order_id: OrderId(id),
        product_id: 11,
        name: "Enamel mug".to_string(),
        price: Money::from_major(250),
        quantity: 2,
        discount_share: Money::ZERO,
        status,
        return_request: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    };
    FullOrder { order, items: vec![item] }
}
