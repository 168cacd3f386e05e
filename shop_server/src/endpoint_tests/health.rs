use actix_web::http::StatusCode;

use super::helpers::get_request;
use crate::routes::health;

#[actix_web::test]
async fn health_check() {
    let (status, body) = get_request("", "/health", |cfg| {
        cfg.service(health);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}
