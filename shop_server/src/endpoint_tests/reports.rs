use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use shop_common::Money;
use shop_engine::{
    db_types::Role,
    report_objects::{ReportWindow, SalesTotals, TopSeller},
    ReportsApi,
};

use super::{
    helpers::{get_request, issuer, json, token_for},
    mocks::MockSalesReporter,
};
use crate::{
    middleware::SessionMiddlewareFactory,
    routes::{SalesReportRoute, TopSellersRoute},
};

fn configure_with(reporter: MockSalesReporter) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let reports_api = ReportsApi::new(reporter);
        cfg.service(
            web::scope("/admin")
                .wrap(SessionMiddlewareFactory::new(issuer()))
                .service(SalesReportRoute::<MockSalesReporter>::new())
                .service(TopSellersRoute::<MockSalesReporter>::new()),
        )
        .app_data(web::Data::new(reports_api));
    }
}

#[actix_web::test]
async fn sales_report_for_custom_dates() {
    let _ = env_logger::try_init().ok();
    let june = ReportWindow::between(
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
    );
    let mut reporter = MockSalesReporter::new();
    reporter.expect_fetch_sales_totals().withf(move |w| *w == june).times(1).returning(|_| {
        Ok(SalesTotals {
            total_orders: 9,
            total_sales: Money::from_major(1234),
            total_discount: Money::from_major(50),
        })
    });
    reporter
        .expect_fetch_order_sales()
        .withf(move |w, page| *w == june && *page == Some((2, 7)))
        .times(1)
        .returning(|_, _| Ok(vec![]));
    let token = token_for("root", Role::Admin);
    let path = "/admin/sales-report?start_date=2024-06-01&end_date=2024-06-30&page=2";
    let (status, body) = get_request(&token, path, configure_with(reporter)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let body = json(&body);
    assert_eq!(body["report"]["total_orders"], 9);
    assert_eq!(body["report"]["total_sales"], 123400);
    assert_eq!(body["report"]["page"], 2);
    assert_eq!(body["report"]["total_pages"], 2);
}

#[actix_web::test]
async fn sales_report_end_before_start() {
    let _ = env_logger::try_init().ok();
    let mut reporter = MockSalesReporter::new();
    reporter.expect_fetch_sales_totals().never();
    let token = token_for("root", Role::Admin);
    let path = "/admin/sales-report?start_date=2024-06-30&end_date=2024-06-01";
    let (status, body) = get_request(&token, path, configure_with(reporter)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("must be after its start"));
}

#[actix_web::test]
async fn shoppers_cannot_see_sales() {
    let _ = env_logger::try_init().ok();
    let mut reporter = MockSalesReporter::new();
    reporter.expect_fetch_sales_totals().never();
    let token = token_for("alice", Role::User);
    let (status, _) = get_request(&token, "/admin/sales-report?filter=daily", configure_with(reporter)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn top_sellers() {
    let _ = env_logger::try_init().ok();
    let mut reporter = MockSalesReporter::new();
    reporter
        .expect_fetch_top_products()
        .withf(|limit| *limit == 10)
        .returning(|_| Ok(vec![TopSeller { id: 4, name: "Mug".into(), units: 12 }]));
    reporter
        .expect_fetch_top_categories()
        .returning(|_| Ok(vec![TopSeller { id: 1, name: "Kitchen".into(), units: 12 }]));
    let token = token_for("root", Role::Admin);
    let (status, body) = get_request(&token, "/admin/top-sellers", configure_with(reporter)).await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["products"][0]["name"], "Mug");
    assert_eq!(body["categories"][0]["units"], 12);
}
