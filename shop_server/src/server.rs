use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use futures::FutureExt;
use log::*;
use shop_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    AccountApi,
    CartApi,
    CatalogApi,
    CouponApi,
    OrderFlowApi,
    ReportsApi,
    SqliteDatabase,
    WalletApi,
    WishlistApi,
};

use crate::{
    auth::TokenIssuer,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    gateway::GatewayClient,
    middleware::{HmacMiddlewareFactory, SessionMiddlewareFactory, GATEWAY_SIGNATURE_HEADER},
    routes::*,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(128, notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let gateway = GatewayClient::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db, producers, gateway)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Shopper notifications are delivered by an external service. The server only records that they happened.
pub fn notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_placed(|ev| {
            async move {
                let order = &ev.order.order;
                info!("📬️ Order {} placed by {} for {}", order.id, order.user_id, order.total_price);
            }
            .boxed()
        })
        .on_order_paid(|ev| {
            async move {
                info!("📬️ Order {} has been paid", ev.order.id);
            }
            .boxed()
        })
        .on_order_annulled(|ev| {
            async move {
                info!("📬️ Order {} is {}. {} refunded to {}", ev.order.id, ev.status, ev.refund, ev.order.user_id);
            }
            .boxed()
        })
        .on_wallet_credited(|ev| {
            async move {
                info!("📬️ {} credited to the wallet of {}. {}", ev.amount, ev.user_id, ev.reason);
            }
            .boxed()
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    gateway: GatewayClient,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let policy = config.policy;
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone()).with_policy(policy);
        let cart_api = CartApi::new(db.clone()).with_policy(policy);
        let catalog_api = CatalogApi::new(db.clone()).with_policy(policy);
        let coupon_api = CouponApi::new(db.clone()).with_policy(policy);
        let accounts_api = AccountApi::new(db.clone()).with_policy(policy);
        let wallet_api = WalletApi::new(db.clone()).with_policy(policy);
        let wishlist_api = WishlistApi::new(db.clone()).with_policy(policy);
        let reports_api = ReportsApi::new(db.clone());
        let issuer = TokenIssuer::new(&config.auth);
        let options = ServerOptions::from_config(&config);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("shop::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(coupon_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(wallet_api))
            .app_data(web::Data::new(wishlist_api))
            .app_data(web::Data::new(reports_api))
            .app_data(web::Data::new(gateway.clone()))
            .app_data(web::Data::new(options));
        // Routes that act on behalf of a signed-in shopper
        let user_scope = web::scope("/user")
            .wrap(SessionMiddlewareFactory::new(issuer.clone()))
            .service(MyAccountRoute::<SqliteDatabase>::new())
            .service(MyAddressesRoute::<SqliteDatabase>::new())
            .service(AddAddressRoute::<SqliteDatabase>::new())
            .service(UpdateAddressRoute::<SqliteDatabase>::new())
            .service(DeleteAddressRoute::<SqliteDatabase>::new())
            .service(ApplyReferralRoute::<SqliteDatabase>::new())
            .service(MyCartRoute::<SqliteDatabase>::new())
            .service(AddToCartRoute::<SqliteDatabase>::new())
            .service(UpdateCartItemRoute::<SqliteDatabase>::new())
            .service(RemoveCartItemRoute::<SqliteDatabase>::new())
            .service(MyWishlistRoute::<SqliteDatabase>::new())
            .service(AddToWishlistRoute::<SqliteDatabase>::new())
            .service(RemoveFromWishlistRoute::<SqliteDatabase>::new())
            .service(MoveToCartRoute::<SqliteDatabase>::new())
            .service(CategoriesRoute::<SqliteDatabase>::new())
            .service(ProductsRoute::<SqliteDatabase>::new())
            .service(ProductRoute::<SqliteDatabase>::new())
            .service(AvailableCouponsRoute::<SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(MyOrderRoute::<SqliteDatabase>::new())
            .service(CancelMyOrderRoute::<SqliteDatabase>::new())
            .service(CancelMyItemRoute::<SqliteDatabase>::new())
            .service(ReturnMyItemRoute::<SqliteDatabase>::new())
            .service(ReturnMyOrderRoute::<SqliteDatabase>::new())
            .service(CreateChargeRoute::<SqliteDatabase, GatewayClient>::new())
            .service(MyWalletRoute::<SqliteDatabase>::new());
        // Every route in here also checks for the Admin role
        let admin_scope = web::scope("/admin")
            .wrap(SessionMiddlewareFactory::new(issuer))
            .service(NewCategoryRoute::<SqliteDatabase>::new())
            .service(AllCategoriesRoute::<SqliteDatabase>::new())
            .service(BlockCategoryRoute::<SqliteDatabase>::new())
            .service(NewProductRoute::<SqliteDatabase>::new())
            .service(AllProductsRoute::<SqliteDatabase>::new())
            .service(BlockProductRoute::<SqliteDatabase>::new())
            .service(SetStockRoute::<SqliteDatabase>::new())
            .service(NewOfferRoute::<SqliteDatabase>::new())
            .service(OffersRoute::<SqliteDatabase>::new())
            .service(ActivateOfferRoute::<SqliteDatabase>::new())
            .service(NewCouponRoute::<SqliteDatabase>::new())
            .service(CouponsRoute::<SqliteDatabase>::new())
            .service(CouponRoute::<SqliteDatabase>::new())
            .service(DeleteCouponRoute::<SqliteDatabase>::new())
            .service(SearchOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(UpdateItemStatusRoute::<SqliteDatabase>::new())
            .service(ResolveReturnRoute::<SqliteDatabase>::new())
            .service(AdminCancelOrderRoute::<SqliteDatabase>::new())
            .service(SalesReportRoute::<SqliteDatabase>::new())
            .service(SalesChartRoute::<SqliteDatabase>::new())
            .service(TopSellersRoute::<SqliteDatabase>::new())
            .service(UserByIdRoute::<SqliteDatabase>::new())
            .service(BlockUserRoute::<SqliteDatabase>::new())
            .service(UserWalletRoute::<SqliteDatabase>::new())
            .service(AdjustWalletRoute::<SqliteDatabase>::new());
        let gateway_scope = web::scope("/gateway")
            .wrap(HmacMiddlewareFactory::new(GATEWAY_SIGNATURE_HEADER, config.gateway.webhook_secret.clone()))
            .service(PaymentStatusRoute::<SqliteDatabase>::new());
        app.service(health).service(user_scope).service(admin_scope).service(gateway_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
