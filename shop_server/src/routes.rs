//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Routes are grouped into three scopes (see [`crate::server`]):
//! * `/user/...` needs a valid session token. Handlers act on the caller's own cart, orders and wallet.
//! * `/admin/...` additionally needs the `Admin` role, enforced per route by the ACL middleware.
//! * `/gateway/...` carries the payment gateway's callbacks, authenticated by an HMAC body signature.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here is async and only awaits database or gateway
//! futures.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use serde_json::json;
use shop_engine::{
    db_types::{AddressUpdate, NewAddress, NewCategory, NewCategoryOffer, NewCoupon, NewProduct, OrderId, Role},
    order_objects::CheckoutRequest,
    shop_api::{
        cart_objects::{AddToCart, UpdateQuantity},
        wallet_objects::WalletAdjustment,
    },
    traits::{
        AccountManagement,
        CartManagement,
        CatalogManagement,
        CouponManagement,
        OrderFlowManagement,
        SalesReporting,
        WalletManagement,
        WishlistManagement,
    },
    AccountApi,
    CartApi,
    CatalogApi,
    CouponApi,
    OrderFlowApi,
    ReportsApi,
    WalletApi,
    WishlistApi,
};

use crate::{
    auth::SessionClaims,
    config::ServerOptions,
    data_objects::{
        BlockRequest,
        ChartParams,
        JsonResponse,
        OfferActivation,
        OrderSearchParams,
        PageParams,
        PaymentStatusNotification,
        ProductQuery,
        ReferralRequest,
        ResolveReturnBody,
        ReturnRequestBody,
        SalesReportParams,
        StatusUpdate,
        StockUpdate,
        WishlistRequest,
    },
    errors::ServerError,
    gateway::PaymentGateway,
    helpers::get_remote_ip,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Account  ----------------------------------------------------
route!(my_account => Get "/account" impl AccountManagement);
/// The caller's user record. The first call after signing in creates it, along with a referral code.
pub async fn my_account<B: AccountManagement>(
    claims: SessionClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET account for {}", claims.user_id);
    let user = api.user(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Account fetched", "user": user })))
}

route!(my_addresses => Get "/addresses" impl AccountManagement);
pub async fn my_addresses<B: AccountManagement>(
    claims: SessionClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let addresses = api.addresses(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Addresses fetched", "addresses": addresses })))
}

route!(add_address => Post "/addresses" impl AccountManagement);
pub async fn add_address<B: AccountManagement>(
    claims: SessionClaims,
    body: web::Json<NewAddress>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST address for {}", claims.user_id);
    let address = api.add_address(&claims.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "Address added", "address": address })))
}

route!(delete_address => Delete "/addresses/{id}" impl AccountManagement);
pub async fn delete_address<B: AccountManagement>(
    claims: SessionClaims,
    path: web::Path<i64>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    api.delete_address(&claims.user_id, id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Address {id} deleted"))))
}

route!(update_address => Patch "/addresses/{id}" impl AccountManagement);
/// Edits some fields of one of the caller's addresses. Fields left out of the body keep their current values.
pub async fn update_address<B: AccountManagement>(
    claims: SessionClaims,
    path: web::Path<i64>,
    body: web::Json<AddressUpdate>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let address = api.update_address(&claims.user_id, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Address updated", "address": address })))
}

route!(apply_referral => Post "/referral" impl AccountManagement);
/// Applies another shopper's referral code to the caller's account. Both wallets are credited.
pub async fn apply_referral<B: AccountManagement>(
    claims: SessionClaims,
    body: web::Json<ReferralRequest>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST referral for {}", claims.user_id);
    let outcome = api.apply_referral(&claims.user_id, body.code.trim()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Referral applied", "referral": outcome })))
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(my_cart => Get "/cart" impl CartManagement);
/// The cart with current prices. Lines with blocked products or too little stock are listed separately so the shopper
/// can fix them before checking out.
pub async fn my_cart<B: CartManagement>(
    claims: SessionClaims,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET cart for {}", claims.user_id);
    let view = api.cart(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Cart fetched", "cart": view })))
}

route!(add_to_cart => Post "/cart" impl CartManagement);
pub async fn add_to_cart<B: CartManagement>(
    claims: SessionClaims,
    body: web::Json<AddToCart>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let AddToCart { product_id, quantity } = body.into_inner();
    debug!("💻️ POST cart item for {}. {quantity} of product #{product_id}", claims.user_id);
    let cart = api.add_item(&claims.user_id, product_id, quantity).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Item added to cart", "cart": cart })))
}

route!(update_cart_item => Patch "/cart/{item_id}" impl CartManagement);
pub async fn update_cart_item<B: CartManagement>(
    claims: SessionClaims,
    path: web::Path<i64>,
    body: web::Json<UpdateQuantity>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let cart = api.update_quantity(&claims.user_id, path.into_inner(), body.action).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Cart updated", "cart": cart })))
}

route!(remove_cart_item => Delete "/cart/{item_id}" impl CartManagement);
pub async fn remove_cart_item<B: CartManagement>(
    claims: SessionClaims,
    path: web::Path<i64>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let cart = api.remove_item(&claims.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Item removed from cart", "cart": cart })))
}

//----------------------------------------------   Wishlist  ----------------------------------------------------
route!(my_wishlist => Get "/wishlist" impl WishlistManagement);
/// The saved products at today's prices.
pub async fn my_wishlist<B: WishlistManagement>(
    claims: SessionClaims,
    api: web::Data<WishlistApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let wishlist = api.wishlist(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Wishlist fetched", "wishlist": wishlist })))
}

route!(add_to_wishlist => Post "/wishlist" impl WishlistManagement);
pub async fn add_to_wishlist<B: WishlistManagement>(
    claims: SessionClaims,
    body: web::Json<WishlistRequest>,
    api: web::Data<WishlistApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let wishlist = api.add(&claims.user_id, body.product_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Product added to wishlist", "wishlist": wishlist })))
}

route!(remove_from_wishlist => Delete "/wishlist/{product_id}" impl WishlistManagement);
pub async fn remove_from_wishlist<B: WishlistManagement>(
    claims: SessionClaims,
    path: web::Path<i64>,
    api: web::Data<WishlistApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let wishlist = api.remove(&claims.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Product removed from wishlist", "wishlist": wishlist })))
}

route!(move_to_cart => Post "/wishlist/{product_id}/move-to-cart" impl WishlistManagement);
/// Puts one unit of a saved product in the cart and takes it off the wishlist.
pub async fn move_to_cart<B: WishlistManagement>(
    claims: SessionClaims,
    path: web::Path<i64>,
    api: web::Data<WishlistApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    debug!("💻️ Moving product #{product_id} from {}'s wishlist to the cart", claims.user_id);
    let cart = api.move_to_cart(&claims.user_id, product_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Product moved to cart", "cart": cart })))
}

//----------------------------------------------   Catalog  ----------------------------------------------------
route!(categories => Get "/categories" impl CatalogManagement);
pub async fn categories<B: CatalogManagement>(api: web::Data<CatalogApi<B>>) -> Result<HttpResponse, ServerError> {
    let categories = api.categories().await?.into_iter().filter(|c| !c.is_blocked).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(json!({ "message": "Categories fetched", "categories": categories })))
}

route!(products => Get "/products" impl CatalogManagement);
/// Products on sale, optionally restricted to one category. Blocked products are hidden.
pub async fn products<B: CatalogManagement>(
    query: web::Query<ProductQuery>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let products = api.products(query.category_id).await?.into_iter().filter(|p| !p.is_blocked).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(json!({ "message": "Products fetched", "products": products })))
}

route!(product => Get "/products/{id}" impl CatalogManagement);
pub async fn product<B: CatalogManagement>(
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.product(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Product fetched", "product": product })))
}

route!(available_coupons => Get "/coupons" impl CouponManagement);
/// Coupons the caller could still use: unexpired, under their usage limit, and not used up by this shopper.
pub async fn available_coupons<B: CouponManagement>(
    claims: SessionClaims,
    api: web::Data<CouponApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let coupons = api.available_coupons(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Coupons fetched", "coupons": coupons })))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(checkout => Post "/orders" impl OrderFlowManagement);
/// Route handler for placing an order from the caller's cart.
///
/// A new order is answered with `201 Created`. If the request carries an idempotency key that was already used, the
/// original order is returned with `200 OK` and nothing else happens.
pub async fn checkout<B: OrderFlowManagement>(
    claims: SessionClaims,
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ POST checkout for {}", claims.user_id);
    let placed = api.checkout(&claims.user_id, body.into_inner()).await?;
    let response = if placed.is_new {
        HttpResponse::Created().json(json!({ "message": "Order placed", "order": placed.order }))
    } else {
        HttpResponse::Ok().json(json!({ "message": "Order already placed", "order": placed.order }))
    };
    Ok(response)
}

route!(my_orders => Get "/orders" impl OrderFlowManagement);
pub async fn my_orders<B: OrderFlowManagement>(
    claims: SessionClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for {}", claims.user_id);
    let orders = api.orders_for_user(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Orders fetched", "orders": orders })))
}

route!(my_order => Get "/orders/{id}" impl OrderFlowManagement);
pub async fn my_order<B: OrderFlowManagement>(
    claims: SessionClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.order_for_user(&claims.user_id, OrderId::from(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Order fetched", "order": order })))
}

route!(cancel_my_order => Post "/orders/{id}/cancel" impl OrderFlowManagement);
pub async fn cancel_my_order<B: OrderFlowManagement>(
    claims: SessionClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    info!("💻️ {} is cancelling order {id}", claims.user_id);
    let result = api.cancel_order(&claims.user_id, id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Order cancelled",
        "order": result.order,
        "refund": result.refund,
    })))
}

route!(cancel_my_item => Post "/orders/{id}/items/{item_id}/cancel" impl OrderFlowManagement);
pub async fn cancel_my_item<B: OrderFlowManagement>(
    claims: SessionClaims,
    path: web::Path<(i64, i64)>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (id, item_id) = path.into_inner();
    let id = OrderId::from(id);
    info!("💻️ {} is cancelling item {item_id} of order {id}", claims.user_id);
    let result = api.cancel_item(&claims.user_id, id, item_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Order item cancelled",
        "order": result.order,
        "refund": result.refund,
    })))
}

route!(return_my_item => Post "/orders/{id}/items/{item_id}/return" impl OrderFlowManagement);
/// Opens a return request for a delivered item. Nothing is refunded until an administrator accepts it.
pub async fn return_my_item<B: OrderFlowManagement>(
    claims: SessionClaims,
    path: web::Path<(i64, i64)>,
    body: Option<web::Json<ReturnRequestBody>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (id, item_id) = path.into_inner();
    let reason = body.and_then(|b| b.into_inner().reason).filter(|r| !r.trim().is_empty());
    let order = api.request_return(&claims.user_id, OrderId::from(id), item_id, reason.as_deref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Return request submitted", "order": order })))
}

route!(return_my_order => Post "/orders/{id}/return" impl OrderFlowManagement);
pub async fn return_my_order<B: OrderFlowManagement>(
    claims: SessionClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    info!("💻️ {} is returning order {id}", claims.user_id);
    let result = api.return_order(&claims.user_id, id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Order returned",
        "order": result.order,
        "refund": result.refund,
    })))
}

route!(create_charge => Post "/orders/{id}/charge" impl OrderFlowManagement, PaymentGateway);
/// Opens a gateway charge for an unpaid gateway order. The client completes the payment with the gateway, which then
/// reports back on `/gateway/payment-status`.
pub async fn create_charge<B, G>(
    claims: SessionClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<G>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderFlowManagement,
    G: PaymentGateway,
{
    let id = OrderId::from(path.into_inner());
    let (_, amount) = api.prepare_gateway_charge(&claims.user_id, id).await?;
    let receipt = format!("order_{}", id.value());
    let charge = gateway.create_charge(amount, gateway.currency(), &receipt).await?;
    api.record_charge(id, &charge.id, amount).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "Charge created", "charge": charge })))
}

//----------------------------------------------   Wallet  ----------------------------------------------------
route!(my_wallet => Get "/wallet" impl WalletManagement);
pub async fn my_wallet<B: WalletManagement>(
    claims: SessionClaims,
    query: web::Query<PageParams>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let view = api.wallet(&claims.user_id, query.page()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Wallet fetched", "wallet": view })))
}

//----------------------------------------------   Gateway  ----------------------------------------------------
route!(payment_status => Post "/payment-status" impl OrderFlowManagement);
/// Payment status callback from the gateway. The HMAC middleware has already checked the signature by the time this
/// runs. Repeated reports of the same status are harmless.
pub async fn payment_status<B: OrderFlowManagement>(
    req: HttpRequest,
    body: web::Json<PaymentStatusNotification>,
    options: web::Data<ServerOptions>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let notification = body.into_inner();
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    info!(
        "💻️ Payment status {} for order {} from {}",
        notification.status,
        notification.order_id,
        peer.map(|ip| ip.to_string()).unwrap_or_else(|| "an unknown address".into())
    );
    if let Some(charge_id) = &notification.charge_id {
        debug!("💻️ Gateway charge reference: {charge_id}");
    }
    let settled = api.payment_callback(notification.order_id, notification.status).await?;
    let body = json!({ "message": "Payment status updated", "order": settled.order, "refund": settled.refund });
    Ok(HttpResponse::Ok().json(body))
}

//----------------------------------------------   Admin: catalog  ----------------------------------------------------
route!(new_category => Post "/categories" impl CatalogManagement where requires [Role::Admin]);
pub async fn new_category<B: CatalogManagement>(
    body: web::Json<NewCategory>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let category = api.create_category(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "Category created", "category": category })))
}

route!(all_categories => Get "/categories" impl CatalogManagement where requires [Role::Admin]);
pub async fn all_categories<B: CatalogManagement>(
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let categories = api.categories().await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Categories fetched", "categories": categories })))
}

route!(block_category => Patch "/categories/{id}/block" impl CatalogManagement where requires [Role::Admin]);
pub async fn block_category<B: CatalogManagement>(
    path: web::Path<i64>,
    body: web::Json<BlockRequest>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let category = api.block_category(path.into_inner(), body.blocked).await?;
    let message = if category.is_blocked { "Category blocked" } else { "Category unblocked" };
    Ok(HttpResponse::Ok().json(json!({ "message": message, "category": category })))
}

route!(new_product => Post "/products" impl CatalogManagement where requires [Role::Admin]);
pub async fn new_product<B: CatalogManagement>(
    body: web::Json<NewProduct>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.create_product(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "Product created", "product": product })))
}

route!(all_products => Get "/products" impl CatalogManagement where requires [Role::Admin]);
pub async fn all_products<B: CatalogManagement>(
    query: web::Query<ProductQuery>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let products = api.products(query.category_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Products fetched", "products": products })))
}

route!(block_product => Patch "/products/{id}/block" impl CatalogManagement where requires [Role::Admin]);
pub async fn block_product<B: CatalogManagement>(
    path: web::Path<i64>,
    body: web::Json<BlockRequest>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.block_product(path.into_inner(), body.blocked).await?;
    let message = if product.is_blocked { "Product blocked" } else { "Product unblocked" };
    Ok(HttpResponse::Ok().json(json!({ "message": message, "product": product })))
}

route!(set_stock => Patch "/products/{id}/stock" impl CatalogManagement where requires [Role::Admin]);
pub async fn set_stock<B: CatalogManagement>(
    path: web::Path<i64>,
    body: web::Json<StockUpdate>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product = api.set_stock(path.into_inner(), body.stock).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Stock updated", "product": product })))
}

route!(new_offer => Post "/offers" impl CatalogManagement where requires [Role::Admin]);
/// Creates a category offer. Overlapping offers for the same category are refused.
pub async fn new_offer<B: CatalogManagement>(
    body: web::Json<NewCategoryOffer>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let offer = api.create_offer(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "Offer created", "offer": offer })))
}

route!(offers => Get "/offers" impl CatalogManagement where requires [Role::Admin]);
pub async fn offers<B: CatalogManagement>(
    query: web::Query<ProductQuery>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let offers = api.offers(query.category_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Offers fetched", "offers": offers })))
}

route!(activate_offer => Patch "/offers/{id}" impl CatalogManagement where requires [Role::Admin]);
pub async fn activate_offer<B: CatalogManagement>(
    path: web::Path<i64>,
    body: web::Json<OfferActivation>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let offer = api.set_offer_active(path.into_inner(), body.active).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Offer updated", "offer": offer })))
}

//----------------------------------------------   Admin: coupons  ----------------------------------------------------
route!(new_coupon => Post "/coupons" impl CouponManagement where requires [Role::Admin]);
pub async fn new_coupon<B: CouponManagement>(
    body: web::Json<NewCoupon>,
    api: web::Data<CouponApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let coupon = api.create_coupon(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({ "message": "Coupon created", "coupon": coupon })))
}

route!(coupons => Get "/coupons" impl CouponManagement where requires [Role::Admin]);
pub async fn coupons<B: CouponManagement>(
    query: web::Query<PageParams>,
    api: web::Data<CouponApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let page = api.coupons(query.page()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Coupons fetched", "coupons": page })))
}

route!(coupon => Get "/coupons/{id}" impl CouponManagement where requires [Role::Admin]);
pub async fn coupon<B: CouponManagement>(
    path: web::Path<i64>,
    api: web::Data<CouponApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let coupon = api.coupon(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Coupon fetched", "coupon": coupon })))
}

route!(delete_coupon => Delete "/coupons/{id}" impl CouponManagement where requires [Role::Admin]);
pub async fn delete_coupon<B: CouponManagement>(
    path: web::Path<i64>,
    api: web::Data<CouponApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    api.delete_coupon(id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Coupon {id} deleted"))))
}

//----------------------------------------------   Admin: orders  ----------------------------------------------------
route!(search_orders => Get "/orders" impl OrderFlowManagement where requires [Role::Admin]);
/// Order search for administrators. All filters are optional and combine with AND. For example,
/// `GET /admin/orders?status=Pending,Processing&payment_method=COD`.
pub async fn search_orders<B: OrderFlowManagement>(
    query: web::Query<OrderSearchParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let filter = query.into_inner().into_filter()?;
    debug!("💻️ Order search. {filter}");
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Orders fetched", "orders": orders })))
}

route!(order_by_id => Get "/orders/{id}" impl OrderFlowManagement where requires [Role::Admin]);
pub async fn order_by_id<B: OrderFlowManagement>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.admin_order(OrderId::from(path.into_inner())).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Order fetched", "order": order })))
}

route!(update_order_status => Patch "/orders/{id}/status" impl OrderFlowManagement where requires [Role::Admin]);
/// Moves an order, and every active line in it, forward along the fulfilment path.
pub async fn update_order_status<B: OrderFlowManagement>(
    path: web::Path<i64>,
    body: web::Json<StatusUpdate>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    info!("💻️ Setting status of order {id} to {}", body.status);
    let order = api.update_order_status(id, body.status).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Order status updated", "order": order })))
}

route!(update_item_status => Patch "/orders/{id}/items/{item_id}/status" impl OrderFlowManagement where requires [Role::Admin]);
pub async fn update_item_status<B: OrderFlowManagement>(
    path: web::Path<(i64, i64)>,
    body: web::Json<StatusUpdate>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (id, item_id) = path.into_inner();
    let id = OrderId::from(id);
    info!("💻️ Setting status of item {item_id} in order {id} to {}", body.status);
    let order = api.update_item_status(id, item_id, body.status).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Item status updated", "order": order })))
}

route!(resolve_return => Post "/orders/{id}/items/{item_id}/resolve-return" impl OrderFlowManagement where requires [Role::Admin]);
/// Accepts or rejects a pending return request. An accepted return restores stock and, if the order was paid up
/// front or delivered, refunds the item to the customer's wallet.
pub async fn resolve_return<B: OrderFlowManagement>(
    path: web::Path<(i64, i64)>,
    body: web::Json<ResolveReturnBody>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (id, item_id) = path.into_inner();
    let id = OrderId::from(id);
    info!("💻️ Return of item {item_id} in order {id}: {:?}", body.decision);
    let result = api.resolve_return(id, item_id, body.decision).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Return request resolved",
        "order": result.order,
        "refund": result.refund,
    })))
}

route!(admin_cancel_order => Post "/orders/{id}/cancel" impl OrderFlowManagement where requires [Role::Admin]);
pub async fn admin_cancel_order<B: OrderFlowManagement>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    info!("💻️ Admin is cancelling order {id}");
    let result = api.admin_cancel_order(id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Order cancelled",
        "order": result.order,
        "refund": result.refund,
    })))
}

//----------------------------------------------   Admin: sales dashboard  ------------------------------------------
route!(sales_report => Get "/sales-report" impl SalesReporting where requires [Role::Admin]);
/// Sales over delivered orders. Pick a preset `filter` (daily, weekly, yearly or all) and narrow it with
/// `start_date` and `end_date`. The end date is inclusive.
pub async fn sales_report<B: SalesReporting>(
    query: web::Query<SalesReportParams>,
    api: web::Data<ReportsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let SalesReportParams { filter, start_date, end_date, page } = query.into_inner();
    debug!("💻️ GET sales report. {filter:?} from {start_date:?} to {end_date:?}");
    let report = api.sales_report(filter, start_date, end_date, page.unwrap_or(1)).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Sales report generated", "report": report })))
}

route!(sales_chart => Get "/sales-chart" impl SalesReporting where requires [Role::Admin]);
pub async fn sales_chart<B: SalesReporting>(
    query: web::Query<ChartParams>,
    api: web::Data<ReportsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let points = api.sales_chart(query.interval).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Sales chart generated", "chart": points })))
}

route!(top_sellers => Get "/top-sellers" impl SalesReporting where requires [Role::Admin]);
pub async fn top_sellers<B: SalesReporting>(api: web::Data<ReportsApi<B>>) -> Result<HttpResponse, ServerError> {
    let top = api.top_sellers().await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Top sellers fetched",
        "products": top.products,
        "categories": top.categories,
    })))
}

//----------------------------------------------   Admin: users & wallets  --------------------------------------------
route!(user_by_id => Get "/users/{id}" impl AccountManagement where requires [Role::Admin]);
pub async fn user_by_id<B: AccountManagement>(
    path: web::Path<String>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user = api.user(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "User fetched", "user": user })))
}

route!(block_user => Patch "/users/{id}/block" impl AccountManagement where requires [Role::Admin]);
pub async fn block_user<B: AccountManagement>(
    path: web::Path<String>,
    body: web::Json<BlockRequest>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    info!("💻️ Setting blocked={} for {user_id}", body.blocked);
    let user = api.block_user(&user_id, body.blocked).await?;
    let message = if user.is_blocked { "User blocked" } else { "User unblocked" };
    Ok(HttpResponse::Ok().json(json!({ "message": message, "user": user })))
}

route!(user_wallet => Get "/wallets/{user_id}" impl WalletManagement where requires [Role::Admin]);
pub async fn user_wallet<B: WalletManagement>(
    path: web::Path<String>,
    query: web::Query<PageParams>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let view = api.wallet(&path.into_inner(), query.page()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Wallet fetched", "wallet": view })))
}

route!(adjust_wallet => Post "/wallets/{user_id}/adjust" impl WalletManagement where requires [Role::Admin]);
/// A manual credit or debit. Debits larger than the balance are refused.
pub async fn adjust_wallet<B: WalletManagement>(
    path: web::Path<String>,
    body: web::Json<WalletAdjustment>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    let adjustment = body.into_inner();
    info!("💻️ Wallet adjustment for {user_id}: {} {}", adjustment.kind, adjustment.amount);
    let transaction = api.adjust(&user_id, adjustment).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Wallet adjusted", "transaction": transaction })))
}
