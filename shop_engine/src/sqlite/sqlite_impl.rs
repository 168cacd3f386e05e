//! `SqliteDatabase` is a concrete implementation of a shop engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Every multi-step operation runs inside a single transaction; if any step fails, the transaction is dropped
//! and rolled back.
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use shop_common::Money;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{
    addresses,
    carts,
    catalog,
    coupons,
    db_url,
    is_unique_violation,
    new_pool,
    orders,
    reports,
    users,
    wallets,
    wishlists,
};
use crate::{
    db_types::{
        Address,
        AddressUpdate,
        Cart,
        Category,
        CategoryOffer,
        Coupon,
        NewAddress,
        NewCategory,
        NewCategoryOffer,
        NewCoupon,
        NewOrder,
        NewOrderItem,
        NewProduct,
        Order,
        OrderId,
        OrderItem,
        OrderStatus,
        PaymentMethod,
        PaymentStatus,
        Product,
        QuantityAction,
        ReturnDecision,
        ReturnStatus,
        TransactionType,
        User,
        WalletTransaction,
        Wishlist,
    },
    helpers::{
        apportion_discount,
        check_coupon_applicable,
        check_item_cancellable,
        check_item_returnable,
        check_item_status_update,
        check_order_cancellable,
        check_order_returnable,
        check_order_status_update,
        coupon_discount,
        gateway_status_change,
        initial_statuses,
        is_refund_eligible,
        overpayment,
        refund_for_item,
        validate_address,
        validate_new_coupon,
        validate_new_offer,
        GatewayStatusChange,
    },
    policy::ShopPolicy,
    shop_api::{
        cart_objects::{CartLine, CartProblem, CartView, StockProblem},
        errors::ShopError,
        order_objects::{CheckoutRequest, FullOrder, OrderQueryFilter, PlacedOrder, SettlementResult},
        report_objects::{OrderSale, ReportWindow, SalesTotals, TopSeller},
        wallet_objects::{page_count, ReferralBonus, ReferralOutcome, WalletAdjustment, WalletEntry, WalletView},
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
};

const DEFAULT_RETURN_REASON: &str = "No reason provided";

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `SHOP_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), ShopError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ShopError::DatabaseError(format!("Migration failed: {e}")))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Opens the user's wallet if necessary, and credits it.
async fn credit_wallet(
    user_id: &str,
    entry: WalletEntry,
    policy: &ShopPolicy,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, ShopError> {
    wallets::fetch_or_create_wallet(user_id, policy.welcome_bonus, conn).await?;
    wallets::credit(user_id, entry, conn).await
}

/// Credits `amount` to the order owner's wallet if it is more than zero. Returns the amount credited.
async fn refund_to_wallet(
    order: &Order,
    amount: Money,
    description: String,
    reference: String,
    policy: &ShopPolicy,
    conn: &mut SqliteConnection,
) -> Result<Money, ShopError> {
    if !amount.is_positive() {
        return Ok(Money::ZERO);
    }
    let entry = WalletEntry::new(amount, description).for_order(order.id).with_reference(reference);
    let tx = credit_wallet(&order.user_id, entry, policy, conn).await?;
    debug!("🗃️ {} refunded to {} for order {}", tx.amount, order.user_id, order.id);
    Ok(tx.amount)
}

fn find_item(order: &FullOrder, item_id: i64) -> Result<OrderItem, ShopError> {
    order.item(item_id).cloned().ok_or(ShopError::OrderItemNotFound { order: order.id(), item: item_id })
}

async fn active_user(user_id: &str, conn: &mut SqliteConnection) -> Result<User, ShopError> {
    let user = users::fetch_or_create_user(user_id, conn).await?;
    if user.is_blocked {
        warn!("🗃️ Blocked user {user_id} tried to use the shop");
        return Err(ShopError::UserBlocked(user_id.to_string()));
    }
    Ok(user)
}

/// Adds `quantity` units of a product to the user's cart line for it, at the current price. The product must be
/// on sale, and the line may not go over the per-line limit or the stock on hand.
async fn add_cart_units(
    user_id: &str,
    product_id: i64,
    quantity: i64,
    policy: &ShopPolicy,
    conn: &mut SqliteConnection,
) -> Result<(), ShopError> {
    let priced = catalog::price_product(product_id, Utc::now(), conn).await?;
    priced.check_available()?;
    let existing = carts::fetch_cart_item_for_product(user_id, product_id, conn).await?;
    let new_quantity = existing.map(|i| i.quantity).unwrap_or(0) + quantity;
    if new_quantity > policy.max_line_quantity {
        return Err(ShopError::LimitExceeded(format!(
            "You can order at most {} units of {}",
            policy.max_line_quantity, priced.product.name
        )));
    }
    if new_quantity > priced.product.stock {
        return Err(ShopError::InsufficientStock { product: priced.product.name, available: priced.product.stock });
    }
    let line = CartLine { product_id, name: priced.product.name, quantity: new_quantity, price: priced.price };
    carts::upsert_cart_line(user_id, line, conn).await?;
    Ok(())
}

impl OrderFlowManagement for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn place_order(
        &self,
        user_id: &str,
        request: CheckoutRequest,
        policy: &ShopPolicy,
    ) -> Result<PlacedOrder, ShopError> {
        let mut tx = self.pool.begin().await?;
        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(order) = orders::fetch_order_by_idempotency_key(user_id, key, &mut tx).await? {
                info!("🗃️ Checkout {key} for {user_id} has already been processed as order {}", order.id);
                let order = orders::full_order(order.id, &mut tx).await?;
                return Ok(PlacedOrder { order, is_new: false });
            }
        }
        active_user(user_id, &mut tx).await?;
        let cart = carts::fetch_cart_items(user_id, &mut tx).await?;
        if cart.is_empty() {
            return Err(ShopError::EmptyCart);
        }
        let address = addresses::fetch_address_for_user(user_id, request.address_id, &mut tx).await?;
        let now = Utc::now();
        let mut lines = Vec::with_capacity(cart.len());
        for item in &cart {
            let priced = catalog::price_product(item.product_id, now, &mut tx).await?;
            priced.check_available()?;
            if priced.product.stock < item.quantity {
                return Err(ShopError::InsufficientStock { product: priced.product.name, available: priced.product.stock });
            }
            lines.push(NewOrderItem {
                product_id: item.product_id,
                name: priced.product.name,
                price: priced.price,
                quantity: item.quantity,
                discount_share: Money::ZERO,
            });
        }
        let subtotal = lines.iter().map(NewOrderItem::line_total).sum::<Money>();
        let (discount, coupon) = match request.coupon_id {
            Some(coupon_id) => {
                let coupon = coupons::fetch_coupon(coupon_id, &mut tx).await?.ok_or(ShopError::CouponNotFound)?;
                let uses = coupons::user_coupon_uses(user_id, coupon_id, &mut tx).await?;
                check_coupon_applicable(&coupon, uses, subtotal, now, policy)?;
                (coupon_discount(&coupon, subtotal), Some(coupon))
            },
            None => (Money::ZERO, None),
        };
        let total_price = (subtotal - discount).floor_zero();
        if request.payment_method == PaymentMethod::Cod && total_price > policy.cod_ceiling {
            return Err(ShopError::CodCeilingExceeded(policy.cod_ceiling));
        }
        let quantities = lines.iter().map(|l| l.quantity).collect::<Vec<i64>>();
        let shares = apportion_discount(discount, &quantities);
        lines.iter_mut().zip(shares).for_each(|(line, share)| line.discount_share = share);
        for line in &lines {
            catalog::decrement_stock(line.product_id, line.quantity, &mut tx).await?;
        }
        if let Some(coupon) = &coupon {
            coupons::record_coupon_use(coupon, user_id, policy.max_coupon_uses_per_user, &mut tx).await?;
        }
        let (status, payment_status) = initial_statuses(request.payment_method);
        let new_order = NewOrder {
            user_id: user_id.to_string(),
            address: address.formatted(),
            subtotal,
            discount,
            total_price,
            status,
            payment_method: request.payment_method,
            payment_status,
            coupon_id: coupon.as_ref().map(|c| c.id),
            idempotency_key: request.idempotency_key.clone(),
        };
        let order = match orders::insert_order(new_order, &mut tx).await {
            Ok(order) => order,
            Err(e) if is_unique_violation(&e) => {
                return Err(ShopError::AlreadyProcessed(format!(
                    "Checkout {}",
                    request.idempotency_key.unwrap_or_default()
                )))
            },
            Err(e) => return Err(e.into()),
        };
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            items.push(orders::insert_order_item(order.id, line, status, &mut tx).await?);
        }
        if request.payment_method == PaymentMethod::Wallet {
            wallets::fetch_or_create_wallet(user_id, policy.welcome_bonus, &mut tx).await?;
            if total_price.is_positive() {
                let entry = WalletEntry::new(total_price, format!("Payment for order ({})", order.id.value()))
                    .for_order(order.id)
                    .with_reference(format!("order:{}:payment", order.id.value()));
                wallets::debit(user_id, entry, &mut tx).await?;
            }
        }
        let cleared = carts::clear_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Order {} placed by {user_id}. {} items ({cleared} cart lines), total {total_price}, paid by {}",
            order.id,
            items.len(),
            order.payment_method
        );
        Ok(PlacedOrder { order: FullOrder { order, items }, is_new: true })
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<FullOrder>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_full_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let query = OrderQueryFilter::default().with_user_id(user_id);
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        trace!("🗃️ Searching orders: {query}");
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn cancel_order(&self, id: OrderId, policy: &ShopPolicy) -> Result<SettlementResult, ShopError> {
        let mut tx = self.pool.begin().await?;
        let full = orders::full_order(id, &mut tx).await?;
        check_order_cancellable(&full.order)?;
        let eligible = is_refund_eligible(&full.order);
        let mut refund = Money::ZERO;
        for item in full.active_items() {
            orders::update_item_status(item, OrderStatus::Cancelled, &mut tx).await?;
            catalog::restore_stock(item.product_id, item.quantity, &mut tx).await?;
            refund += refund_for_item(item);
        }
        orders::update_order_status(id, OrderStatus::Cancelled, &mut tx).await?;
        let refunded = if eligible {
            let description = format!("Refund for cancelled order ({})", id.value());
            let reference = format!("refund:order:{}:cancel", id.value());
            let amount = refund_to_wallet(&full.order, refund, description, reference, policy, &mut tx).await?;
            orders::update_payment_status(id, PaymentStatus::Refunded, &mut tx).await?;
            amount
        } else {
            Money::ZERO
        };
        let order = orders::full_order(id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Order {id} cancelled. {refunded} refunded to {}", order.order.user_id);
        Ok(SettlementResult::new(order, refunded))
    }

    async fn cancel_order_item(
        &self,
        id: OrderId,
        item_id: i64,
        policy: &ShopPolicy,
    ) -> Result<SettlementResult, ShopError> {
        let mut tx = self.pool.begin().await?;
        let full = orders::full_order(id, &mut tx).await?;
        let item = find_item(&full, item_id)?;
        check_item_cancellable(&full.order, &item)?;
        orders::update_item_status(&item, OrderStatus::Cancelled, &mut tx).await?;
        catalog::restore_stock(item.product_id, item.quantity, &mut tx).await?;
        let eligible = is_refund_eligible(&full.order);
        let refunded = if eligible {
            let description = format!("Refund for cancelled product ({}) from order ({})", item.name, id.value());
            let reference = format!("refund:item:{item_id}");
            refund_to_wallet(&full.order, refund_for_item(&item), description, reference, policy, &mut tx).await?
        } else {
            Money::ZERO
        };
        let others_active = full.active_items().any(|i| i.id != item_id);
        if !others_active {
            debug!("🗃️ Last active item of order {id} cancelled. Cancelling the order");
            orders::update_order_status(id, OrderStatus::Cancelled, &mut tx).await?;
            if eligible {
                orders::update_payment_status(id, PaymentStatus::Refunded, &mut tx).await?;
            }
        }
        let order = orders::full_order(id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Item #{item_id} of order {id} cancelled. {refunded} refunded");
        Ok(SettlementResult::new(order, refunded))
    }

    async fn request_item_return(&self, id: OrderId, item_id: i64, reason: &str) -> Result<FullOrder, ShopError> {
        let mut tx = self.pool.begin().await?;
        let full = orders::full_order(id, &mut tx).await?;
        let item = find_item(&full, item_id)?;
        check_item_returnable(&full.order, &item)?;
        let reason = match reason.trim() {
            "" => DEFAULT_RETURN_REASON,
            r => r,
        };
        orders::open_return_request(&item, reason, &mut tx).await?;
        let order = orders::full_order(id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Return requested for item #{item_id} of order {id}: {reason}");
        Ok(order)
    }

    async fn resolve_return(
        &self,
        id: OrderId,
        item_id: i64,
        decision: ReturnDecision,
        policy: &ShopPolicy,
    ) -> Result<SettlementResult, ShopError> {
        let mut tx = self.pool.begin().await?;
        let full = orders::full_order(id, &mut tx).await?;
        let item = find_item(&full, item_id)?;
        let request = item.return_request.as_ref().ok_or(ShopError::ReturnRequestNotFound(item_id))?;
        if request.status != ReturnStatus::Pending {
            return Err(ShopError::AlreadyProcessed(format!("Return request for {}", item.name)));
        }
        orders::resolve_return_request(&item, decision.into(), &mut tx).await?;
        let mut refunded = Money::ZERO;
        if decision == ReturnDecision::Accepted {
            orders::update_item_status(&item, OrderStatus::Returned, &mut tx).await?;
            catalog::restore_stock(item.product_id, item.quantity, &mut tx).await?;
            let eligible = is_refund_eligible(&full.order);
            if eligible {
                let description = format!("Refund for returned product: {}", item.name);
                let reference = format!("refund:item:{item_id}");
                refunded =
                    refund_to_wallet(&full.order, refund_for_item(&item), description, reference, policy, &mut tx)
                        .await?;
            }
            if !full.active_items().any(|i| i.id != item_id) {
                debug!("🗃️ Every item of order {id} has been returned");
                orders::update_order_status(id, OrderStatus::Returned, &mut tx).await?;
                if eligible {
                    orders::update_payment_status(id, PaymentStatus::Refunded, &mut tx).await?;
                }
            }
        }
        let order = orders::full_order(id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Return of item #{item_id} in order {id} resolved as {decision:?}. {refunded} refunded");
        Ok(SettlementResult::new(order, refunded))
    }

    async fn return_order(&self, id: OrderId, policy: &ShopPolicy) -> Result<SettlementResult, ShopError> {
        let mut tx = self.pool.begin().await?;
        let full = orders::full_order(id, &mut tx).await?;
        check_order_returnable(&full.order)?;
        let eligible = is_refund_eligible(&full.order);
        let mut refund = Money::ZERO;
        for item in full.active_items() {
            if matches!(&item.return_request, Some(r) if r.status == ReturnStatus::Pending) {
                orders::resolve_return_request(item, ReturnStatus::Accepted, &mut tx).await?;
            }
            orders::update_item_status(item, OrderStatus::Returned, &mut tx).await?;
            catalog::restore_stock(item.product_id, item.quantity, &mut tx).await?;
            refund += refund_for_item(item);
        }
        orders::update_order_status(id, OrderStatus::Returned, &mut tx).await?;
        let refunded = if eligible {
            let description = format!("Refund for returned order ({})", id.value());
            let reference = format!("refund:order:{}:return", id.value());
            let amount = refund_to_wallet(&full.order, refund, description, reference, policy, &mut tx).await?;
            orders::update_payment_status(id, PaymentStatus::Refunded, &mut tx).await?;
            amount
        } else {
            Money::ZERO
        };
        let order = orders::full_order(id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Order {id} returned. {refunded} refunded to {}", order.order.user_id);
        Ok(SettlementResult::new(order, refunded))
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<FullOrder, ShopError> {
        let mut tx = self.pool.begin().await?;
        let full = orders::full_order(id, &mut tx).await?;
        check_order_status_update(&full.order, status)?;
        for item in full.active_items().filter(|i| i.status.rank() < status.rank()) {
            orders::update_item_status(item, status, &mut tx).await?;
        }
        let order = orders::update_order_status(id, status, &mut tx).await?;
        if status == OrderStatus::Delivered &&
            order.payment_method == PaymentMethod::Cod &&
            order.payment_status == PaymentStatus::Pending
        {
            debug!("🗃️ COD order {id} delivered. Marking payment as collected");
            orders::update_payment_status(id, PaymentStatus::Completed, &mut tx).await?;
        }
        let order = orders::full_order(id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Order {id} moved from {} to {status}", full.order.status);
        Ok(order)
    }

    async fn update_item_status(
        &self,
        id: OrderId,
        item_id: i64,
        status: OrderStatus,
    ) -> Result<FullOrder, ShopError> {
        let mut tx = self.pool.begin().await?;
        let full = orders::full_order(id, &mut tx).await?;
        let item = find_item(&full, item_id)?;
        check_item_status_update(&full.order, &item, status)?;
        orders::update_item_status(&item, status, &mut tx).await?;
        // The order follows once every active item has caught up
        let slowest = full
            .active_items()
            .map(|i| if i.id == item_id { status } else { i.status })
            .min_by_key(|s| s.rank());
        if let Some(slowest) = slowest.filter(|s| s.rank() > full.order.status.rank()) {
            debug!("🗃️ All active items of order {id} are now at least {slowest}");
            let order = orders::update_order_status(id, slowest, &mut tx).await?;
            if slowest == OrderStatus::Delivered &&
                order.payment_method == PaymentMethod::Cod &&
                order.payment_status == PaymentStatus::Pending
            {
                orders::update_payment_status(id, PaymentStatus::Completed, &mut tx).await?;
            }
        }
        let order = orders::full_order(id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Item #{item_id} of order {id} moved from {} to {status}", item.status);
        Ok(order)
    }

    async fn update_payment_status(
        &self,
        id: OrderId,
        status: PaymentStatus,
        policy: &ShopPolicy,
    ) -> Result<SettlementResult, ShopError> {
        let mut tx = self.pool.begin().await?;
        let full = orders::full_order(id, &mut tx).await?;
        let refunded = match gateway_status_change(&full.order, status)? {
            GatewayStatusChange::Unchanged => {
                debug!("🗃️ Order {id} already has payment status {status}. No action to take");
                return Ok(SettlementResult::new(full, Money::ZERO));
            },
            GatewayStatusChange::Update { advance } => {
                orders::update_payment_status(id, status, &mut tx).await?;
                if advance {
                    for item in full.items.iter().filter(|i| i.status == OrderStatus::Pending) {
                        orders::update_item_status(item, OrderStatus::Processing, &mut tx).await?;
                    }
                    orders::update_order_status(id, OrderStatus::Processing, &mut tx).await?;
                }
                let excess = if status == PaymentStatus::Completed {
                    overpayment(&full.order, &full.items)
                } else {
                    Money::ZERO
                };
                let description = format!("Refund for products cancelled before payment of order ({})", id.value());
                let reference = format!("refund:order:{}:overpayment", id.value());
                refund_to_wallet(&full.order, excess, description, reference, policy, &mut tx).await?
            },
            GatewayStatusChange::RefundLatePayment => {
                let collected = full.order.charged_amount.unwrap_or(full.order.total_price);
                warn!("🗃️ Payment of {collected} arrived for order {id}, which is already {}", full.order.status);
                let description = format!("Refund for payment received after order ({}) was closed", id.value());
                let reference = format!("refund:order:{}:late-payment", id.value());
                let amount = refund_to_wallet(&full.order, collected, description, reference, policy, &mut tx).await?;
                orders::update_payment_status(id, PaymentStatus::Refunded, &mut tx).await?;
                amount
            },
        };
        let order = orders::full_order(id, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Payment for order {id} is now {}. {refunded} refunded", order.order.payment_status);
        Ok(SettlementResult::new(order, refunded))
    }

    async fn record_charge(&self, id: OrderId, charge_id: &str, amount: Money) -> Result<Order, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::record_charge(id, charge_id, amount, &mut conn).await?;
        debug!("🗃️ Gateway charge {charge_id} for {amount} recorded for order {id}");
        Ok(order)
    }
}

impl CartManagement for SqliteDatabase {
    async fn add_to_cart(
        &self,
        user_id: &str,
        product_id: i64,
        quantity: i64,
        policy: &ShopPolicy,
    ) -> Result<Cart, ShopError> {
        if quantity < 1 {
            return Err(ShopError::Validation("Quantity must be at least 1".into()));
        }
        let mut tx = self.pool.begin().await?;
        active_user(user_id, &mut tx).await?;
        add_cart_units(user_id, product_id, quantity, policy, &mut tx).await?;
        let cart = carts::fetch_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🛒️ {quantity} of product #{product_id} added to {user_id}'s cart. Total is now {}", cart.total_price);
        Ok(cart)
    }

    async fn fetch_cart(&self, user_id: &str) -> Result<CartView, ShopError> {
        let mut tx = self.pool.begin().await?;
        let items = carts::fetch_cart_items(user_id, &mut tx).await?;
        let now = Utc::now();
        let mut blocked_products = vec![];
        let mut blocked_categories = vec![];
        let mut insufficient_stock = vec![];
        let mut refreshed = Vec::with_capacity(items.len());
        for mut item in items {
            let priced = catalog::price_product(item.product_id, now, &mut tx).await?;
            if priced.price != item.price {
                trace!("🛒️ Price of {} changed from {} to {}", item.name, item.price, priced.price);
                carts::set_item_price(item.id, priced.price, &mut tx).await?;
                item.price = priced.price;
            }
            let problem = || CartProblem { item_id: item.id, product_id: item.product_id, name: item.name.clone() };
            if priced.product.is_blocked {
                blocked_products.push(problem());
            } else if priced.category.is_blocked {
                blocked_categories.push(problem());
            }
            if item.quantity > priced.product.stock {
                insufficient_stock.push(StockProblem {
                    item_id: item.id,
                    product_id: item.product_id,
                    name: item.name.clone(),
                    requested: item.quantity,
                    available: priced.product.stock,
                });
            }
            refreshed.push(item);
        }
        tx.commit().await?;
        let cart = carts::cart_from_items(user_id, refreshed);
        Ok(CartView { cart, blocked_products, blocked_categories, insufficient_stock })
    }

    async fn remove_from_cart(&self, user_id: &str, item_id: i64) -> Result<Cart, ShopError> {
        let mut tx = self.pool.begin().await?;
        let items = carts::fetch_cart_items(user_id, &mut tx).await?;
        if items.is_empty() {
            return Err(ShopError::CartNotFound);
        }
        carts::delete_cart_item(user_id, item_id, &mut tx).await?;
        let cart = carts::fetch_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🛒️ Item #{item_id} removed from {user_id}'s cart");
        Ok(cart)
    }

    async fn update_cart_quantity(
        &self,
        user_id: &str,
        item_id: i64,
        action: QuantityAction,
        policy: &ShopPolicy,
    ) -> Result<Cart, ShopError> {
        let mut tx = self.pool.begin().await?;
        let item = carts::fetch_cart_item(user_id, item_id, &mut tx).await?.ok_or(ShopError::CartItemNotFound(item_id))?;
        let priced = catalog::price_product(item.product_id, Utc::now(), &mut tx).await?;
        let quantity = match action {
            QuantityAction::Increase => {
                priced.check_available()?;
                let quantity = item.quantity + 1;
                if quantity > policy.max_line_quantity {
                    return Err(ShopError::LimitExceeded(format!(
                        "You can order at most {} units of {}",
                        policy.max_line_quantity, item.name
                    )));
                }
                if quantity > priced.product.stock {
                    return Err(ShopError::InsufficientStock { product: item.name, available: priced.product.stock });
                }
                quantity
            },
            QuantityAction::Decrease => {
                let quantity = item.quantity - 1;
                if quantity < 1 {
                    return Err(ShopError::Validation("Minimum quantity must be 1".into()));
                }
                quantity
            },
        };
        carts::set_item_quantity_and_price(item.id, quantity, priced.price, &mut tx).await?;
        let cart = carts::fetch_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        trace!("🛒️ Quantity of item #{item_id} in {user_id}'s cart set to {quantity}");
        Ok(cart)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn create_category(&self, category: NewCategory) -> Result<Category, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let category = catalog::insert_category(category, &mut conn).await?;
        debug!("🗃️ Category #{} ({}) created", category.id, category.name);
        Ok(category)
    }

    async fn fetch_category(&self, id: i64) -> Result<Option<Category>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let category = catalog::fetch_category(id, &mut conn).await?;
        Ok(category)
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let categories = catalog::fetch_categories(&mut conn).await?;
        Ok(categories)
    }

    async fn set_category_blocked(&self, id: i64, blocked: bool) -> Result<Category, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let category = catalog::set_category_blocked(id, blocked, &mut conn).await?;
        info!("🗃️ Category {} is now {}", category.name, if blocked { "blocked" } else { "unblocked" });
        Ok(category)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, ShopError> {
        if product.name.trim().is_empty() {
            return Err(ShopError::Validation("Product name is required".into()));
        }
        if product.stock < 0 {
            return Err(ShopError::Validation("Stock cannot be negative".into()));
        }
        if product.sales_price.is_negative() {
            return Err(ShopError::Validation("Price cannot be negative".into()));
        }
        let mut tx = self.pool.begin().await?;
        catalog::fetch_category(product.category_id, &mut tx)
            .await?
            .ok_or(ShopError::CategoryNotFound(product.category_id))?;
        let product = catalog::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Product #{} ({}) created", product.id, product.name);
        Ok(product)
    }

    async fn fetch_product(&self, id: i64) -> Result<Option<Product>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::fetch_product(id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_products(&self, category_id: Option<i64>) -> Result<Vec<Product>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let products = catalog::fetch_products(category_id, &mut conn).await?;
        Ok(products)
    }

    async fn set_product_blocked(&self, id: i64, blocked: bool) -> Result<Product, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::set_product_blocked(id, blocked, &mut conn).await?;
        info!("🗃️ Product {} is now {}", product.name, if blocked { "blocked" } else { "unblocked" });
        Ok(product)
    }

    async fn set_product_stock(&self, id: i64, stock: i64) -> Result<Product, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::set_product_stock(id, stock, &mut conn).await?;
        debug!("🗃️ Stock of {} set to {stock}", product.name);
        Ok(product)
    }

    async fn create_offer(&self, offer: NewCategoryOffer, policy: &ShopPolicy) -> Result<CategoryOffer, ShopError> {
        let mut tx = self.pool.begin().await?;
        catalog::fetch_category(offer.category_id, &mut tx).await?.ok_or(ShopError::CategoryNotFound(offer.category_id))?;
        let cheapest = catalog::cheapest_price_in_category(offer.category_id, &mut tx).await?;
        validate_new_offer(&offer, cheapest, policy)?;
        let offer = catalog::insert_offer(offer, &mut tx).await?;
        tx.commit().await?;
        Ok(offer)
    }

    async fn fetch_offers(&self, category_id: Option<i64>) -> Result<Vec<CategoryOffer>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let offers = match category_id {
            Some(id) => catalog::fetch_offers_for_category(id, &mut conn).await?,
            None => catalog::fetch_all_offers(&mut conn).await?,
        };
        Ok(offers)
    }

    async fn set_offer_active(&self, id: i64, active: bool) -> Result<CategoryOffer, ShopError> {
        let mut tx = self.pool.begin().await?;
        let offer = catalog::set_offer_active(id, active, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Offer #{id} is now {}", if active { "active" } else { "inactive" });
        Ok(offer)
    }
}

impl CouponManagement for SqliteDatabase {
    async fn create_coupon(&self, coupon: NewCoupon, policy: &ShopPolicy) -> Result<Coupon, ShopError> {
        validate_new_coupon(&coupon, policy, Utc::now())?;
        let mut conn = self.pool.acquire().await?;
        let coupon = coupons::insert_coupon(coupon, &mut conn).await?;
        debug!("🎟️ Coupon {} created ({})", coupon.name, coupon.discount());
        Ok(coupon)
    }

    async fn delete_coupon(&self, id: i64) -> Result<(), ShopError> {
        let mut conn = self.pool.acquire().await?;
        coupons::delete_coupon(id, &mut conn).await?;
        debug!("🎟️ Coupon #{id} deleted");
        Ok(())
    }

    async fn fetch_coupon(&self, id: i64) -> Result<Option<Coupon>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let coupon = coupons::fetch_coupon(id, &mut conn).await?;
        Ok(coupon)
    }

    async fn fetch_coupons(&self, page: i64, page_size: i64) -> Result<(Vec<Coupon>, i64), ShopError> {
        let mut conn = self.pool.acquire().await?;
        let total = coupons::count_coupons(&mut conn).await?;
        let coupons = coupons::fetch_coupons(page, page_size, &mut conn).await?;
        Ok((coupons, total))
    }

    async fn fetch_available_coupons(&self, user_id: &str, policy: &ShopPolicy) -> Result<Vec<Coupon>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let coupons =
            coupons::fetch_available_coupons(user_id, Utc::now(), policy.max_coupon_uses_per_user, &mut conn).await?;
        Ok(coupons)
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_or_create_user(&self, user_id: &str) -> Result<User, ShopError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_or_create_user(user_id, &mut conn).await
    }

    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn set_user_blocked(&self, user_id: &str, blocked: bool) -> Result<User, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::set_blocked(user_id, blocked, &mut conn).await?;
        info!("🗃️ User {user_id} is now {}", if blocked { "blocked" } else { "unblocked" });
        Ok(user)
    }

    async fn add_address(&self, user_id: &str, address: NewAddress) -> Result<Address, ShopError> {
        validate_address(&address)?;
        let mut tx = self.pool.begin().await?;
        users::fetch_or_create_user(user_id, &mut tx).await?;
        let address = addresses::insert_address(user_id, address, &mut tx).await?;
        tx.commit().await?;
        Ok(address)
    }

    async fn fetch_addresses(&self, user_id: &str) -> Result<Vec<Address>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let addresses = addresses::fetch_addresses(user_id, &mut conn).await?;
        Ok(addresses)
    }

    async fn update_address(
        &self,
        user_id: &str,
        address_id: i64,
        update: AddressUpdate,
    ) -> Result<Address, ShopError> {
        let mut tx = self.pool.begin().await?;
        let current = addresses::fetch_address_for_user(user_id, address_id, &mut tx).await?;
        let edited = update.apply_to(&current);
        validate_address(&edited)?;
        let address = addresses::update_address(user_id, address_id, edited, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Address #{address_id} of {user_id} updated");
        Ok(address)
    }

    async fn delete_address(&self, user_id: &str, address_id: i64) -> Result<(), ShopError> {
        let mut conn = self.pool.acquire().await?;
        addresses::delete_address(user_id, address_id, &mut conn).await
    }

    async fn apply_referral(
        &self,
        user_id: &str,
        code: &str,
        policy: &ShopPolicy,
    ) -> Result<ReferralOutcome, ShopError> {
        let mut tx = self.pool.begin().await?;
        let user = users::fetch_or_create_user(user_id, &mut tx).await?;
        let referrer = users::fetch_user_by_referral_code(code, &mut tx).await?.ok_or(ShopError::ReferralCodeNotFound)?;
        if referrer.id == user.id {
            return Err(ShopError::Validation("You cannot use your own referral code".into()));
        }
        if user.referred_by.is_some() {
            return Err(ShopError::AlreadyReferred);
        }
        users::set_referred_by(user_id, &referrer.id, &mut tx).await?;
        wallets::fetch_or_create_wallet(user_id, policy.welcome_bonus, &mut tx).await?;
        if policy.referee_bonus.is_positive() {
            let entry = WalletEntry::new(policy.referee_bonus, "Referral bonus for joining with a referral code")
                .with_reference(format!("referral:{user_id}"));
            wallets::credit(user_id, entry, &mut tx).await?;
        }
        if policy.referrer_bonus.is_positive() {
            let entry = WalletEntry::new(policy.referrer_bonus, "Referral bonus for inviting a friend")
                .with_reference(format!("referral:{user_id}:referrer"));
            credit_wallet(&referrer.id, entry, policy, &mut tx).await?;
        }
        let referee_wallet =
            wallets::fetch_wallet(user_id, &mut tx).await?.ok_or_else(|| ShopError::UserNotFound(user_id.into()))?;
        tx.commit().await?;
        info!("🗃️ {user_id} was referred by {}", referrer.id);
        let bonus = ReferralBonus { referrer: policy.referrer_bonus, referee: policy.referee_bonus };
        Ok(ReferralOutcome { referrer_id: referrer.id, referee_wallet, bonus })
    }
}

impl WalletManagement for SqliteDatabase {
    async fn fetch_wallet(&self, user_id: &str, page: i64, policy: &ShopPolicy) -> Result<WalletView, ShopError> {
        let mut tx = self.pool.begin().await?;
        users::fetch_or_create_user(user_id, &mut tx).await?;
        let wallet = wallets::fetch_or_create_wallet(user_id, policy.welcome_bonus, &mut tx).await?;
        let total = wallets::count_transactions(user_id, &mut tx).await?;
        let page = page.max(1);
        let transactions = wallets::fetch_transactions(user_id, page, policy.page_size, &mut tx).await?;
        tx.commit().await?;
        let total_pages = page_count(total, policy.page_size);
        Ok(WalletView { wallet, transactions, page, total_pages })
    }

    async fn adjust_wallet(
        &self,
        user_id: &str,
        adjustment: WalletAdjustment,
        policy: &ShopPolicy,
    ) -> Result<WalletTransaction, ShopError> {
        if adjustment.description.trim().is_empty() {
            return Err(ShopError::Validation("A description is required".into()));
        }
        let mut tx = self.pool.begin().await?;
        users::fetch_or_create_user(user_id, &mut tx).await?;
        wallets::fetch_or_create_wallet(user_id, policy.welcome_bonus, &mut tx).await?;
        let mut entry = WalletEntry::new(adjustment.amount, adjustment.description);
        if let Some(order_id) = adjustment.order_id {
            entry = entry.for_order(order_id);
        }
        let transaction = match adjustment.kind {
            TransactionType::Credit => wallets::credit(user_id, entry, &mut tx).await?,
            TransactionType::Debit => wallets::debit(user_id, entry, &mut tx).await?,
        };
        tx.commit().await?;
        info!("👛️ Wallet of {user_id} adjusted: {} {}", transaction.kind, transaction.amount);
        Ok(transaction)
    }
}

impl WishlistManagement for SqliteDatabase {
    async fn add_to_wishlist(&self, user_id: &str, product_id: i64) -> Result<Wishlist, ShopError> {
        let mut tx = self.pool.begin().await?;
        active_user(user_id, &mut tx).await?;
        let priced = catalog::price_product(product_id, Utc::now(), &mut tx).await?;
        priced.check_available()?;
        wishlists::insert_wishlist_item(user_id, product_id, &priced.product.name, priced.price, &mut tx).await?;
        let wishlist = wishlists::fetch_wishlist(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(wishlist)
    }

    async fn fetch_wishlist(&self, user_id: &str) -> Result<Wishlist, ShopError> {
        let mut tx = self.pool.begin().await?;
        let items = wishlists::fetch_wishlist_items(user_id, &mut tx).await?;
        let now = Utc::now();
        let mut refreshed = Vec::with_capacity(items.len());
        for mut item in items {
            let priced = catalog::price_product(item.product_id, now, &mut tx).await?;
            if priced.price != item.price {
                trace!("🛒️ Wishlist price of {} changed from {} to {}", item.name, item.price, priced.price);
                wishlists::set_wishlist_price(item.id, priced.price, &mut tx).await?;
                item.price = priced.price;
            }
            refreshed.push(item);
        }
        tx.commit().await?;
        Ok(wishlists::wishlist_from_items(user_id, refreshed))
    }

    async fn remove_from_wishlist(&self, user_id: &str, product_id: i64) -> Result<Wishlist, ShopError> {
        let mut tx = self.pool.begin().await?;
        wishlists::delete_wishlist_item(user_id, product_id, &mut tx).await?;
        let wishlist = wishlists::fetch_wishlist(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(wishlist)
    }

    async fn move_to_cart(&self, user_id: &str, product_id: i64, policy: &ShopPolicy) -> Result<Cart, ShopError> {
        let mut tx = self.pool.begin().await?;
        active_user(user_id, &mut tx).await?;
        wishlists::delete_wishlist_item(user_id, product_id, &mut tx).await?;
        add_cart_units(user_id, product_id, 1, policy, &mut tx).await?;
        let cart = carts::fetch_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }
}

impl SalesReporting for SqliteDatabase {
    async fn fetch_sales_totals(&self, window: ReportWindow) -> Result<SalesTotals, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let totals = reports::sales_totals(window, &mut conn).await?;
        Ok(totals)
    }

    async fn fetch_order_sales(
        &self,
        window: ReportWindow,
        page: Option<(i64, i64)>,
    ) -> Result<Vec<OrderSale>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let sales = reports::order_sales(window, page, &mut conn).await?;
        Ok(sales)
    }

    async fn fetch_top_products(&self, limit: i64) -> Result<Vec<TopSeller>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let products = reports::top_products(limit, &mut conn).await?;
        Ok(products)
    }

    async fn fetch_top_categories(&self, limit: i64) -> Result<Vec<TopSeller>, ShopError> {
        let mut conn = self.pool.acquire().await?;
        let categories = reports::top_categories(limit, &mut conn).await?;
        Ok(categories)
    }
}
