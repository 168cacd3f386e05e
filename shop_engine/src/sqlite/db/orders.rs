use chrono::{DateTime, Utc};
use log::{debug, trace};
use shop_common::Money;
use sqlx::{FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{
        NewOrder,
        NewOrderItem,
        Order,
        OrderId,
        OrderItem,
        OrderStatus,
        PaymentStatus,
        ReturnRequest,
        ReturnStatus,
    },
    shop_api::{
        errors::ShopError,
        order_objects::{FullOrder, OrderQueryFilter},
    },
};

/// The flat `order_items` row. The return request columns are folded into [`OrderItem::return_request`].
#[derive(Debug, Clone, FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: OrderId,
    product_id: i64,
    name: String,
    price: Money,
    quantity: i64,
    discount_share: Money,
    status: OrderStatus,
    return_status: Option<ReturnStatus>,
    return_reason: Option<String>,
    return_requested_at: Option<DateTime<Utc>>,
    return_updated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        let return_request = match (row.return_status, row.return_requested_at) {
            (Some(status), Some(requested_at)) => Some(ReturnRequest {
                status,
                reason: row.return_reason.unwrap_or_default(),
                requested_at,
                updated_at: row.return_updated_at.unwrap_or(requested_at),
            }),
            _ => None,
        };
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            name: row.name,
            price: row.price,
            quantity: row.quantity,
            discount_share: row.discount_share,
            status: row.status,
            return_request,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let now = Utc::now();
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                user_id,
                address,
                subtotal,
                discount,
                total_price,
                status,
                payment_method,
                payment_status,
                coupon_id,
                idempotency_key,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING *;
        "#,
    )
    .bind(order.user_id)
    .bind(order.address)
    .bind(order.subtotal)
    .bind(order.discount)
    .bind(order.total_price)
    .bind(order.status)
    .bind(order.payment_method)
    .bind(order.payment_status)
    .bind(order.coupon_id)
    .bind(order.idempotency_key)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn insert_order_item(
    order_id: OrderId,
    item: NewOrderItem,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    let now = Utc::now();
    let row: OrderItemRow = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, product_id, name, price, quantity, discount_share, status, created_at,
                updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.name)
    .bind(item.price)
    .bind(item.quantity)
    .bind(item.discount_share)
    .bind(status)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(row.into())
}

pub async fn fetch_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_idempotency_key(
    user_id: &str,
    key: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 AND idempotency_key = $2")
        .bind(user_id)
        .bind(key)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let rows: Vec<OrderItemRow> = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(OrderItem::from).collect())
}

pub async fn fetch_full_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<FullOrder>, sqlx::Error> {
    let Some(order) = fetch_order(id, conn).await? else {
        return Ok(None);
    };
    let items = fetch_order_items(id, conn).await?;
    Ok(Some(FullOrder { order, items }))
}

/// Like [`fetch_full_order`], but a missing order is an error.
pub async fn full_order(id: OrderId, conn: &mut SqliteConnection) -> Result<FullOrder, ShopError> {
    fetch_full_order(id, conn).await?.ok_or(ShopError::OrderNotFound(id))
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are sorted newest first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(method) = query.payment_method {
        where_clause.push("payment_method = ");
        where_clause.push_bind_unseparated(method);
    }
    if let Some(status) = query.payment_status {
        where_clause.push("payment_status = ");
        where_clause.push_bind_unseparated(status);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at < ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC, id DESC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

pub async fn update_order_status(
    id: OrderId,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, ShopError> {
    let order: Option<Order> = sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(conn)
        .await?;
    debug!("🗃️ Order {id} status set to {status}");
    order.ok_or(ShopError::OrderNotFound(id))
}

pub async fn update_payment_status(
    id: OrderId,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, ShopError> {
    let order: Option<Order> =
        sqlx::query_as("UPDATE orders SET payment_status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(conn)
            .await?;
    debug!("🗃️ Order {id} payment status set to {status}");
    order.ok_or(ShopError::OrderNotFound(id))
}

/// Stores the gateway's reference for a new charge along with the amount it was raised for.
pub async fn record_charge(
    id: OrderId,
    charge_id: &str,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<Order, ShopError> {
    let order: Option<Order> = sqlx::query_as(
        "UPDATE orders SET charge_id = $1, charged_amount = $2, updated_at = $3 WHERE id = $4 RETURNING *",
    )
    .bind(charge_id)
    .bind(amount)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    order.ok_or(ShopError::OrderNotFound(id))
}

/// Moves an item from `from` to `to`. The write is conditional on the item still having status `from`, so if another
/// request has changed the item in the meantime, this fails with [`ShopError::AlreadyProcessed`].
pub async fn update_item_status(
    item: &OrderItem,
    to: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<(), ShopError> {
    let result = sqlx::query("UPDATE order_items SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4")
        .bind(to)
        .bind(Utc::now())
        .bind(item.id)
        .bind(item.status)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ShopError::AlreadyProcessed(format!("Status change of {}", item.name)));
    }
    trace!("🗃️ Item #{} of order {} moved from {} to {to}", item.id, item.order_id, item.status);
    Ok(())
}

/// Opens a return request on an item. Only one request can ever be opened per item.
pub async fn open_return_request(item: &OrderItem, reason: &str, conn: &mut SqliteConnection) -> Result<(), ShopError> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
            UPDATE order_items
            SET return_status = $1, return_reason = $2, return_requested_at = $3, return_updated_at = $3
            WHERE id = $4 AND return_status IS NULL
        "#,
    )
    .bind(ReturnStatus::Pending)
    .bind(reason)
    .bind(now)
    .bind(item.id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ShopError::AlreadyProcessed(format!("Return request for {}", item.name)));
    }
    Ok(())
}

/// Resolves a pending return request. Fails with [`ShopError::AlreadyProcessed`] if the request is no longer pending.
pub async fn resolve_return_request(
    item: &OrderItem,
    status: ReturnStatus,
    conn: &mut SqliteConnection,
) -> Result<(), ShopError> {
    let result = sqlx::query(
        "UPDATE order_items SET return_status = $1, return_updated_at = $2 WHERE id = $3 AND return_status = $4",
    )
    .bind(status)
    .bind(Utc::now())
    .bind(item.id)
    .bind(ReturnStatus::Pending)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ShopError::AlreadyProcessed(format!("Return request for {}", item.name)));
    }
    Ok(())
}
