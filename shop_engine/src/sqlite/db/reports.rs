//! Sales figures. Only delivered orders count as sales, and within them only the lines that were neither cancelled
//! nor returned. A line's contribution is what the customer paid for it: `price × quantity - discount_share`.
use log::trace;
use shop_common::Money;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::OrderStatus,
    shop_api::{
        report_objects::{OrderSale, ReportWindow, SalesTotals, TopSeller},
        wallet_objects::page_offset,
    },
};

const LINE_SALES: &str = "order_items.price * order_items.quantity - order_items.discount_share";

fn push_kept_lines(builder: &mut QueryBuilder<'_, Sqlite>) {
    builder.push("order_items.status NOT IN (");
    builder.push_bind(OrderStatus::Cancelled);
    builder.push(", ");
    builder.push_bind(OrderStatus::Returned);
    builder.push(")");
}

fn push_delivered_in_window(builder: &mut QueryBuilder<'_, Sqlite>, window: ReportWindow) {
    builder.push(" FROM orders JOIN order_items ON order_items.order_id = orders.id WHERE orders.status = ");
    builder.push_bind(OrderStatus::Delivered);
    builder.push(" AND ");
    push_kept_lines(builder);
    if let Some(since) = window.since {
        builder.push(" AND orders.created_at >= ");
        builder.push_bind(since);
    }
    if let Some(until) = window.until {
        builder.push(" AND orders.created_at < ");
        builder.push_bind(until);
    }
}

pub async fn sales_totals(window: ReportWindow, conn: &mut SqliteConnection) -> Result<SalesTotals, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT COUNT(DISTINCT orders.id), COALESCE(SUM(");
    builder.push(LINE_SALES);
    builder.push("), 0), COALESCE(SUM(order_items.discount_share), 0)");
    push_delivered_in_window(&mut builder, window);
    let (total_orders, total_sales, total_discount): (i64, i64, i64) =
        builder.build_query_as().fetch_one(conn).await?;
    trace!("🗃️ Sales {window}: {total_orders} orders");
    Ok(SalesTotals {
        total_orders,
        total_sales: Money::from(total_sales),
        total_discount: Money::from(total_discount),
    })
}

/// Per-order sales in the window, newest first. Pass a page to fetch a single page, or `None` for everything.
pub async fn order_sales(
    window: ReportWindow,
    page: Option<(i64, i64)>,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderSale>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        "SELECT orders.id AS order_id, orders.user_id, orders.created_at, SUM(order_items.quantity) AS units, SUM(",
    );
    builder.push(LINE_SALES);
    builder.push(") AS sales, SUM(order_items.discount_share) AS discount");
    push_delivered_in_window(&mut builder, window);
    builder.push(" GROUP BY orders.id ORDER BY orders.created_at DESC, orders.id DESC");
    if let Some((page, page_size)) = page {
        builder.push(" LIMIT ");
        builder.push_bind(page_size);
        builder.push(" OFFSET ");
        builder.push_bind(page_offset(page, page_size));
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    builder.build_query_as::<OrderSale>().fetch_all(conn).await
}

/// Products ranked by units sold, over every order line that has not been cancelled or returned.
pub async fn top_products(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<TopSeller>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        "SELECT products.id AS id, products.name AS name, SUM(order_items.quantity) AS units FROM order_items JOIN \
         products ON products.id = order_items.product_id WHERE ",
    );
    push_kept_lines(&mut builder);
    builder.push(" GROUP BY products.id ORDER BY units DESC, products.id ASC LIMIT ");
    builder.push_bind(limit);
    builder.build_query_as::<TopSeller>().fetch_all(conn).await
}

/// Categories ranked by units sold, using each product's current category.
pub async fn top_categories(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<TopSeller>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        "SELECT categories.id AS id, categories.name AS name, SUM(order_items.quantity) AS units FROM order_items \
         JOIN products ON products.id = order_items.product_id JOIN categories ON categories.id = \
         products.category_id WHERE ",
    );
    push_kept_lines(&mut builder);
    builder.push(" GROUP BY categories.id ORDER BY units DESC, categories.id ASC LIMIT ");
    builder.push_bind(limit);
    builder.build_query_as::<TopSeller>().fetch_all(conn).await
}
