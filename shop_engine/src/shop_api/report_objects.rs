use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shop_common::Money;
use sqlx::FromRow;

use crate::db_types::OrderId;

/// Preset report periods. Each one runs from its start up to now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFilter {
    /// Since midnight today
    Daily,
    /// Since midnight on the most recent Sunday
    Weekly,
    /// Since the 1st of January
    Yearly,
    #[default]
    All,
}

/// Bucket size for the sales chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartInterval {
    Weekly,
    Monthly,
    Yearly,
}

/// A half-open window `[since, until)` over order placement times. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl ReportWindow {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self { since: Some(since), until: Some(until) }
    }

    pub fn is_empty(&self) -> bool {
        matches!((self.since, self.until), (Some(s), Some(u)) if u <= s)
    }
}

impl Display for ReportWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.since, self.until) {
            (None, None) => write!(f, "all time"),
            (Some(s), None) => write!(f, "since {s}"),
            (None, Some(u)) => write!(f, "until {u}"),
            (Some(s), Some(u)) => write!(f, "{s} to {u}"),
        }
    }
}

/// What a single delivered order brought in, counting only the lines that were neither cancelled nor returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderSale {
    pub order_id: OrderId,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub units: i64,
    /// Σ price × quantity less the coupon share, over the kept lines
    pub sales: Money,
    pub discount: Money,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesTotals {
    pub total_orders: i64,
    pub total_sales: Money,
    pub total_discount: Money,
}

/// Totals over the delivered orders in a period, plus one page of those orders, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesReport {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub totals: SalesTotals,
    pub orders: Vec<OrderSale>,
    pub page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// `Week 23, 2024`, `6/2024` or `2024`
    pub period: String,
    pub total_sales: Money,
    pub total_orders: i64,
}

/// A product or category ranked by units sold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TopSeller {
    pub id: i64,
    pub name: String,
    pub units: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSellers {
    pub products: Vec<TopSeller>,
    pub categories: Vec<TopSeller>,
}
