use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shop_engine::{
    db_types::{OrderId, OrderStatus, PaymentMethod, PaymentStatus, ReturnDecision},
    order_objects::OrderQueryFilter,
    report_objects::{ChartInterval, ReportFilter},
};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReturnRequestBody {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResolveReturnBody {
    pub decision: ReturnDecision,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockRequest {
    pub blocked: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StockUpdate {
    pub stock: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OfferActivation {
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralRequest {
    pub code: String,
}

/// The body of a payment status callback from the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusNotification {
    pub order_id: OrderId,
    pub status: PaymentStatus,
    #[serde(default)]
    pub charge_id: Option<String>,
}

/// Query string for the sales report, e.g. `?filter=weekly&page=2` or `?start_date=2024-06-01&end_date=2024-06-30`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SalesReportParams {
    #[serde(default)]
    pub filter: ReportFilter,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub page: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChartParams {
    pub interval: ChartInterval,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WishlistRequest {
    pub product_id: i64,
}

/// Query string for the admin order search. `status` takes a comma-separated list, e.g. `?status=Pending,Shipped`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSearchParams {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

impl OrderSearchParams {
    pub fn into_filter(self) -> Result<OrderQueryFilter, ServerError> {
        let status = match self.status {
            None => None,
            Some(s) => {
                let statuses = s
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.trim().parse::<OrderStatus>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
                Some(statuses).filter(|v| !v.is_empty())
            },
        };
        Ok(OrderQueryFilter {
            user_id: self.user_id,
            status,
            payment_method: self.payment_method,
            payment_status: self.payment_status,
            since: self.since,
            until: self.until,
        })
    }
}
