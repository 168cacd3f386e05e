use std::fmt::Debug;

use chrono::{NaiveDate, Utc};
use log::*;

use crate::{
    helpers::{chart_points, report_window},
    shop_api::{
        errors::ShopError,
        report_objects::{ChartInterval, ChartPoint, ReportFilter, ReportWindow, SalesReport, TopSellers},
        wallet_objects::page_count,
    },
    traits::SalesReporting,
};

/// Orders per page in the sales report
pub const REPORT_PAGE_SIZE: i64 = 7;
/// Length of the best seller lists
pub const TOP_SELLER_COUNT: i64 = 10;

/// The admin sales dashboard.
pub struct ReportsApi<B> {
    db: B,
}

impl<B: Debug> Debug for ReportsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReportsApi ({:?})", self.db)
    }
}

impl<B> ReportsApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> ReportsApi<B>
where B: SalesReporting
{
    /// Sales report for one of the preset periods, optionally narrowed by custom dates. The end date is inclusive.
    pub async fn sales_report(
        &self,
        filter: ReportFilter,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        page: i64,
    ) -> Result<SalesReport, ShopError> {
        let window = report_window(filter, start_date, end_date, Utc::now())?;
        self.sales_report_for(window, page).await
    }

    /// Totals over the delivered orders placed in `window`, with one page of the orders themselves.
    pub async fn sales_report_for(&self, window: ReportWindow, page: i64) -> Result<SalesReport, ShopError> {
        if window.is_empty() {
            return Err(ShopError::Validation("The end of the report period must be after its start".into()));
        }
        let page = page.max(1);
        let totals = self.db.fetch_sales_totals(window).await?;
        let orders = self.db.fetch_order_sales(window, Some((page, REPORT_PAGE_SIZE))).await?;
        debug!("🔄️📊️ Sales report for {window}: {} orders, {} in sales", totals.total_orders, totals.total_sales);
        Ok(SalesReport {
            since: window.since,
            until: window.until,
            totals,
            orders,
            page,
            total_pages: page_count(totals.total_orders, REPORT_PAGE_SIZE),
        })
    }

    /// Sales of every delivered order, bucketed by week, month or year.
    pub async fn sales_chart(&self, interval: ChartInterval) -> Result<Vec<ChartPoint>, ShopError> {
        let sales = self.db.fetch_order_sales(ReportWindow::all(), None).await?;
        Ok(chart_points(&sales, interval))
    }

    pub async fn top_sellers(&self) -> Result<TopSellers, ShopError> {
        let products = self.db.fetch_top_products(TOP_SELLER_COUNT).await?;
        let categories = self.db.fetch_top_categories(TOP_SELLER_COUNT).await?;
        Ok(TopSellers { products, categories })
    }
}
