use crate::shop_api::{
    errors::ShopError,
    report_objects::{OrderSale, ReportWindow, SalesTotals, TopSeller},
};

/// Read-only sales figures for the admin dashboard.
///
/// Sales are counted over delivered orders only. Inside those, cancelled and returned lines are left out, so a
/// partially returned order contributes what the customer kept.
#[allow(async_fn_in_trait)]
pub trait SalesReporting {
    async fn fetch_sales_totals(&self, window: ReportWindow) -> Result<SalesTotals, ShopError>;

    /// Per-order sales, newest first. `page` is `(page, page_size)` with 1-based pages; `None` fetches every order.
    async fn fetch_order_sales(
        &self,
        window: ReportWindow,
        page: Option<(i64, i64)>,
    ) -> Result<Vec<OrderSale>, ShopError>;

    /// Best selling products by units, most first.
    async fn fetch_top_products(&self, limit: i64) -> Result<Vec<TopSeller>, ShopError>;

    async fn fetch_top_categories(&self, limit: i64) -> Result<Vec<TopSeller>, ShopError>;
}
