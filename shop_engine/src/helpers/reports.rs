//! Report periods and chart buckets for the sales dashboard. Times are UTC throughout.
use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use shop_common::Money;

use crate::shop_api::{
    errors::ShopError,
    report_objects::{ChartInterval, ChartPoint, OrderSale, ReportFilter, ReportWindow},
};

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

fn out_of_range(date: NaiveDate) -> ShopError {
    ShopError::Validation(format!("{date} is outside the supported date range"))
}

/// Works out the window a sales report covers.
///
/// The preset filter fixes the start of the window. A custom `start_date` overrides it, and a custom `end_date`
/// closes the window at the end of that day. Without an end date the window stays open.
pub fn report_window(
    filter: ReportFilter,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<ReportWindow, ShopError> {
    let today = now.date_naive();
    let preset = match filter {
        ReportFilter::Daily => Some(today),
        ReportFilter::Weekly => {
            let since_sunday = u64::from(today.weekday().num_days_from_sunday());
            Some(today.checked_sub_days(Days::new(since_sunday)).ok_or_else(|| out_of_range(today))?)
        },
        ReportFilter::Yearly => Some(NaiveDate::from_ymd_opt(today.year(), 1, 1).ok_or_else(|| out_of_range(today))?),
        ReportFilter::All => None,
    };
    let since = start_date.or(preset).map(midnight);
    let until = match end_date {
        Some(end) => Some(midnight(end.succ_opt().ok_or_else(|| out_of_range(end))?)),
        None => None,
    };
    let window = ReportWindow { since, until };
    if window.is_empty() {
        return Err(ShopError::Validation("The end of the report period must be after its start".into()));
    }
    Ok(window)
}

/// Week of the year with weeks starting on Sunday. Days before the first Sunday are in week 0.
fn sunday_week(date: NaiveDate) -> u32 {
    (date.ordinal0() + 7 - date.weekday().num_days_from_sunday()) / 7
}

/// Groups order sales into chart buckets, oldest bucket first. Empty buckets are left out.
pub fn chart_points(sales: &[OrderSale], interval: ChartInterval) -> Vec<ChartPoint> {
    let mut buckets = BTreeMap::<(i32, u32), (Money, i64)>::new();
    for sale in sales {
        let date = sale.created_at.date_naive();
        let key = match interval {
            ChartInterval::Weekly => (date.year(), sunday_week(date)),
            ChartInterval::Monthly => (date.year(), date.month()),
            ChartInterval::Yearly => (date.year(), 0),
        };
        let bucket = buckets.entry(key).or_insert((Money::ZERO, 0));
        bucket.0 += sale.sales;
        bucket.1 += 1;
    }
    buckets
        .into_iter()
        .map(|((year, n), (total_sales, total_orders))| {
            let period = match interval {
                ChartInterval::Weekly => format!("Week {n}, {year}"),
                ChartInterval::Monthly => format!("{n}/{year}"),
                ChartInterval::Yearly => year.to_string(),
            };
            ChartPoint { period, total_sales, total_orders }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::OrderId;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sale(id: i64, created_at: DateTime<Utc>, major: i64) -> OrderSale {
        OrderSale {
            order_id: OrderId(id),
            user_id: "alice".into(),
            created_at,
            units: 1,
            sales: Money::from_major(major),
            discount: Money::ZERO,
        }
    }

    #[test]
    fn preset_windows() {
        // A Wednesday afternoon
        let now = at(2024, 6, 12, 15);
        let daily = report_window(ReportFilter::Daily, None, None, now).unwrap();
        assert_eq!(daily.since, Some(midnight(date(2024, 6, 12))));
        assert_eq!(daily.until, None);
        let weekly = report_window(ReportFilter::Weekly, None, None, now).unwrap();
        assert_eq!(weekly.since, Some(midnight(date(2024, 6, 9))));
        let yearly = report_window(ReportFilter::Yearly, None, None, now).unwrap();
        assert_eq!(yearly.since, Some(midnight(date(2024, 1, 1))));
        assert_eq!(report_window(ReportFilter::All, None, None, now).unwrap(), ReportWindow::all());
        // On a Sunday the week starts today
        let sunday = report_window(ReportFilter::Weekly, None, None, at(2024, 6, 9, 8)).unwrap();
        assert_eq!(sunday.since, Some(midnight(date(2024, 6, 9))));
    }

    #[test]
    fn custom_dates_include_the_whole_end_day() {
        let now = at(2024, 6, 12, 15);
        let w = report_window(ReportFilter::Yearly, Some(date(2024, 6, 1)), Some(date(2024, 6, 5)), now).unwrap();
        assert_eq!(w.since, Some(midnight(date(2024, 6, 1))));
        assert_eq!(w.until, Some(midnight(date(2024, 6, 6))));
        let same_day = report_window(ReportFilter::All, Some(date(2024, 6, 5)), Some(date(2024, 6, 5)), now).unwrap();
        assert_eq!(same_day.until.unwrap() - same_day.since.unwrap(), chrono::Duration::days(1));
        let err = report_window(ReportFilter::All, Some(date(2024, 6, 5)), Some(date(2024, 6, 1)), now).unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[test]
    fn weeks_start_on_sunday() {
        assert_eq!(sunday_week(date(2024, 1, 1)), 0);
        assert_eq!(sunday_week(date(2024, 1, 6)), 0);
        assert_eq!(sunday_week(date(2024, 1, 7)), 1);
        assert_eq!(sunday_week(date(2023, 1, 1)), 1);
    }

    #[test]
    fn chart_buckets() {
        let sales = vec![
            sale(1, at(2024, 6, 10, 9), 300),
            sale(2, at(2024, 6, 12, 9), 200),
            sale(3, at(2024, 7, 2, 9), 100),
            sale(4, at(2023, 12, 30, 9), 50),
        ];
        let monthly = chart_points(&sales, ChartInterval::Monthly);
        let periods = monthly.iter().map(|p| p.period.as_str()).collect::<Vec<_>>();
        assert_eq!(periods, ["12/2023", "6/2024", "7/2024"]);
        assert_eq!(monthly[1].total_sales, Money::from_major(500));
        assert_eq!(monthly[1].total_orders, 2);

        let weekly = chart_points(&sales, ChartInterval::Weekly);
        assert_eq!(weekly[0].period, "Week 52, 2023");
        assert_eq!(weekly[1].period, "Week 23, 2024");
        assert_eq!(weekly[1].total_orders, 2);

        let yearly = chart_points(&sales, ChartInterval::Yearly);
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly[1].period, "2024");
        assert_eq!(yearly[1].total_sales, Money::from_major(600));
        assert!(chart_points(&[], ChartInterval::Yearly).is_empty());
    }
}
