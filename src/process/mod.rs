// src/process/mod.rs
//! Row-classification parsers for the four POS export layouts.
//!
//! Every export follows the same loose shape: banner rows, then rows whose meaning
//! depends on the rows before them. Each parser owns its context and is fed one raw
//! row at a time, the way a streaming reader would hand them over.

pub mod category_profit;
pub mod item_profit;
pub mod monthly_sales;
pub mod raw_table;
pub mod records;
pub mod reshape;
pub mod sales_by_group;
pub mod utils;

use records::{
    CategoryProfitRecord, GroupSalesRecord, ItemProfitRecord, MergeConflict, MonthlySalesLong,
    MonthlySalesWide, ProfitMetrics,
};
use utils::{parse_number, pad_row};

/// First-cell prefix that marks a branch header in the theoretical-profit reports.
pub const BRANCH_PREFIX: &str = "Stories";

/// Fixed width of the theoretical-profit layouts.
pub const PROFIT_ROW_WIDTH: usize = 10;

/// A stateful parser fed one raw row at a time.
pub trait ReportParser {
    type Output;

    fn feed_row(&mut self, row: &[String]);

    fn finish(self) -> Self::Output;
}

/// Feed every row through `parser` and collect its output.
pub fn parse_rows<P: ReportParser>(mut parser: P, rows: &[Vec<String>]) -> P::Output {
    for row in rows {
        parser.feed_row(row);
    }
    parser.finish()
}

/// Every clean dataset produced from one set of reports.
#[derive(Debug, Clone, Default)]
pub struct CleanDatasets {
    pub items: Vec<ItemProfitRecord>,
    pub groups: Vec<GroupSalesRecord>,
    pub categories: Vec<CategoryProfitRecord>,
    pub monthly_wide: Vec<MonthlySalesWide>,
    pub monthly_long: Vec<MonthlySalesLong>,
    pub merge_conflicts: Vec<MergeConflict>,
}

/// Title, footer, date-banner and file-name-echo rows carry no data.
///
/// `titles` are exact first-cell matches specific to one layout.
pub fn is_banner_row(row: &[String], titles: &[&str]) -> bool {
    let first = row.first().map(String::as_str).unwrap_or("");
    if titles.contains(&first) || utils::is_date_token(first) || first.starts_with("REP_S_") {
        return true;
    }
    if row
        .get(1)
        .is_some_and(|cell| cell.to_lowercase().contains("copyright"))
    {
        return true;
    }
    row.join(",").to_lowercase().contains("omegapos.com")
}

/// An isolated `Stories <name>` cell opens a new branch.
pub fn is_branch_marker(row: &[String]) -> bool {
    let first = row.first().map(String::as_str).unwrap_or("");
    first.starts_with(BRANCH_PREFIX)
        && first != BRANCH_PREFIX
        && row.iter().skip(1).all(|cell| cell.is_empty())
}

/// Extract the positional metrics of a theoretical-profit row.
pub fn profit_metrics(row: &[String]) -> ProfitMetrics {
    let row = pad_row(row, PROFIT_ROW_WIDTH);
    ProfitMetrics {
        qty: parse_number(&row[1]),
        total_price: parse_number(&row[2]),
        total_cost: parse_number(&row[4]),
        total_cost_pct: parse_number(&row[5]),
        total_profit: parse_number(&row[6]),
        total_profit_pct: parse_number(&row[8]),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    /// Build raw rows from comma-separated literals.
    pub fn rows(lines: &[&str]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|line| line.split(',').map(|c| c.trim().to_string()).collect())
            .collect()
    }

    pub fn init_test_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::rows;
    use super::*;

    #[test]
    fn banner_rows_are_detected() {
        let titles = ["Stories", "Theoretical Profit By Item"];
        let banners = rows(&[
            "Stories,,",
            "Theoretical Profit By Item,,",
            "22-Jan-2026,,",
            "REP_S_00014_SMRY,,",
            "x,Copyright 2026,",
            "page 1,,www.omegapos.com",
        ]);
        for row in &banners {
            assert!(is_banner_row(row, &titles), "{row:?}");
        }
        assert!(!is_banner_row(&rows(&["Latte,1,2"])[0], &titles));
    }

    #[test]
    fn branch_markers() {
        assert!(is_branch_marker(&rows(&["Stories Ashrafieh,,,"])[0]));
        assert!(!is_branch_marker(&rows(&["Stories,,,"])[0]));
        assert!(!is_branch_marker(&rows(&["Stories Ashrafieh,1,,"])[0]));
        assert!(!is_branch_marker(&rows(&["HOT DRINKS,,,"])[0]));
    }

    #[test]
    fn metrics_read_fixed_offsets() {
        let row = rows(&["Latte,3,4.5,,2.0,44.4,2.5,,55.6,"]);
        let m = profit_metrics(&row[0]);
        assert_eq!(m.qty, Some(3.0));
        assert_eq!(m.total_price, Some(4.5));
        assert_eq!(m.total_cost, Some(2.0));
        assert_eq!(m.total_cost_pct, Some(44.4));
        assert_eq!(m.total_profit, Some(2.5));
        assert_eq!(m.total_profit_pct, Some(55.6));

        let short = rows(&["Latte,3"]);
        let m = profit_metrics(&short[0]);
        assert_eq!(m.qty, Some(3.0));
        assert!(m.total_profit.is_none());
        assert!(m.has_any());
        assert!(!profit_metrics(&rows(&["HOT DRINKS"])[0]).has_any());
    }
}
