//! Theoretical profit by category (report 00673): a flat branch → category listing.

use tracing::debug;

use super::records::{CategoryProfitRecord, RowType};
use super::utils::{has_content, pad_row, starts_with_ci};
use super::{is_banner_row, is_branch_marker, profit_metrics, ReportParser, PROFIT_ROW_WIDTH};

const TITLES: &[&str] = &["Stories", "Theoretical Profit By Category", "Category"];

/// Category written on branch total rows.
pub const BRANCH_TOTAL_LABEL: &str = "Total By Branch";

pub struct CategoryProfitParser {
    source_file: String,
    branch: Option<String>,
    records: Vec<CategoryProfitRecord>,
}

impl CategoryProfitParser {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            branch: None,
            records: Vec::new(),
        }
    }
}

impl ReportParser for CategoryProfitParser {
    type Output = Vec<CategoryProfitRecord>;

    fn feed_row(&mut self, raw: &[String]) {
        let row = pad_row(raw, PROFIT_ROW_WIDTH);
        if !has_content(&row) || is_banner_row(&row, TITLES) {
            return;
        }
        let label = row[0].as_str();

        if is_branch_marker(&row) {
            debug!(branch = label, "branch header");
            self.branch = Some(label.to_string());
            return;
        }

        let metrics = profit_metrics(&row);
        if !metrics.has_any() {
            return;
        }

        let (row_type, category) = if starts_with_ci(label, "total by branch") {
            (RowType::BranchTotal, BRANCH_TOTAL_LABEL)
        } else {
            (RowType::Category, label)
        };
        self.records.push(CategoryProfitRecord::new(
            &self.source_file,
            row_type,
            self.branch.clone(),
            Some(category.to_string()),
            metrics,
        ));
    }

    fn finish(self) -> Vec<CategoryProfitRecord> {
        debug!(records = self.records.len(), "category profit report parsed");
        self.records
    }
}
