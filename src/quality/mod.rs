//! Cross-checks between subtotal rows a report declares and the detail rows it also
//! prints. Mismatches are findings to report, never errors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::numeric::round2;
use crate::process::records::{CategoryProfitRecord, MonthlySalesWide, RowType, SalesMetric};

/// A difference must exceed this, in report units, to be flagged.
pub const RECONCILIATION_TOLERANCE: f64 = 1.0;

/// Category profit metrics compared against the branch total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMetric {
    Qty,
    TotalPrice,
    TotalCost,
    TotalProfit,
}

impl CategoryMetric {
    pub const ALL: [CategoryMetric; 4] = [
        CategoryMetric::Qty,
        CategoryMetric::TotalPrice,
        CategoryMetric::TotalCost,
        CategoryMetric::TotalProfit,
    ];

    fn read(&self, record: &CategoryProfitRecord) -> Option<f64> {
        match self {
            CategoryMetric::Qty => record.qty,
            CategoryMetric::TotalPrice => record.total_price,
            CategoryMetric::TotalCost => record.total_cost,
            CategoryMetric::TotalProfit => record.total_profit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchTotalMismatch {
    pub branch: String,
    pub metric: CategoryMetric,
    pub branch_total: f64,
    pub category_sum: f64,
    /// `branch_total - category_sum`.
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearTotalMismatch {
    pub year: i32,
    pub branch: String,
    pub total_by_year: f64,
    pub sum_of_months: f64,
    /// `total_by_year - sum_of_months`.
    pub difference: f64,
}

fn exceeds_tolerance(difference: f64) -> bool {
    difference.abs() > RECONCILIATION_TOLERANCE
}

#[derive(Default)]
struct CategorySums {
    count: usize,
    sums: [f64; 4],
}

/// Compare each branch's `branch_total` row with the sum of its `category` rows.
///
/// Branches without category rows are skipped, as are null total fields. A branch
/// with several total rows is checked against the last one.
pub fn check_branch_totals(records: &[CategoryProfitRecord]) -> Vec<BranchTotalMismatch> {
    let mut details: HashMap<String, CategorySums> = HashMap::new();
    let mut totals: HashMap<String, &CategoryProfitRecord> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for record in records {
        let branch = record.branch.as_deref().unwrap_or("").trim();
        if branch.is_empty() {
            continue;
        }
        match record.row_type {
            RowType::Category => {
                let entry = details.entry(branch.to_string()).or_default();
                entry.count += 1;
                for (slot, metric) in CategoryMetric::ALL.iter().enumerate() {
                    if let Some(value) = metric.read(record) {
                        entry.sums[slot] += value;
                    }
                }
            }
            RowType::BranchTotal => {
                if totals.insert(branch.to_string(), record).is_none() {
                    order.push(branch.to_string());
                }
            }
            _ => {}
        }
    }

    let mut mismatches = Vec::new();
    for branch in order {
        let Some(detail) = details.get(&branch).filter(|d| d.count > 0) else {
            continue;
        };
        let total = totals[&branch];
        for (slot, metric) in CategoryMetric::ALL.iter().enumerate() {
            let Some(total_value) = metric.read(total) else {
                continue;
            };
            let summed = detail.sums[slot];
            let difference = total_value - summed;
            if exceeds_tolerance(difference) {
                warn!(branch = %branch, metric = ?metric, difference, "branch total mismatch");
                mismatches.push(BranchTotalMismatch {
                    branch: branch.clone(),
                    metric: *metric,
                    branch_total: total_value,
                    category_sum: round2(summed),
                    difference: round2(difference),
                });
            }
        }
    }

    info!(mismatches = mismatches.len(), "category report reconciled");
    mismatches
}

/// Compare each branch row's `total_by_year` with the sum of the months it reports.
///
/// Missing months are absent, not zero. Rows without any month are skipped.
pub fn check_year_totals(rows: &[MonthlySalesWide]) -> Vec<YearTotalMismatch> {
    let mut mismatches = Vec::new();

    for row in rows.iter().filter(|r| r.row_type == RowType::Branch) {
        let Some(total) = row.total_by_year else {
            continue;
        };
        let months: Vec<f64> = SalesMetric::ALL
            .iter()
            .filter(|m| m.is_month())
            .filter_map(|m| row.get(*m))
            .collect();
        if months.is_empty() {
            continue;
        }
        let sum: f64 = months.iter().sum();
        let difference = total - sum;
        if exceeds_tolerance(difference) {
            warn!(year = row.year, branch = %row.branch, difference, "total by year mismatch");
            mismatches.push(YearTotalMismatch {
                year: row.year,
                branch: row.branch.clone(),
                total_by_year: total,
                sum_of_months: round2(sum),
                difference: round2(difference),
            });
        }
    }

    info!(mismatches = mismatches.len(), "monthly sales reconciled");
    mismatches
}
