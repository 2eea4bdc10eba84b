//! Comparative monthly sales (report 00134).
//!
//! The export prints one column block per year side by side and repeats its header
//! row for each block, so column meaning is re-learned whenever a header row shows
//! up. A numeric first cell switches the current year.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::records::{MergeConflict, MonthlySalesLong, MonthlySalesWide, RowType, SalesMetric};
use super::reshape::{merge_partials, to_long};
use super::utils::{has_content, normalize, parse_number};
use super::{is_banner_row, ReportParser};

const TITLES: &[&str] = &["Stories", "Comparative Monthly Sales"];

/// Branch cell the export prints on its year-list banner.
const YEAR_LIST_PLACEHOLDER: &str = "Year: 2026,2025";

/// A header row must name at least this many metric columns to replace the map.
const MIN_HEADER_METRICS: usize = 3;

/// Column index → metric, as learned from the latest header row.
pub type MetricColumnMap = BTreeMap<usize, SalesMetric>;

/// Everything report 00134 yields.
#[derive(Debug, Clone, Default)]
pub struct MonthlySalesOutput {
    pub wide: Vec<MonthlySalesWide>,
    pub long: Vec<MonthlySalesLong>,
    pub conflicts: Vec<MergeConflict>,
}

pub struct MonthlySalesParser {
    source_file: String,
    year: Option<i32>,
    columns: MetricColumnMap,
    partials: Vec<MonthlySalesWide>,
}

impl MonthlySalesParser {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            year: None,
            columns: MetricColumnMap::new(),
            partials: Vec::new(),
        }
    }

    /// Contributions extracted so far, before merging.
    pub fn partials(&self) -> &[MonthlySalesWide] {
        &self.partials
    }
}

/// Map every cell that names a metric. Callers decide whether the row is a header.
pub fn header_columns(row: &[String]) -> MetricColumnMap {
    row.iter()
        .enumerate()
        .filter_map(|(idx, cell)| SalesMetric::from_header(cell).map(|m| (idx, m)))
        .collect()
}

impl ReportParser for MonthlySalesParser {
    type Output = MonthlySalesOutput;

    fn feed_row(&mut self, raw: &[String]) {
        let row: Vec<String> = raw.iter().map(|c| normalize(c)).collect();
        if !has_content(&row) || is_banner_row(&row, TITLES) {
            return;
        }

        let candidate = header_columns(&row);
        if candidate.len() >= MIN_HEADER_METRICS {
            trace!(columns = candidate.len(), "metric header row");
            self.columns = candidate;
            return;
        }

        let first = row.first().map(String::as_str).unwrap_or("");
        if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()) {
            match first.parse::<i32>() {
                Ok(year) => self.year = Some(year),
                Err(e) => debug!(cell = first, error = %e, "unusable year cell"),
            }
        }

        let Some(year) = self.year else { return };
        if self.columns.is_empty() {
            return;
        }
        let branch = row.get(1).map(String::as_str).unwrap_or("");
        if branch.is_empty() || branch == YEAR_LIST_PLACEHOLDER {
            return;
        }

        let row_type = if branch.eq_ignore_ascii_case("total") {
            RowType::GrandTotal
        } else {
            RowType::Branch
        };
        let mut partial = MonthlySalesWide::empty(&self.source_file, row_type, year, branch);
        let mut any_value = false;
        for (&idx, &metric) in &self.columns {
            let value = row.get(idx).and_then(|cell| parse_number(cell));
            any_value |= value.is_some();
            partial.set(metric, value);
        }
        if any_value {
            self.partials.push(partial);
        }
    }

    fn finish(self) -> MonthlySalesOutput {
        let (wide, conflicts) = merge_partials(self.partials);
        let long = to_long(&wide);
        debug!(
            wide = wide.len(),
            long = long.len(),
            conflicts = conflicts.len(),
            "comparative monthly sales parsed"
        );
        MonthlySalesOutput {
            wide,
            long,
            conflicts,
        }
    }
}
