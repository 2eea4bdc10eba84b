use std::collections::HashMap;

use tracing::warn;

use super::records::{
    MergeConflict, MonthlySalesLong, MonthlySalesWide, PeriodType, RowType, SalesMetric,
};

/// Two contributions closer than this are the same value.
pub const MERGE_TOLERANCE: f64 = 0.01;

/// Identity of one logical wide observation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeKey {
    pub year: i32,
    pub branch: String,
    pub row_type: RowType,
}

impl MergeKey {
    fn of(row: &MonthlySalesWide) -> Self {
        Self {
            year: row.year,
            branch: row.branch.clone(),
            row_type: row.row_type,
        }
    }
}

/// Fold partial rows sharing a [`MergeKey`] into one row, field by field.
///
/// The first non-null value of a field is kept. A later value that differs by more
/// than [`MERGE_TOLERANCE`] is reported as a conflict and never overwrites it.
/// Returned rows are sorted by (year, row_type, lower-cased branch).
pub fn merge_partials(
    partials: Vec<MonthlySalesWide>,
) -> (Vec<MonthlySalesWide>, Vec<MergeConflict>) {
    let mut merged: Vec<MonthlySalesWide> = Vec::new();
    let mut index: HashMap<MergeKey, usize> = HashMap::new();
    let mut conflicts = Vec::new();

    for partial in partials {
        let key = MergeKey::of(&partial);
        let slot = *index.entry(key).or_insert_with(|| {
            merged.push(MonthlySalesWide::empty(
                &partial.source_file,
                partial.row_type,
                partial.year,
                &partial.branch,
            ));
            merged.len() - 1
        });
        let target = &mut merged[slot];

        for metric in SalesMetric::ALL {
            let Some(new_value) = partial.get(metric) else {
                continue;
            };
            match target.get(metric) {
                None => target.set(metric, Some(new_value)),
                Some(current) if (current - new_value).abs() > MERGE_TOLERANCE => {
                    warn!(
                        year = partial.year,
                        branch = %partial.branch,
                        metric = metric.as_str(),
                        first = current,
                        conflicting = new_value,
                        "merge conflict"
                    );
                    conflicts.push(MergeConflict {
                        year: partial.year,
                        branch: partial.branch.clone(),
                        metric,
                        first_value: current,
                        conflicting_value: new_value,
                    });
                }
                Some(_) => {}
            }
        }
    }

    merged.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| a.row_type.as_str().cmp(b.row_type.as_str()))
            .then_with(|| a.branch.to_lowercase().cmp(&b.branch.to_lowercase()))
    });

    (merged, conflicts)
}

/// Explode wide rows into one row per non-null metric, keeping wide order.
pub fn to_long(wide: &[MonthlySalesWide]) -> Vec<MonthlySalesLong> {
    wide.iter()
        .flat_map(|row| {
            SalesMetric::ALL.iter().filter_map(move |&metric| {
                row.get(metric).map(|sales_amount| MonthlySalesLong {
                    source_file: row.source_file.clone(),
                    row_type: row.row_type,
                    year: row.year,
                    branch: row.branch.clone(),
                    period: metric,
                    period_type: if metric.is_month() {
                        PeriodType::Month
                    } else {
                        PeriodType::YearTotal
                    },
                    month_number: metric.month_number(),
                    sales_amount,
                })
            })
        })
        .collect()
}
