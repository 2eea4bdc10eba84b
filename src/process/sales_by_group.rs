//! Sales by items by group (report 00191).
//!
//! Hierarchy: branch → division → group → item, each level introduced by a labelled
//! header (`Branch:`, `Division:`, `Group:`).

use tracing::debug;

use super::records::{GroupSalesRecord, RowType};
use super::utils::{has_content, inline_label, non_empty, pad_row, parse_number, starts_with_ci};
use super::{is_banner_row, ReportParser};

const TITLES: &[&str] = &["Stories", "Sales by Items By Group", "Description"];
const ROW_WIDTH: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupContext {
    pub branch: Option<String>,
    pub division: Option<String>,
    pub group: Option<String>,
}

impl GroupContext {
    pub fn for_branch(branch: Option<String>) -> Self {
        Self {
            branch,
            ..Self::default()
        }
    }

    pub fn with_division(&self, division: Option<String>) -> Self {
        Self {
            branch: self.branch.clone(),
            division,
            group: None,
        }
    }

    pub fn with_group(&self, group: Option<String>) -> Self {
        Self {
            group,
            ..self.clone()
        }
    }
}

pub struct SalesByGroupParser {
    source_file: String,
    context: GroupContext,
    records: Vec<GroupSalesRecord>,
}

impl SalesByGroupParser {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            context: GroupContext::default(),
            records: Vec::new(),
        }
    }

    fn record(
        &self,
        row_type: RowType,
        ctx: &GroupContext,
        description: &str,
        barcode: Option<String>,
        qty: Option<f64>,
        total_amount: Option<f64>,
    ) -> GroupSalesRecord {
        GroupSalesRecord {
            source_file: self.source_file.clone(),
            row_type,
            branch: ctx.branch.clone(),
            division: ctx.division.clone(),
            group: ctx.group.clone(),
            description: Some(description.to_string()),
            barcode,
            qty,
            total_amount,
        }
    }
}

impl ReportParser for SalesByGroupParser {
    type Output = Vec<GroupSalesRecord>;

    fn feed_row(&mut self, raw: &[String]) {
        let row = pad_row(raw, ROW_WIDTH);
        if !has_content(&row) || is_banner_row(&row, TITLES) {
            return;
        }
        let label = row[0].as_str();

        if label.starts_with("Branch:") {
            self.context = GroupContext::for_branch(inline_label(label));
            debug!(branch = ?self.context.branch, "branch header");
            return;
        }
        if label.starts_with("Division:") {
            self.context = self.context.with_division(inline_label(label));
            return;
        }
        if label.starts_with("Group:") {
            self.context = self.context.with_group(inline_label(label));
            return;
        }

        let qty = parse_number(&row[2]);
        let total_amount = parse_number(&row[3]);

        if starts_with_ci(label, "total by group:") {
            let group = inline_label(label).or_else(|| self.context.group.clone());
            let ctx = self.context.with_group(group);
            let record = self.record(RowType::GroupTotal, &ctx, label, None, qty, total_amount);
            self.records.push(record);
            return;
        }

        if starts_with_ci(label, "total by division:") {
            let division = inline_label(label).or_else(|| self.context.division.clone());
            let ctx = self.context.with_division(division);
            let record = self.record(RowType::DivisionTotal, &ctx, label, None, qty, total_amount);
            self.records.push(record);
            self.context = self.context.with_division(None);
            return;
        }

        if starts_with_ci(label, "total by branch:") {
            let branch = inline_label(label).or_else(|| self.context.branch.clone());
            let ctx = GroupContext::for_branch(branch);
            let record = self.record(RowType::BranchTotal, &ctx, label, None, qty, total_amount);
            self.records.push(record);
            self.context = ctx;
            return;
        }

        if qty.is_none() && total_amount.is_none() {
            return;
        }

        let ctx = self.context.clone();
        let record = self.record(RowType::Item, &ctx, label, non_empty(&row[1]), qty, total_amount);
        self.records.push(record);
    }

    fn finish(self) -> Vec<GroupSalesRecord> {
        debug!(records = self.records.len(), "sales by group report parsed");
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::parse_rows;
    use crate::process::test_support::rows;

    fn parse(lines: &[&str]) -> Vec<GroupSalesRecord> {
        parse_rows(SalesByGroupParser::new("rep_s_00191_SMRY-3.csv"), &rows(lines))
    }

    #[test]
    fn labelled_headers_set_context() {
        let records = parse(&[
            "Stories,,,,",
            "Sales by Items By Group,,,,",
            "Description,Barcode,Qty,Total Amount,",
            "Branch: Stories Hamra,,,,",
            "Division: BEVERAGES,,,,",
            "Group: HOT,,,,",
            "Latte,123,10,1000,",
            "Mocha,,2,250,",
            "Unsold,,,,",
            "Total By Group: HOT,,12,1250,",
            "Group: COLD,,,,",
            "Frappe,,1,80,",
            "Total By Division: BEVERAGES,,13,1330,",
            "Orphan,,1,5,",
            "Total By Branch: Stories Hamra,,14,1335,",
        ]);

        let types: Vec<_> = records.iter().map(|r| r.row_type).collect();
        assert_eq!(
            types,
            vec![
                RowType::Item,
                RowType::Item,
                RowType::GroupTotal,
                RowType::Item,
                RowType::DivisionTotal,
                RowType::Item,
                RowType::BranchTotal,
            ]
        );

        assert_eq!(records[0].barcode.as_deref(), Some("123"));
        assert_eq!(records[0].group.as_deref(), Some("HOT"));
        assert_eq!(records[0].division.as_deref(), Some("BEVERAGES"));
        assert_eq!(records[0].branch.as_deref(), Some("Stories Hamra"));
        assert!(records[1].barcode.is_none());

        assert_eq!(records[2].group.as_deref(), Some("HOT"));
        assert_eq!(records[2].total_amount, Some(1250.0));

        assert_eq!(records[3].group.as_deref(), Some("COLD"));

        assert_eq!(records[4].division.as_deref(), Some("BEVERAGES"));
        assert!(records[4].group.is_none());

        // Division total cleared the deeper context.
        assert!(records[5].division.is_none());
        assert!(records[5].group.is_none());
        assert_eq!(records[5].branch.as_deref(), Some("Stories Hamra"));

        assert_eq!(records[6].branch.as_deref(), Some("Stories Hamra"));
        assert_eq!(records[6].qty, Some(14.0));
    }

    #[test]
    fn inline_names_override_context() {
        let records = parse(&[
            "Branch: A,,,,",
            "Division: D1,,,,",
            "Group: G1,,,,",
            "Total By Group: Renamed,,1,2,",
            "Total by branch: B,,3,4,",
            "Item,,1,1,",
        ]);
        assert_eq!(records[0].group.as_deref(), Some("Renamed"));
        assert_eq!(records[1].branch.as_deref(), Some("B"));
        assert_eq!(records[2].branch.as_deref(), Some("B"));
    }

    #[test]
    fn totals_without_names_fall_back_to_context() {
        let records = parse(&["Branch: A,,,,", "Group: G1,,,,", "Total By Group:,,1,2,"]);
        assert_eq!(records[0].group.as_deref(), Some("G1"));
        assert_eq!(records[0].branch.as_deref(), Some("A"));
    }
}
