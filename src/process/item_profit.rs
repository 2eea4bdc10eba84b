//! Theoretical profit by item (report 00014).
//!
//! Hierarchy: branch → department → category → division → item. Only the branch is
//! self-describing; every other level is a bare label row whose depth is inferred
//! from which context slot is still empty.

use tracing::{debug, trace};

use super::records::{ItemProfitRecord, ProfitMetrics, RowType};
use super::utils::{has_content, pad_row, starts_with_ci};
use super::{is_banner_row, is_branch_marker, profit_metrics, ReportParser, PROFIT_ROW_WIDTH};

const TITLES: &[&str] = &["Stories", "Theoretical Profit By Item", "Product Desc"];

/// Context in force for one row. Replaced wholesale on every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemContext {
    pub branch: Option<String>,
    pub department: Option<String>,
    pub category: Option<String>,
    pub division: Option<String>,
}

impl ItemContext {
    /// A new branch starts with an empty hierarchy below it.
    pub fn for_branch(branch: &str) -> Self {
        Self {
            branch: Some(branch.to_string()),
            ..Self::default()
        }
    }

    /// Place a label in the first unset slot: department, then category, then division.
    /// With all three set the division is replaced.
    pub fn with_label(&self, label: &str) -> Self {
        let mut next = self.clone();
        let label = Some(label.to_string());
        if next.department.is_none() {
            next.department = label;
        } else if next.category.is_none() {
            next.category = label;
        } else {
            next.division = label;
        }
        next
    }

    pub fn without_division(&self) -> Self {
        Self {
            division: None,
            ..self.clone()
        }
    }

    pub fn without_category(&self) -> Self {
        Self {
            category: None,
            division: None,
            ..self.clone()
        }
    }

    pub fn without_department(&self) -> Self {
        Self {
            branch: self.branch.clone(),
            ..Self::default()
        }
    }
}

/// Subtotal kinds in the order they are tested against the first cell.
const SUBTOTALS: [(&str, RowType); 4] = [
    ("total by division", RowType::DivisionTotal),
    ("total by category", RowType::CategoryTotal),
    ("total by department", RowType::DepartmentTotal),
    ("total by branch", RowType::BranchTotal),
];

pub struct ItemProfitParser {
    source_file: String,
    context: ItemContext,
    records: Vec<ItemProfitRecord>,
}

impl ItemProfitParser {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            context: ItemContext::default(),
            records: Vec::new(),
        }
    }

    pub fn context(&self) -> &ItemContext {
        &self.context
    }

    fn push(&mut self, row_type: RowType, ctx: &ItemContext, label: &str, m: ProfitMetrics) {
        self.records.push(ItemProfitRecord {
            source_file: self.source_file.clone(),
            row_type,
            branch: ctx.branch.clone(),
            department: ctx.department.clone(),
            category: ctx.category.clone(),
            division: ctx.division.clone(),
            product_desc: Some(label.to_string()),
            qty: m.qty,
            total_price: m.total_price,
            total_cost: m.total_cost,
            total_cost_pct: m.total_cost_pct,
            total_profit: m.total_profit,
            total_profit_pct: m.total_profit_pct,
        });
    }

    /// Emit a subtotal record and pop the matching context level.
    fn subtotal(&mut self, kind: RowType, label: &str, m: ProfitMetrics) {
        let (on_record, next) = match kind {
            RowType::DivisionTotal => (self.context.clone(), self.context.without_division()),
            RowType::CategoryTotal => (
                self.context.without_division(),
                self.context.without_category(),
            ),
            RowType::DepartmentTotal => (
                self.context.without_category(),
                self.context.without_department(),
            ),
            _ => (
                self.context.without_department(),
                self.context.without_department(),
            ),
        };
        self.push(kind, &on_record, label, m);
        trace!(kind = kind.as_str(), ?next, "context popped");
        self.context = next;
    }
}

impl ReportParser for ItemProfitParser {
    type Output = Vec<ItemProfitRecord>;

    fn feed_row(&mut self, raw: &[String]) {
        let row = pad_row(raw, PROFIT_ROW_WIDTH);
        if !has_content(&row) || is_banner_row(&row, TITLES) {
            return;
        }
        let label = row[0].as_str();

        if is_branch_marker(&row) {
            debug!(branch = label, "branch header");
            self.context = ItemContext::for_branch(label);
            return;
        }

        let metrics = profit_metrics(&row);

        if let Some((_, kind)) = SUBTOTALS
            .iter()
            .find(|(prefix, _)| starts_with_ci(label, prefix))
        {
            self.subtotal(*kind, label, metrics);
            return;
        }

        if metrics.has_any() {
            let ctx = self.context.clone();
            self.push(RowType::Item, &ctx, label, metrics);
            return;
        }

        self.context = self.context.with_label(label);
    }

    fn finish(self) -> Vec<ItemProfitRecord> {
        debug!(records = self.records.len(), "item profit report parsed");
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::parse_rows;
    use crate::process::test_support::{init_test_logging, rows};

    const SAMPLE: &[&str] = &[
        "Stories,,,,,,,,,",
        "Theoretical Profit By Item,,,,,,,,,",
        "22-Jan-2026,,,,,,,,,",
        "Product Desc,Qty,Total Price,,Total Cost,Cost %,Total Profit,,Profit %,",
        "Stories Hamra,,,,,,,,,",
        "BEVERAGES,,,,,,,,,",
        "HOT DRINKS,,,,,,,,,",
        "COFFEE,,,,,,,,,",
        "Latte,10,1000.00,,300,30,700,,70,",
        "Espresso,5,250,,50,20,200,,80,",
        "Total By Division: COFFEE,15,1250,,350,28,900,,72,",
        "TEA,,,,,,,,,",
        "Green Tea,2,40,,10,25,30,,75,",
        "Total By Category: HOT DRINKS,17,1290,,360,27.9,930,,72.1,",
        "Total By Department: BEVERAGES,17,1290,,360,27.9,930,,72.1,",
        "Total By Branch: Stories Hamra,17,1290,,360,27.9,930,,72.1,",
        "REP_S_00014_SMRY,Copyright 2026 omegapos.com,,,,,,,,",
    ];

    fn parse(lines: &[&str]) -> Vec<ItemProfitRecord> {
        let raw = rows(lines);
        parse_rows(ItemProfitParser::new("rep_s_00014_SMRY.csv"), &raw)
    }

    #[test]
    fn hierarchy_is_threaded_through_items() {
        init_test_logging();
        let records = parse(SAMPLE);
        let types: Vec<_> = records.iter().map(|r| r.row_type).collect();
        assert_eq!(
            types,
            vec![
                RowType::Item,
                RowType::Item,
                RowType::DivisionTotal,
                RowType::Item,
                RowType::CategoryTotal,
                RowType::DepartmentTotal,
                RowType::BranchTotal,
            ]
        );

        let latte = &records[0];
        assert_eq!(latte.branch.as_deref(), Some("Stories Hamra"));
        assert_eq!(latte.department.as_deref(), Some("BEVERAGES"));
        assert_eq!(latte.category.as_deref(), Some("HOT DRINKS"));
        assert_eq!(latte.division.as_deref(), Some("COFFEE"));
        assert_eq!(latte.total_price, Some(1000.0));
        assert_eq!(latte.total_profit_pct, Some(70.0));

        let division_total = &records[2];
        assert_eq!(division_total.division.as_deref(), Some("COFFEE"));

        let green_tea = &records[3];
        assert_eq!(green_tea.category.as_deref(), Some("HOT DRINKS"));
        assert_eq!(green_tea.division.as_deref(), Some("TEA"));

        let category_total = &records[4];
        assert_eq!(category_total.category.as_deref(), Some("HOT DRINKS"));
        assert!(category_total.division.is_none());

        let department_total = &records[5];
        assert_eq!(department_total.department.as_deref(), Some("BEVERAGES"));
        assert!(department_total.category.is_none());

        let branch_total = &records[6];
        assert_eq!(branch_total.branch.as_deref(), Some("Stories Hamra"));
        assert!(branch_total.department.is_none());
        assert_eq!(branch_total.source_file, "rep_s_00014_SMRY.csv");
    }

    #[test]
    fn first_unset_slot_wins() {
        let ctx = ItemContext::for_branch("Stories A")
            .with_label("X")
            .with_label("Y")
            .with_label("Z");
        assert_eq!(ctx.department.as_deref(), Some("X"));
        assert_eq!(ctx.category.as_deref(), Some("Y"));
        assert_eq!(ctx.division.as_deref(), Some("Z"));

        let replaced = ctx.with_label("W");
        assert_eq!(replaced.division.as_deref(), Some("W"));
        assert_eq!(replaced.category.as_deref(), Some("Y"));

        // A category-looking label after a category pop lands in category again.
        let popped = replaced.without_category().with_label("FOOD");
        assert_eq!(popped.department.as_deref(), Some("X"));
        assert_eq!(popped.category.as_deref(), Some("FOOD"));
    }

    #[test]
    fn new_branch_resets_hierarchy() {
        let records = parse(&[
            "Stories A,,,,,,,,,",
            "DEPT,,,,,,,,,",
            "CAT,,,,,,,,,",
            "Stories B,,,,,,,,,",
            "NEWDEPT,,,,,,,,,",
            "Item,1,2,,1,50,1,,50,",
        ]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].branch.as_deref(), Some("Stories B"));
        assert_eq!(records[0].department.as_deref(), Some("NEWDEPT"));
        assert!(records[0].category.is_none());
    }

    #[test]
    fn short_rows_are_padded() {
        let records = parse(&["Stories A", "DEPT", "Cookie,4,8"]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].qty, Some(4.0));
        assert_eq!(records[0].total_price, Some(8.0));
        assert!(records[0].total_profit.is_none());
    }

    #[test]
    fn subtotal_without_numbers_still_pops_context() {
        let mut parser = ItemProfitParser::new("f.csv");
        for row in rows(&["Stories A", "DEPT", "CAT", "DIV", "total by category"]) {
            parser.feed_row(&row);
        }
        assert_eq!(parser.context().department.as_deref(), Some("DEPT"));
        assert!(parser.context().category.is_none());
        assert!(parser.context().division.is_none());
        let records = parser.finish();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].row_type, RowType::CategoryTotal);
    }
}
