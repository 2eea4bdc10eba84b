//! The cleaning pass: four raw exports in, five clean tables and a JSON summary out.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::{collections::BTreeMap, fs};
use tracing::info;

use crate::config::{clean_files, PipelineConfig, ReportKind};
use crate::process::{
    category_profit::CategoryProfitParser,
    item_profit::ItemProfitParser,
    monthly_sales::MonthlySalesParser,
    parse_rows,
    raw_table::{load_report, RawTable},
    records::{MergeConflict, Table},
    sales_by_group::SalesByGroupParser,
    CleanDatasets,
};
use crate::quality::{
    check_branch_totals, check_year_totals, BranchTotalMismatch, YearTotalMismatch,
};
use crate::tables::{write_json, write_records};

/// One raw table per supported report.
#[derive(Debug, Clone)]
pub struct RawReports {
    pub item_profit: RawTable,
    pub monthly_sales: RawTable,
    pub sales_by_group: RawTable,
    pub category_profit: RawTable,
}

impl RawReports {
    fn get(&self, kind: ReportKind) -> &RawTable {
        match kind {
            ReportKind::ItemProfit => &self.item_profit,
            ReportKind::MonthlySales => &self.monthly_sales,
            ReportKind::SalesByGroup => &self.sales_by_group,
            ReportKind::CategoryProfit => &self.category_profit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityChecks {
    pub rep_00673_branch_total_mismatches: Vec<BranchTotalMismatch>,
    pub rep_00134_total_by_year_mismatches: Vec<YearTotalMismatch>,
    pub rep_00134_merge_conflicts: Vec<MergeConflict>,
}

/// Contents of `cleaning_report.json`.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningReport {
    pub generated_at: String,
    pub input_files: BTreeMap<String, String>,
    pub output_files: BTreeMap<String, String>,
    pub row_counts: BTreeMap<String, usize>,
    pub row_type_counts: BTreeMap<String, BTreeMap<String, usize>>,
    pub quality_checks: QualityChecks,
}

/// Parse every raw report into its clean dataset. No I/O.
pub fn clean_reports(raw: &RawReports) -> CleanDatasets {
    let items = parse_rows(
        ItemProfitParser::new(raw.item_profit.source_file.as_str()),
        &raw.item_profit.rows,
    );
    let groups = parse_rows(
        SalesByGroupParser::new(raw.sales_by_group.source_file.as_str()),
        &raw.sales_by_group.rows,
    );
    let categories = parse_rows(
        CategoryProfitParser::new(raw.category_profit.source_file.as_str()),
        &raw.category_profit.rows,
    );
    let monthly = parse_rows(
        MonthlySalesParser::new(raw.monthly_sales.source_file.as_str()),
        &raw.monthly_sales.rows,
    );

    CleanDatasets {
        items,
        groups,
        categories,
        monthly_wide: monthly.wide,
        monthly_long: monthly.long,
        merge_conflicts: monthly.conflicts,
    }
}

fn count_row_types<T: Table>(rows: &[T]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        *counts.entry(row.row_type().as_str().to_string()).or_insert(0) += 1;
    }
    counts
}

/// Run the whole cleaning pass described by `config`.
#[tracing::instrument(level = "info", skip(config), fields(data_dir = %config.data_dir.display()))]
pub fn run_cleaning(config: &PipelineConfig) -> Result<CleaningReport> {
    let inputs = config.resolve_inputs()?;
    fs::create_dir_all(&config.cleaned_dir)
        .with_context(|| format!("creating {}", config.cleaned_dir.display()))?;

    let load = |kind: ReportKind| -> Result<RawTable> {
        let path = &inputs[&kind];
        info!(report = kind.key(), path = %path.display(), "loading report");
        load_report(path)
    };
    let raw = RawReports {
        item_profit: load(ReportKind::ItemProfit)?,
        monthly_sales: load(ReportKind::MonthlySales)?,
        sales_by_group: load(ReportKind::SalesByGroup)?,
        category_profit: load(ReportKind::CategoryProfit)?,
    };

    let clean = clean_reports(&raw);
    info!(
        items = clean.items.len(),
        groups = clean.groups.len(),
        categories = clean.categories.len(),
        monthly_wide = clean.monthly_wide.len(),
        monthly_long = clean.monthly_long.len(),
        "reports parsed"
    );

    let quality_checks = QualityChecks {
        rep_00673_branch_total_mismatches: check_branch_totals(&clean.categories),
        rep_00134_total_by_year_mismatches: check_year_totals(&clean.monthly_wide),
        rep_00134_merge_conflicts: clean.merge_conflicts.clone(),
    };

    let outputs = [
        ("rep_00014", config.clean_path(clean_files::ITEM_PROFIT)),
        ("rep_00191", config.clean_path(clean_files::SALES_BY_GROUP)),
        ("rep_00673", config.clean_path(clean_files::CATEGORY_PROFIT)),
        ("rep_00134_wide", config.clean_path(clean_files::MONTHLY_WIDE)),
        ("rep_00134_long", config.clean_path(clean_files::MONTHLY_LONG)),
    ];
    write_records(&outputs[0].1, &clean.items)?;
    write_records(&outputs[1].1, &clean.groups)?;
    write_records(&outputs[2].1, &clean.categories)?;
    write_records(&outputs[3].1, &clean.monthly_wide)?;
    write_records(&outputs[4].1, &clean.monthly_long)?;

    let mut row_counts = BTreeMap::new();
    for kind in ReportKind::ALL {
        row_counts.insert(format!("{}_raw_rows", kind.key()), raw.get(kind).rows.len());
    }
    row_counts.insert("rep_00014_clean_rows".to_string(), clean.items.len());
    row_counts.insert("rep_00191_clean_rows".to_string(), clean.groups.len());
    row_counts.insert("rep_00673_clean_rows".to_string(), clean.categories.len());
    row_counts.insert("rep_00134_wide_clean_rows".to_string(), clean.monthly_wide.len());
    row_counts.insert("rep_00134_long_clean_rows".to_string(), clean.monthly_long.len());

    let mut row_type_counts = BTreeMap::new();
    row_type_counts.insert("rep_00014".to_string(), count_row_types(&clean.items));
    row_type_counts.insert("rep_00191".to_string(), count_row_types(&clean.groups));
    row_type_counts.insert("rep_00673".to_string(), count_row_types(&clean.categories));
    row_type_counts.insert("rep_00134_wide".to_string(), count_row_types(&clean.monthly_wide));

    let report = CleaningReport {
        generated_at: Utc::now().to_rfc3339(),
        input_files: inputs
            .iter()
            .map(|(kind, path)| (kind.key().to_string(), path.display().to_string()))
            .collect(),
        output_files: outputs
            .iter()
            .map(|(key, path)| (key.to_string(), path.display().to_string()))
            .collect(),
        row_counts,
        row_type_counts,
        quality_checks,
    };

    let report_path = config.clean_path(clean_files::CLEANING_REPORT);
    write_json(&report_path, &report)?;
    info!(
        path = %report_path.display(),
        branch_total_mismatches = report.quality_checks.rep_00673_branch_total_mismatches.len(),
        year_total_mismatches = report.quality_checks.rep_00134_total_by_year_mismatches.len(),
        merge_conflicts = report.quality_checks.rep_00134_merge_conflicts.len(),
        "cleaning report written"
    );

    Ok(report)
}

/// Small but complete raw exports shared by the pipeline and analysis tests.
#[cfg(test)]
pub(crate) mod fixtures {
    use anyhow::Result;
    use std::{fs, path::Path};

    /// Write `lines` as a raw report file, one CSV record per line.
    pub fn write_fixture(dir: &Path, name: &str, lines: &[&str]) -> Result<()> {
        fs::write(dir.join(name), lines.join("\n") + "\n")?;
        Ok(())
    }

    /// Write all four reports under their usual export names.
    pub fn write_all(dir: &Path) -> Result<()> {
        write_fixture(dir, "rep_s_00014_SMRY.csv", ITEM_PROFIT)?;
        write_fixture(dir, "REP_S_00134_SMRY.csv", MONTHLY_SALES)?;
        write_fixture(dir, "rep_s_00191_SMRY-3.csv", SALES_BY_GROUP)?;
        write_fixture(dir, "rep_s_00673_SMRY.csv", CATEGORY_PROFIT)?;
        Ok(())
    }

    pub const ITEM_PROFIT: &[&str] = &[
        "Stories,,,,,,,,,",
        "Theoretical Profit By Item,,,,,,,,,",
        "22-Jan-2026,,,,,,,,,",
        "Product Desc,Qty,Total Price,,Total Cost,Cost %,Total Profit,,Profit %,",
        "Stories Hamra,,,,,,,,,",
        "BEVERAGES,,,,,,,,,",
        "HOT DRINKS,,,,,,,,,",
        "COFFEE,,,,,,,,,",
        "Latte,10,1000,,300,30,700,,70,",
        "Espresso,5,250,,50,20,200,,80,",
        "Mocha,1,10,,15,150,-5,,-50,",
        "Total By Division: COFFEE,16,1260,,365,29,895,,71,",
        "Total By Branch: Stories Hamra,16,1260,,365,29,895,,71,",
        "Stories Verdun,,,,,,,,,",
        "BEVERAGES,,,,,,,,,",
        "HOT DRINKS,,,,,,,,,",
        "COFFEE,,,,,,,,,",
        "Latte,4,400,,120,30,280,,70,",
        "REP_S_00014_SMRY,Copyright 2026 omegapos.com,,,,,,,,",
    ];

    pub const SALES_BY_GROUP: &[&str] = &[
        "Stories,,,,",
        "Sales by Items By Group,,,,",
        "Description,Barcode,Qty,Total Amount,",
        "Branch: Stories Hamra,,,,",
        "Division: BEVERAGES,,,,",
        "Group: HOT,,,,",
        "Latte,,10,1000,",
        "Total By Group: HOT,,10,1000,",
        "Group: COLD,,,,",
        "Frappe,,2,300,",
        "Total By Group: COLD,,2,300,",
        "Total By Branch: Stories Hamra,,12,1300,",
        "Branch: Stories Verdun,,,,",
        "Group: HOT,,,,",
        "Latte,,4,400,",
        "Total By Group: HOT,,4,400,",
    ];

    pub const CATEGORY_PROFIT: &[&str] = &[
        "Stories,,,,,,,,,",
        "Theoretical Profit By Category,,,,,,,,,",
        "Category,Qty,Total Price,,Total Cost,Cost %,Total Profit,,Profit %,",
        "Stories Hamra,,,,,,,,,",
        "BEVERAGES,16,1260,,365,29,895,,71,",
        "FOOD,3,90,,30,33,60,,67,",
        "Total By Branch:,19,1350,,395,29,955,,71,",
        "Stories Verdun,,,,,,,,,",
        "BEVERAGES,4,400,,120,30,280,,70,",
        "Total By Branch:,4,400,,120,30,270,,68,",
    ];

    pub const MONTHLY_SALES: &[&str] = &[
        "Stories,,,,,",
        "Comparative Monthly Sales,,,,,",
        ",,January,February,Total By Year,",
        "2025,Stories Hamra,1000,500,1500,",
        ",Stories Verdun,200,100,305,",
        ",Total,1200,600,1805,",
        "2026,Stories Hamra,1200,,1200,",
        ",Stories Verdun,180,,180,",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::records::{ItemProfitRecord, MonthlySalesLong, RowType};
    use crate::process::test_support::init_test_logging;
    use crate::tables::read_table;
    use tempfile::tempdir;

    #[test]
    fn cleaning_writes_every_table_and_the_report() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        fixtures::write_all(dir.path())?;
        let config = PipelineConfig::default().with_overrides(Some(dir.path().into()), None, None);

        let report = run_cleaning(&config)?;

        for name in [
            clean_files::ITEM_PROFIT,
            clean_files::SALES_BY_GROUP,
            clean_files::CATEGORY_PROFIT,
            clean_files::MONTHLY_WIDE,
            clean_files::MONTHLY_LONG,
            clean_files::CLEANING_REPORT,
        ] {
            assert!(config.clean_path(name).exists(), "{name} missing");
        }

        assert_eq!(report.row_counts["rep_00014_raw_rows"], fixtures::ITEM_PROFIT.len());
        assert_eq!(report.row_counts["rep_00014_clean_rows"], 6);
        assert_eq!(report.row_type_counts["rep_00014"]["item"], 4);
        assert_eq!(report.row_type_counts["rep_00191"]["group_total"], 3);
        assert_eq!(report.row_counts["rep_00134_wide_clean_rows"], 5);

        // Verdun's branch total disagrees with its single category by 10.
        let mismatches = &report.quality_checks.rep_00673_branch_total_mismatches;
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].branch, "Stories Verdun");
        assert_eq!(mismatches[0].difference, -10.0);

        // Verdun 2025: 200 + 100 declared as 305.
        let years = &report.quality_checks.rep_00134_total_by_year_mismatches;
        assert_eq!(years.len(), 1);
        assert_eq!(years[0].difference, 5.0);
        assert!(report.quality_checks.rep_00134_merge_conflicts.is_empty());

        let items: Vec<ItemProfitRecord> =
            read_table(&config.clean_path(clean_files::ITEM_PROFIT))?;
        assert_eq!(items[0].source_file, "rep_s_00014_SMRY.csv");
        assert_eq!(items[0].row_type, RowType::Item);
        assert_eq!(items[0].division.as_deref(), Some("COFFEE"));

        let long: Vec<MonthlySalesLong> =
            read_table(&config.clean_path(clean_files::MONTHLY_LONG))?;
        assert!(long.iter().all(|r| r.source_file == "REP_S_00134_SMRY.csv"));

        let json = fs::read_to_string(config.clean_path(clean_files::CLEANING_REPORT))?;
        let value: serde_json::Value = serde_json::from_str(&json)?;
        assert!(value["generated_at"].is_string());
        assert_eq!(
            value["quality_checks"]["rep_00673_branch_total_mismatches"][0]["metric"],
            "total_profit"
        );
        assert!(value["output_files"]["rep_00134_long"]
            .as_str()
            .is_some_and(|p| p.ends_with(clean_files::MONTHLY_LONG)));
        Ok(())
    }

    #[test]
    fn blank_lines_count_toward_raw_rows_only() -> Result<()> {
        let dir = tempdir()?;
        fixtures::write_all(dir.path())?;
        let mut lines = fixtures::ITEM_PROFIT.to_vec();
        lines.insert(3, "");
        lines.push("");
        fixtures::write_fixture(dir.path(), "rep_s_00014_SMRY.csv", &lines)?;
        let config = PipelineConfig::default().with_overrides(Some(dir.path().into()), None, None);

        let report = run_cleaning(&config)?;
        assert_eq!(report.row_counts["rep_00014_raw_rows"], fixtures::ITEM_PROFIT.len() + 2);
        assert_eq!(report.row_counts["rep_00014_clean_rows"], 6);
        Ok(())
    }

    #[test]
    fn missing_reports_stop_before_writing() -> Result<()> {
        let dir = tempdir()?;
        fixtures::write_fixture(dir.path(), "rep_s_00014_SMRY.csv", fixtures::ITEM_PROFIT)?;
        let config = PipelineConfig::default().with_overrides(Some(dir.path().into()), None, None);

        let err = run_cleaning(&config).unwrap_err();
        assert!(err.to_string().starts_with("Missing input files"));
        assert!(!config.cleaned_dir.exists());
        Ok(())
    }
}
