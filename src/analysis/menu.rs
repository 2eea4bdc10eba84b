//! Menu engineering: classify products by popularity and unit profit relative to
//! their population, overall and within each branch.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};
use tracing::{debug, info};

use super::{label, read_clean};
use crate::config::clean_files;
use crate::numeric::{median, percent, round2, round_opt, safe_div};
use crate::process::records::{ItemProfitRecord, RowType};
use crate::tables::ensure_exist;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    Star,
    Plowhorse,
    Puzzle,
    Dog,
    Unclassified,
}

impl Quadrant {
    pub fn recommended_action(&self) -> &'static str {
        match self {
            Quadrant::Star => "Keep quality high, feature prominently, and bundle for upsell.",
            Quadrant::Plowhorse => {
                "High demand but low unit margin: optimize cost/price and portions."
            }
            Quadrant::Puzzle => {
                "High unit margin but low demand: improve placement and run targeted promos."
            }
            Quadrant::Dog => {
                "Low demand and low margin: consider reformulation, repricing, or phase-out."
            }
            Quadrant::Unclassified => {
                "Insufficient sales signal: review tracking and data quality."
            }
        }
    }
}

/// Summed item rows for one product, overall or within one branch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateBucket {
    pub branch: Option<String>,
    pub product_desc: String,
    pub category: String,
    pub division: String,
    /// Last department seen for the product.
    pub department: String,
    pub qty: f64,
    pub true_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
    pub record_count: usize,
}

impl AggregateBucket {
    fn add(&mut self, item: &MenuItem) {
        self.department = item.department.clone();
        self.qty += item.qty;
        self.total_cost += item.cost;
        self.total_profit += item.profit;
        self.true_revenue += item.cost + item.profit;
        self.record_count += 1;
    }

    /// Profit per unit sold; undefined without positive quantity.
    pub fn profit_per_unit(&self) -> Option<f64> {
        (self.qty > 0.0).then(|| self.total_profit / self.qty)
    }

    pub fn profit_margin_pct(&self) -> Option<f64> {
        percent(Some(self.total_profit), Some(self.true_revenue))
    }
}

/// Buckets in first-seen order.
#[derive(Debug, Default)]
struct BucketMap {
    buckets: Vec<AggregateBucket>,
    index: HashMap<(Option<String>, String, String, String), usize>,
}

impl BucketMap {
    fn add(&mut self, branch: Option<&str>, item: &MenuItem) {
        let key = (
            branch.map(str::to_string),
            item.product.clone(),
            item.category.clone(),
            item.division.clone(),
        );
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.buckets.push(AggregateBucket {
                    branch: key.0.clone(),
                    product_desc: key.1.clone(),
                    category: key.2.clone(),
                    division: key.3.clone(),
                    ..AggregateBucket::default()
                });
                self.index.insert(key, self.buckets.len() - 1);
                self.buckets.len() - 1
            }
        };
        self.buckets[slot].add(item);
    }
}

/// An item row reduced to the fields menu engineering uses.
struct MenuItem {
    branch: String,
    product: String,
    category: String,
    division: String,
    department: String,
    qty: f64,
    cost: f64,
    profit: f64,
}

impl MenuItem {
    /// Item rows with both a product and a branch; everything else is skipped.
    fn from_record(record: &ItemProfitRecord) -> Option<Self> {
        if record.row_type != RowType::Item {
            return None;
        }
        let product = label(record.product_desc.as_deref());
        let branch = label(record.branch.as_deref());
        if product.is_empty() || branch.is_empty() {
            return None;
        }
        Some(Self {
            branch,
            product,
            category: label(record.category.as_deref()),
            division: label(record.division.as_deref()),
            department: label(record.department.as_deref()),
            qty: record.qty.unwrap_or(0.0),
            cost: record.total_cost.unwrap_or(0.0),
            profit: record.total_profit.unwrap_or(0.0),
        })
    }
}

/// Population medians that split the quadrants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Benchmarks {
    pub qty: f64,
    pub profit_per_unit: f64,
}

impl Benchmarks {
    /// Median quantity over products that sold, median unit profit over products
    /// where it is defined. An empty population yields 0.0.
    pub fn of<'a>(buckets: impl IntoIterator<Item = &'a AggregateBucket>) -> Self {
        let mut qty = Vec::new();
        let mut ppu = Vec::new();
        for bucket in buckets {
            if bucket.qty > 0.0 {
                qty.push(bucket.qty);
            }
            if let Some(value) = bucket.profit_per_unit() {
                ppu.push(value);
            }
        }
        Self {
            qty: median(&qty).unwrap_or(0.0),
            profit_per_unit: median(&ppu).unwrap_or(0.0),
        }
    }

    pub fn classify(&self, qty: f64, profit_per_unit: Option<f64>) -> Quadrant {
        let Some(ppu) = profit_per_unit.filter(|_| qty > 0.0) else {
            return Quadrant::Unclassified;
        };
        match (qty >= self.qty, ppu >= self.profit_per_unit) {
            (true, true) => Quadrant::Star,
            (true, false) => Quadrant::Plowhorse,
            (false, true) => Quadrant::Puzzle,
            (false, false) => Quadrant::Dog,
        }
    }

    fn popularity_index(&self, bucket: &AggregateBucket) -> Option<f64> {
        safe_div(Some(bucket.qty), Some(self.qty))
    }

    fn margin_index(&self, bucket: &AggregateBucket) -> Option<f64> {
        safe_div(bucket.profit_per_unit(), Some(self.profit_per_unit))
    }
}

/// A row of `menu_engineering_overall.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItemRow {
    pub product_desc: String,
    pub category: String,
    pub division: String,
    pub department: String,
    pub qty: f64,
    pub true_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
    pub record_count: usize,
    pub profit_per_unit: Option<f64>,
    pub profit_margin_pct: Option<f64>,
    pub qty_benchmark_median: f64,
    pub profit_per_unit_benchmark_median: f64,
    pub popularity_index: Option<f64>,
    pub margin_index: Option<f64>,
    pub quadrant: Quadrant,
    pub recommended_action: String,
    pub profit_contribution_pct: Option<f64>,
    pub qty_share_pct: Option<f64>,
    pub revenue_share_pct: Option<f64>,
}

impl MenuItemRow {
    pub const COLUMNS: &'static [&'static str] = &[
        "product_desc",
        "category",
        "division",
        "department",
        "qty",
        "true_revenue",
        "total_cost",
        "total_profit",
        "record_count",
        "profit_per_unit",
        "profit_margin_pct",
        "qty_benchmark_median",
        "profit_per_unit_benchmark_median",
        "popularity_index",
        "margin_index",
        "quadrant",
        "recommended_action",
        "profit_contribution_pct",
        "qty_share_pct",
        "revenue_share_pct",
    ];
}

/// A row of `menu_engineering_by_branch.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchMenuRow {
    pub branch: String,
    pub product_desc: String,
    pub category: String,
    pub division: String,
    pub department: String,
    pub qty: f64,
    pub true_revenue: f64,
    pub total_cost: f64,
    pub total_profit: f64,
    pub record_count: usize,
    pub profit_per_unit: Option<f64>,
    pub profit_margin_pct: Option<f64>,
    pub branch_qty_benchmark_median: f64,
    pub branch_ppu_benchmark_median: f64,
    pub branch_popularity_index: Option<f64>,
    pub branch_margin_index: Option<f64>,
    pub branch_quadrant: Quadrant,
    pub branch_recommended_action: String,
    pub branch_profit_contribution_pct: Option<f64>,
}

impl BranchMenuRow {
    pub const COLUMNS: &'static [&'static str] = &[
        "branch",
        "product_desc",
        "category",
        "division",
        "department",
        "qty",
        "true_revenue",
        "total_cost",
        "total_profit",
        "record_count",
        "profit_per_unit",
        "profit_margin_pct",
        "branch_qty_benchmark_median",
        "branch_ppu_benchmark_median",
        "branch_popularity_index",
        "branch_margin_index",
        "branch_quadrant",
        "branch_recommended_action",
        "branch_profit_contribution_pct",
    ];
}

/// A row of `menu_engineering_branch_summary.csv`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchSummaryRow {
    pub branch: String,
    pub total_products: usize,
    pub total_qty: f64,
    pub total_profit: f64,
    pub stars_count: usize,
    pub plowhorse_count: usize,
    pub puzzle_count: usize,
    pub dog_count: usize,
    pub unclassified_count: usize,
    pub stars_profit: f64,
    pub plowhorse_profit: f64,
    pub puzzle_profit: f64,
    pub dog_profit: f64,
    pub unclassified_profit: f64,
    pub stars_profit_share_pct: Option<f64>,
    pub dog_profit_share_pct: Option<f64>,
}

impl BranchSummaryRow {
    pub const COLUMNS: &'static [&'static str] = &[
        "branch",
        "total_products",
        "total_qty",
        "total_profit",
        "stars_count",
        "plowhorse_count",
        "puzzle_count",
        "dog_count",
        "unclassified_count",
        "stars_profit",
        "plowhorse_profit",
        "puzzle_profit",
        "dog_profit",
        "unclassified_profit",
        "stars_profit_share_pct",
        "dog_profit_share_pct",
    ];

    fn add(&mut self, bucket: &AggregateBucket, quadrant: Quadrant) {
        let profit = bucket.total_profit;
        self.total_products += 1;
        self.total_qty += bucket.qty;
        self.total_profit += profit;
        let (count, sum) = match quadrant {
            Quadrant::Star => (&mut self.stars_count, &mut self.stars_profit),
            Quadrant::Plowhorse => (&mut self.plowhorse_count, &mut self.plowhorse_profit),
            Quadrant::Puzzle => (&mut self.puzzle_count, &mut self.puzzle_profit),
            Quadrant::Dog => (&mut self.dog_count, &mut self.dog_profit),
            Quadrant::Unclassified => (&mut self.unclassified_count, &mut self.unclassified_profit),
        };
        *count += 1;
        *sum += profit;
    }

    /// Derive the shares and round every amount.
    fn finish(mut self) -> Self {
        self.stars_profit_share_pct =
            round_opt(percent(Some(self.stars_profit), Some(self.total_profit)));
        self.dog_profit_share_pct =
            round_opt(percent(Some(self.dog_profit), Some(self.total_profit)));
        self.total_qty = round2(self.total_qty);
        self.total_profit = round2(self.total_profit);
        self.stars_profit = round2(self.stars_profit);
        self.plowhorse_profit = round2(self.plowhorse_profit);
        self.puzzle_profit = round2(self.puzzle_profit);
        self.dog_profit = round2(self.dog_profit);
        self.unclassified_profit = round2(self.unclassified_profit);
        self
    }
}

/// The three menu-engineering outputs.
#[derive(Debug, Clone, Default)]
pub struct MenuTables {
    pub overall: Vec<MenuItemRow>,
    pub by_branch: Vec<BranchMenuRow>,
    pub branch_summary: Vec<BranchSummaryRow>,
}

fn overall_rows(buckets: &[AggregateBucket]) -> Vec<MenuItemRow> {
    let bench = Benchmarks::of(buckets);
    let total_profit: f64 = buckets.iter().map(|b| b.total_profit).sum();
    let total_qty: f64 = buckets.iter().map(|b| b.qty).sum();
    let total_revenue: f64 = buckets.iter().map(|b| b.true_revenue).sum();
    debug!(
        qty_median = bench.qty,
        ppu_median = bench.profit_per_unit,
        "overall benchmarks"
    );

    let mut ordered: Vec<&AggregateBucket> = buckets.iter().collect();
    ordered.sort_by(|a, b| b.total_profit.total_cmp(&a.total_profit));

    ordered
        .into_iter()
        .map(|bucket| {
            let quadrant = bench.classify(bucket.qty, bucket.profit_per_unit());
            MenuItemRow {
                product_desc: bucket.product_desc.clone(),
                category: bucket.category.clone(),
                division: bucket.division.clone(),
                department: bucket.department.clone(),
                qty: round2(bucket.qty),
                true_revenue: round2(bucket.true_revenue),
                total_cost: round2(bucket.total_cost),
                total_profit: round2(bucket.total_profit),
                record_count: bucket.record_count,
                profit_per_unit: round_opt(bucket.profit_per_unit()),
                profit_margin_pct: round_opt(bucket.profit_margin_pct()),
                qty_benchmark_median: round2(bench.qty),
                profit_per_unit_benchmark_median: round2(bench.profit_per_unit),
                popularity_index: round_opt(bench.popularity_index(bucket)),
                margin_index: round_opt(bench.margin_index(bucket)),
                quadrant,
                recommended_action: quadrant.recommended_action().to_string(),
                profit_contribution_pct: round_opt(percent(
                    Some(bucket.total_profit),
                    Some(total_profit),
                )),
                qty_share_pct: round_opt(percent(Some(bucket.qty), Some(total_qty))),
                revenue_share_pct: round_opt(percent(
                    Some(bucket.true_revenue),
                    Some(total_revenue),
                )),
            }
        })
        .collect()
}

fn branch_rows(buckets: &[AggregateBucket]) -> (Vec<BranchMenuRow>, Vec<BranchSummaryRow>) {
    let mut by_branch: BTreeMap<String, Vec<&AggregateBucket>> = BTreeMap::new();
    for bucket in buckets {
        let branch = bucket.branch.clone().unwrap_or_default();
        by_branch.entry(branch).or_default().push(bucket);
    }

    let mut rows = Vec::new();
    let mut summary = Vec::new();
    for (branch, mut members) in by_branch {
        let bench = Benchmarks::of(members.iter().copied());
        let branch_profit: f64 = members.iter().map(|b| b.total_profit).sum();
        members.sort_by(|a, b| b.total_profit.total_cmp(&a.total_profit));

        let mut totals = BranchSummaryRow {
            branch: branch.clone(),
            ..BranchSummaryRow::default()
        };
        for bucket in members {
            let quadrant = bench.classify(bucket.qty, bucket.profit_per_unit());
            totals.add(bucket, quadrant);
            rows.push(BranchMenuRow {
                branch: branch.clone(),
                product_desc: bucket.product_desc.clone(),
                category: bucket.category.clone(),
                division: bucket.division.clone(),
                department: bucket.department.clone(),
                qty: round2(bucket.qty),
                true_revenue: round2(bucket.true_revenue),
                total_cost: round2(bucket.total_cost),
                total_profit: round2(bucket.total_profit),
                record_count: bucket.record_count,
                profit_per_unit: round_opt(bucket.profit_per_unit()),
                profit_margin_pct: round_opt(bucket.profit_margin_pct()),
                branch_qty_benchmark_median: round2(bench.qty),
                branch_ppu_benchmark_median: round2(bench.profit_per_unit),
                branch_popularity_index: round_opt(bench.popularity_index(bucket)),
                branch_margin_index: round_opt(bench.margin_index(bucket)),
                branch_quadrant: quadrant,
                branch_recommended_action: quadrant.recommended_action().to_string(),
                branch_profit_contribution_pct: round_opt(percent(
                    Some(bucket.total_profit),
                    Some(branch_profit),
                )),
            });
        }
        summary.push(totals.finish());
    }

    summary.sort_by(|a, b| b.total_profit.total_cmp(&a.total_profit));
    (rows, summary)
}

/// Aggregate item rows and classify them, overall and per branch.
pub fn compute_menu_tables(items: &[ItemProfitRecord]) -> MenuTables {
    let mut overall = BucketMap::default();
    let mut per_branch = BucketMap::default();
    for item in items.iter().filter_map(MenuItem::from_record) {
        overall.add(None, &item);
        per_branch.add(Some(item.branch.as_str()), &item);
    }

    let (by_branch, branch_summary) = branch_rows(&per_branch.buckets);
    MenuTables {
        overall: overall_rows(&overall.buckets),
        by_branch,
        branch_summary,
    }
}

/// Read the clean item table from `cleaned_dir` and build all three tables.
#[tracing::instrument(
    level = "info",
    skip(cleaned_dir),
    fields(cleaned_dir = %cleaned_dir.display())
)]
pub fn build_menu_tables(cleaned_dir: &Path) -> Result<MenuTables> {
    let source = cleaned_dir.join(clean_files::ITEM_PROFIT);
    ensure_exist("cleaned file", &[source.as_path()])?;
    let items: Vec<ItemProfitRecord> = read_clean(cleaned_dir, clean_files::ITEM_PROFIT)?;

    let tables = compute_menu_tables(&items);
    if tables.overall.is_empty() || tables.by_branch.is_empty() || tables.branch_summary.is_empty()
    {
        bail!("No menu rows generated from {}", source.display());
    }
    info!(
        overall = tables.overall.len(),
        by_branch = tables.by_branch.len(),
        branches = tables.branch_summary.len(),
        "menu engineering tables built"
    );
    Ok(tables)
}
