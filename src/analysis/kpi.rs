//! One comparison row per branch, joined across all four clean tables.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};
use tracing::{debug, info};

use super::{label, read_clean};
use crate::config::clean_files;
use crate::numeric::{dense_rank_desc, percent, round2, round_opt};
use crate::process::records::{
    CategoryProfitRecord, GroupSalesRecord, ItemProfitRecord, MonthlySalesWide, RowType,
};
use crate::process::utils::canonical_key;
use crate::tables::ensure_exist;

pub const BASE_YEAR: i32 = 2025;
pub const COMPARISON_YEAR: i32 = 2026;

/// Items below this profit percentage count as low margin.
pub const LOW_MARGIN_PCT: f64 = 20.0;

const BEVERAGES: &str = "BEVERAGES";
const FOOD: &str = "FOOD";

/// Suggested strategy for a branch, from January growth and profit margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationTag {
    InsufficientHistory,
    ScaleWinner,
    Turnaround,
    ProtectMarginDriveTraffic,
    BalancedOptimize,
}

impl RecommendationTag {
    /// First matching rule wins.
    pub fn decide(growth_pct: Option<f64>, margin_pct: Option<f64>) -> Self {
        let (Some(growth), Some(margin)) = (growth_pct, margin_pct) else {
            return RecommendationTag::InsufficientHistory;
        };
        if growth >= 10.0 && margin >= 70.0 {
            RecommendationTag::ScaleWinner
        } else if growth < 0.0 && margin < 68.0 {
            RecommendationTag::Turnaround
        } else if margin >= 72.0 && growth < 5.0 {
            RecommendationTag::ProtectMarginDriveTraffic
        } else {
            RecommendationTag::BalancedOptimize
        }
    }
}

/// A row of `branch_kpis.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchKpi {
    pub branch: String,
    pub revenue_proxy_2025: Option<f64>,
    pub revenue_jan_2025: Option<f64>,
    pub revenue_jan_2026: Option<f64>,
    pub jan_yoy_growth_pct: Option<f64>,
    pub true_revenue_2025: Option<f64>,
    pub total_cost_2025: Option<f64>,
    pub total_profit_2025: Option<f64>,
    pub profit_margin_pct_2025: Option<f64>,
    pub beverages_profit_2025: f64,
    pub food_profit_2025: f64,
    pub other_profit_2025: f64,
    pub beverages_profit_share_pct: Option<f64>,
    pub food_profit_share_pct: Option<f64>,
    pub other_profit_share_pct: Option<f64>,
    pub items_sold_qty_2025: f64,
    pub item_row_count: usize,
    pub unique_item_count: usize,
    pub loss_making_item_count: usize,
    pub loss_making_item_share_pct: Option<f64>,
    pub low_margin_item_count: usize,
    pub low_margin_item_share_pct: Option<f64>,
    pub group_total_amount_2025: Option<f64>,
    pub top_group_by_sales: Option<String>,
    pub top_group_sales_amount: Option<f64>,
    pub top_group_sales_share_pct: Option<f64>,
    pub recommendation_tag: RecommendationTag,
    pub rank_total_profit_2025: Option<u32>,
    pub rank_profit_margin_2025: Option<u32>,
    pub rank_jan_yoy_growth: Option<u32>,
}

impl BranchKpi {
    pub const COLUMNS: &'static [&'static str] = &[
        "branch",
        "revenue_proxy_2025",
        "revenue_jan_2025",
        "revenue_jan_2026",
        "jan_yoy_growth_pct",
        "true_revenue_2025",
        "total_cost_2025",
        "total_profit_2025",
        "profit_margin_pct_2025",
        "beverages_profit_2025",
        "food_profit_2025",
        "other_profit_2025",
        "beverages_profit_share_pct",
        "food_profit_share_pct",
        "other_profit_share_pct",
        "items_sold_qty_2025",
        "item_row_count",
        "unique_item_count",
        "loss_making_item_count",
        "loss_making_item_share_pct",
        "low_margin_item_count",
        "low_margin_item_share_pct",
        "group_total_amount_2025",
        "top_group_by_sales",
        "top_group_sales_amount",
        "top_group_sales_share_pct",
        "recommendation_tag",
        "rank_total_profit_2025",
        "rank_profit_margin_2025",
        "rank_jan_yoy_growth",
    ];
}

/// The four clean tables the KPIs are joined from.
#[derive(Debug, Clone, Default)]
pub struct KpiInputs {
    pub monthly_wide: Vec<MonthlySalesWide>,
    pub categories: Vec<CategoryProfitRecord>,
    pub items: Vec<ItemProfitRecord>,
    pub groups: Vec<GroupSalesRecord>,
}

/// Everything collected for one branch before the row is derived.
#[derive(Debug, Default)]
struct BranchAccumulator {
    display: String,
    revenue_2025: Option<f64>,
    jan_2025: Option<f64>,
    jan_2026: Option<f64>,
    total_cost: Option<f64>,
    total_profit: Option<f64>,
    category_profit: BTreeMap<String, f64>,
    item_rows: usize,
    item_qty: f64,
    products: BTreeSet<String>,
    loss_items: usize,
    low_margin_items: usize,
    group_totals: BTreeMap<String, f64>,
    branch_group_total: Option<f64>,
}

impl BranchAccumulator {
    /// The largest group; on ties the first in name order.
    fn top_group(&self) -> Option<(&str, f64)> {
        let mut top: Option<(&str, f64)> = None;
        for (name, &amount) in &self.group_totals {
            if top.map_or(true, |(_, best)| amount > best) {
                top = Some((name.as_str(), amount));
            }
        }
        top
    }

    fn into_kpi(self) -> BranchKpi {
        let jan_growth = match (self.jan_2025, self.jan_2026) {
            (Some(jan25), Some(jan26)) if jan25 != 0.0 => Some((jan26 - jan25) / jan25 * 100.0),
            _ => None,
        };

        let true_revenue = match (self.total_cost, self.total_profit) {
            (Some(cost), Some(profit)) => Some(cost + profit),
            _ => None,
        };
        let margin = percent(self.total_profit, true_revenue);

        let beverages = self.category_profit.get(BEVERAGES).copied().unwrap_or(0.0);
        let food = self.category_profit.get(FOOD).copied().unwrap_or(0.0);
        let other: f64 = self
            .category_profit
            .iter()
            .filter(|(name, _)| name.as_str() != BEVERAGES && name.as_str() != FOOD)
            .map(|(_, v)| v)
            .sum();
        let category_sum = Some(beverages + food + other);

        let top = self
            .top_group()
            .map(|(name, amount)| (name.to_string(), amount));
        let top_amount = top.as_ref().map(|(_, amount)| *amount);
        let group_total = self.branch_group_total.or_else(|| {
            (!self.group_totals.is_empty()).then(|| self.group_totals.values().sum())
        });
        let top_share = percent(top_amount, group_total);

        let item_rows = (self.item_rows > 0).then_some(self.item_rows as f64);

        BranchKpi {
            branch: self.display,
            revenue_proxy_2025: round_opt(self.revenue_2025),
            revenue_jan_2025: round_opt(self.jan_2025),
            revenue_jan_2026: round_opt(self.jan_2026),
            jan_yoy_growth_pct: round_opt(jan_growth),
            true_revenue_2025: round_opt(true_revenue),
            total_cost_2025: round_opt(self.total_cost),
            total_profit_2025: round_opt(self.total_profit),
            profit_margin_pct_2025: round_opt(margin),
            beverages_profit_2025: round2(beverages),
            food_profit_2025: round2(food),
            other_profit_2025: round2(other),
            beverages_profit_share_pct: round_opt(percent(Some(beverages), category_sum)),
            food_profit_share_pct: round_opt(percent(Some(food), category_sum)),
            other_profit_share_pct: round_opt(percent(Some(other), category_sum)),
            items_sold_qty_2025: round2(self.item_qty),
            item_row_count: self.item_rows,
            unique_item_count: self.products.len(),
            loss_making_item_count: self.loss_items,
            loss_making_item_share_pct: round_opt(percent(
                Some(self.loss_items as f64),
                item_rows,
            )),
            low_margin_item_count: self.low_margin_items,
            low_margin_item_share_pct: round_opt(percent(
                Some(self.low_margin_items as f64),
                item_rows,
            )),
            group_total_amount_2025: round_opt(group_total),
            top_group_by_sales: top.map(|(name, _)| name),
            top_group_sales_amount: round_opt(top_amount),
            top_group_sales_share_pct: round_opt(top_share),
            recommendation_tag: RecommendationTag::decide(jan_growth, margin),
            rank_total_profit_2025: None,
            rank_profit_margin_2025: None,
            rank_jan_yoy_growth: None,
        }
    }
}

/// Branch accumulators keyed by canonical branch name.
#[derive(Debug, Default)]
struct Branches(BTreeMap<String, BranchAccumulator>);

impl Branches {
    /// Accumulator for `branch`, or `None` for a blank name. The first spelling seen
    /// becomes the display name.
    fn entry(&mut self, branch: Option<&str>) -> Option<&mut BranchAccumulator> {
        let display = label(branch);
        if display.is_empty() {
            return None;
        }
        let acc = self.0.entry(canonical_key(&display)).or_default();
        if acc.display.is_empty() {
            acc.display = display;
        }
        Some(acc)
    }
}

/// Join the clean tables into one KPI row per branch, ranked and sorted by profit.
pub fn compute_branch_kpis(inputs: &KpiInputs) -> Vec<BranchKpi> {
    let mut branches = Branches::default();

    for row in inputs
        .monthly_wide
        .iter()
        .filter(|r| r.row_type == RowType::Branch)
    {
        let Some(acc) = branches.entry(Some(row.branch.as_str())) else {
            continue;
        };
        match row.year {
            BASE_YEAR => {
                if row.january.is_some() {
                    acc.jan_2025 = row.january;
                }
                if row.total_by_year.is_some() {
                    acc.revenue_2025 = row.total_by_year;
                }
            }
            COMPARISON_YEAR => {
                if row.january.is_some() {
                    acc.jan_2026 = row.january;
                }
            }
            _ => {}
        }
    }

    for row in &inputs.categories {
        let Some(acc) = branches.entry(row.branch.as_deref()) else {
            continue;
        };
        match row.row_type {
            RowType::BranchTotal => {
                if row.total_cost.is_some() {
                    acc.total_cost = row.total_cost;
                }
                if row.total_profit.is_some() {
                    acc.total_profit = row.total_profit;
                }
            }
            RowType::Category => {
                let category = label(row.category.as_deref()).to_uppercase();
                *acc.category_profit.entry(category).or_insert(0.0) +=
                    row.total_profit.unwrap_or(0.0);
            }
            _ => {}
        }
    }

    for row in inputs.items.iter().filter(|r| r.row_type == RowType::Item) {
        let Some(acc) = branches.entry(row.branch.as_deref()) else {
            continue;
        };
        acc.item_rows += 1;
        acc.item_qty += row.qty.unwrap_or(0.0);
        let product = label(row.product_desc.as_deref());
        if !product.is_empty() {
            acc.products.insert(product);
        }
        if row.total_profit.is_some_and(|p| p < 0.0) {
            acc.loss_items += 1;
        }
        if row.total_profit_pct.is_some_and(|p| p < LOW_MARGIN_PCT) {
            acc.low_margin_items += 1;
        }
    }

    for row in &inputs.groups {
        let Some(acc) = branches.entry(row.branch.as_deref()) else {
            continue;
        };
        match (row.row_type, row.total_amount) {
            (RowType::GroupTotal, Some(amount)) => {
                let group = label(row.group.as_deref()).to_uppercase();
                if !group.is_empty() {
                    *acc.group_totals.entry(group).or_insert(0.0) += amount;
                }
            }
            (RowType::BranchTotal, Some(amount)) => acc.branch_group_total = Some(amount),
            _ => {}
        }
    }

    let mut rows: Vec<BranchKpi> = branches
        .0
        .into_values()
        .map(BranchAccumulator::into_kpi)
        .collect();
    assign_ranks(&mut rows);
    rows.sort_by_key(|r| (r.rank_total_profit_2025.is_none(), r.rank_total_profit_2025));
    debug!(branches = rows.len(), "branch KPIs computed");
    rows
}

fn assign_ranks(rows: &mut [BranchKpi]) {
    let profit: Vec<_> = rows.iter().map(|r| r.total_profit_2025).collect();
    let margin: Vec<_> = rows.iter().map(|r| r.profit_margin_pct_2025).collect();
    let growth: Vec<_> = rows.iter().map(|r| r.jan_yoy_growth_pct).collect();

    let ranks = dense_rank_desc(&profit)
        .into_iter()
        .zip(dense_rank_desc(&margin))
        .zip(dense_rank_desc(&growth));
    for (row, ((profit, margin), growth)) in rows.iter_mut().zip(ranks) {
        row.rank_total_profit_2025 = profit;
        row.rank_profit_margin_2025 = margin;
        row.rank_jan_yoy_growth = growth;
    }
}

/// Read the clean tables from `cleaned_dir` and compute the KPI table.
#[tracing::instrument(
    level = "info",
    skip(cleaned_dir),
    fields(cleaned_dir = %cleaned_dir.display())
)]
pub fn build_branch_kpis(cleaned_dir: &Path) -> Result<Vec<BranchKpi>> {
    let required = [
        clean_files::ITEM_PROFIT,
        clean_files::MONTHLY_WIDE,
        clean_files::SALES_BY_GROUP,
        clean_files::CATEGORY_PROFIT,
    ]
    .map(|name| cleaned_dir.join(name));
    let paths: Vec<&Path> = required.iter().map(|p| p.as_path()).collect();
    ensure_exist("cleaned files", &paths)?;

    let inputs = KpiInputs {
        monthly_wide: read_clean(cleaned_dir, clean_files::MONTHLY_WIDE)?,
        categories: read_clean(cleaned_dir, clean_files::CATEGORY_PROFIT)?,
        items: read_clean(cleaned_dir, clean_files::ITEM_PROFIT)?,
        groups: read_clean(cleaned_dir, clean_files::SALES_BY_GROUP)?,
    };

    let rows = compute_branch_kpis(&inputs);
    if rows.is_empty() {
        bail!("No KPI rows generated from {}", cleaned_dir.display());
    }
    info!(branches = rows.len(), "branch KPI table built");
    Ok(rows)
}
