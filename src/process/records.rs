use serde::{Deserialize, Serialize};

/// Discriminator carried by every normalized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowType {
    Item,
    Category,
    CategoryTotal,
    DepartmentTotal,
    DivisionTotal,
    GroupTotal,
    BranchTotal,
    Branch,
    GrandTotal,
}

impl RowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowType::Item => "item",
            RowType::Category => "category",
            RowType::CategoryTotal => "category_total",
            RowType::DepartmentTotal => "department_total",
            RowType::DivisionTotal => "division_total",
            RowType::GroupTotal => "group_total",
            RowType::BranchTotal => "branch_total",
            RowType::Branch => "branch",
            RowType::GrandTotal => "grand_total",
        }
    }
}

/// A clean dataset with a fixed output column order.
pub trait Table: Serialize {
    const COLUMNS: &'static [&'static str];

    fn row_type(&self) -> RowType;
}

/// The six positional metrics shared by the theoretical-profit reports.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfitMetrics {
    pub qty: Option<f64>,
    pub total_price: Option<f64>,
    pub total_cost: Option<f64>,
    pub total_cost_pct: Option<f64>,
    pub total_profit: Option<f64>,
    pub total_profit_pct: Option<f64>,
}

impl ProfitMetrics {
    pub fn has_any(&self) -> bool {
        [
            self.qty,
            self.total_price,
            self.total_cost,
            self.total_cost_pct,
            self.total_profit,
            self.total_profit_pct,
        ]
        .iter()
        .any(Option::is_some)
    }
}

/// Report 00014: theoretical profit by item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProfitRecord {
    pub source_file: String,
    pub row_type: RowType,
    pub branch: Option<String>,
    pub department: Option<String>,
    pub category: Option<String>,
    pub division: Option<String>,
    pub product_desc: Option<String>,
    pub qty: Option<f64>,
    pub total_price: Option<f64>,
    pub total_cost: Option<f64>,
    pub total_cost_pct: Option<f64>,
    pub total_profit: Option<f64>,
    pub total_profit_pct: Option<f64>,
}

impl Table for ItemProfitRecord {
    const COLUMNS: &'static [&'static str] = &[
        "source_file",
        "row_type",
        "branch",
        "department",
        "category",
        "division",
        "product_desc",
        "qty",
        "total_price",
        "total_cost",
        "total_cost_pct",
        "total_profit",
        "total_profit_pct",
    ];

    fn row_type(&self) -> RowType {
        self.row_type
    }
}

/// Report 00191: sales by items by group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSalesRecord {
    pub source_file: String,
    pub row_type: RowType,
    pub branch: Option<String>,
    pub division: Option<String>,
    pub group: Option<String>,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub qty: Option<f64>,
    pub total_amount: Option<f64>,
}

impl Table for GroupSalesRecord {
    const COLUMNS: &'static [&'static str] = &[
        "source_file",
        "row_type",
        "branch",
        "division",
        "group",
        "description",
        "barcode",
        "qty",
        "total_amount",
    ];

    fn row_type(&self) -> RowType {
        self.row_type
    }
}

/// Report 00673: theoretical profit by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProfitRecord {
    pub source_file: String,
    pub row_type: RowType,
    pub branch: Option<String>,
    pub category: Option<String>,
    pub qty: Option<f64>,
    pub total_price: Option<f64>,
    pub total_cost: Option<f64>,
    pub total_cost_pct: Option<f64>,
    pub total_profit: Option<f64>,
    pub total_profit_pct: Option<f64>,
}

impl CategoryProfitRecord {
    pub fn new(
        source_file: &str,
        row_type: RowType,
        branch: Option<String>,
        category: Option<String>,
        m: ProfitMetrics,
    ) -> Self {
        Self {
            source_file: source_file.to_string(),
            row_type,
            branch,
            category,
            qty: m.qty,
            total_price: m.total_price,
            total_cost: m.total_cost,
            total_cost_pct: m.total_cost_pct,
            total_profit: m.total_profit,
            total_profit_pct: m.total_profit_pct,
        }
    }
}

impl Table for CategoryProfitRecord {
    const COLUMNS: &'static [&'static str] = &[
        "source_file",
        "row_type",
        "branch",
        "category",
        "qty",
        "total_price",
        "total_cost",
        "total_cost_pct",
        "total_profit",
        "total_profit_pct",
    ];

    fn row_type(&self) -> RowType {
        self.row_type
    }
}

/// A sales column of the comparative monthly report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesMetric {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
    TotalByYear,
}

impl SalesMetric {
    /// Output order: the twelve months, then the yearly total.
    pub const ALL: [SalesMetric; 13] = [
        SalesMetric::January,
        SalesMetric::February,
        SalesMetric::March,
        SalesMetric::April,
        SalesMetric::May,
        SalesMetric::June,
        SalesMetric::July,
        SalesMetric::August,
        SalesMetric::September,
        SalesMetric::October,
        SalesMetric::November,
        SalesMetric::December,
        SalesMetric::TotalByYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SalesMetric::January => "january",
            SalesMetric::February => "february",
            SalesMetric::March => "march",
            SalesMetric::April => "april",
            SalesMetric::May => "may",
            SalesMetric::June => "june",
            SalesMetric::July => "july",
            SalesMetric::August => "august",
            SalesMetric::September => "september",
            SalesMetric::October => "october",
            SalesMetric::November => "november",
            SalesMetric::December => "december",
            SalesMetric::TotalByYear => "total_by_year",
        }
    }

    /// Calendar month (1-12); `None` for the yearly total.
    pub fn month_number(&self) -> Option<u32> {
        match self {
            SalesMetric::TotalByYear => None,
            month => Some(*month as u32 + 1),
        }
    }

    pub fn is_month(&self) -> bool {
        self.month_number().is_some()
    }

    /// Recognize a report header cell. Case-insensitive; `"Total By Year ..."` is a
    /// prefix match because the export appends the year list to that header.
    pub fn from_header(token: &str) -> Option<Self> {
        let normalized = crate::process::utils::canonical_key(token);
        if normalized.is_empty() {
            return None;
        }
        if normalized.starts_with("total by year") {
            return Some(SalesMetric::TotalByYear);
        }
        SalesMetric::ALL
            .iter()
            .copied()
            .filter(SalesMetric::is_month)
            .find(|m| m.as_str() == normalized)
    }
}

/// One (year, branch) observation of report 00134 in wide form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySalesWide {
    pub source_file: String,
    pub row_type: RowType,
    pub year: i32,
    pub branch: String,
    pub january: Option<f64>,
    pub february: Option<f64>,
    pub march: Option<f64>,
    pub april: Option<f64>,
    pub may: Option<f64>,
    pub june: Option<f64>,
    pub july: Option<f64>,
    pub august: Option<f64>,
    pub september: Option<f64>,
    pub october: Option<f64>,
    pub november: Option<f64>,
    pub december: Option<f64>,
    pub total_by_year: Option<f64>,
}

impl MonthlySalesWide {
    pub fn empty(source_file: &str, row_type: RowType, year: i32, branch: &str) -> Self {
        Self {
            source_file: source_file.to_string(),
            row_type,
            year,
            branch: branch.to_string(),
            january: None,
            february: None,
            march: None,
            april: None,
            may: None,
            june: None,
            july: None,
            august: None,
            september: None,
            october: None,
            november: None,
            december: None,
            total_by_year: None,
        }
    }

    pub fn get(&self, metric: SalesMetric) -> Option<f64> {
        match metric {
            SalesMetric::January => self.january,
            SalesMetric::February => self.february,
            SalesMetric::March => self.march,
            SalesMetric::April => self.april,
            SalesMetric::May => self.may,
            SalesMetric::June => self.june,
            SalesMetric::July => self.july,
            SalesMetric::August => self.august,
            SalesMetric::September => self.september,
            SalesMetric::October => self.october,
            SalesMetric::November => self.november,
            SalesMetric::December => self.december,
            SalesMetric::TotalByYear => self.total_by_year,
        }
    }

    pub fn set(&mut self, metric: SalesMetric, value: Option<f64>) {
        let slot = match metric {
            SalesMetric::January => &mut self.january,
            SalesMetric::February => &mut self.february,
            SalesMetric::March => &mut self.march,
            SalesMetric::April => &mut self.april,
            SalesMetric::May => &mut self.may,
            SalesMetric::June => &mut self.june,
            SalesMetric::July => &mut self.july,
            SalesMetric::August => &mut self.august,
            SalesMetric::September => &mut self.september,
            SalesMetric::October => &mut self.october,
            SalesMetric::November => &mut self.november,
            SalesMetric::December => &mut self.december,
            SalesMetric::TotalByYear => &mut self.total_by_year,
        };
        *slot = value;
    }
}

impl Table for MonthlySalesWide {
    const COLUMNS: &'static [&'static str] = &[
        "source_file",
        "row_type",
        "year",
        "branch",
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
        "total_by_year",
    ];

    fn row_type(&self) -> RowType {
        self.row_type
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Month,
    YearTotal,
}

/// One (year, branch, metric) observation of report 00134.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySalesLong {
    pub source_file: String,
    pub row_type: RowType,
    pub year: i32,
    pub branch: String,
    pub period: SalesMetric,
    pub period_type: PeriodType,
    pub month_number: Option<u32>,
    pub sales_amount: f64,
}

impl Table for MonthlySalesLong {
    const COLUMNS: &'static [&'static str] = &[
        "source_file",
        "row_type",
        "year",
        "branch",
        "period",
        "period_type",
        "month_number",
        "sales_amount",
    ];

    fn row_type(&self) -> RowType {
        self.row_type
    }
}

/// Two blocks of report 00134 disagreeing on the same observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConflict {
    pub year: i32,
    pub branch: String,
    pub metric: SalesMetric,
    pub first_value: f64,
    pub conflicting_value: f64,
}
