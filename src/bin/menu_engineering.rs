use anyhow::{Context, Result};
use clap::Parser;
use posclean::{
    analysis::menu::{build_menu_tables, BranchMenuRow, BranchSummaryRow, MenuItemRow, Quadrant},
    config::{report_files, PipelineConfig},
    tables::write_required,
};
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "menu_engineering")]
#[command(about = "Classify menu items into star / plowhorse / puzzle / dog quadrants")]
struct Args {
    /// Optional YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the clean tables (default: data/cleaned)
    #[arg(long)]
    cleaned_dir: Option<PathBuf>,

    /// Directory for report tables (default: reports)
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Overall table path (default: <reports-dir>/menu_engineering_overall.csv)
    #[arg(long)]
    overall_output: Option<PathBuf>,

    /// Per-branch table path (default: <reports-dir>/menu_engineering_by_branch.csv)
    #[arg(long)]
    branch_output: Option<PathBuf>,

    /// Branch summary path (default: <reports-dir>/menu_engineering_branch_summary.csv)
    #[arg(long)]
    summary_output: Option<PathBuf>,
}

fn ensure_parent(path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let config = PipelineConfig::load(args.config.as_deref())?.with_overrides(
        None,
        args.cleaned_dir,
        args.reports_dir,
    );
    let overall_path = args
        .overall_output
        .unwrap_or_else(|| config.report_path(report_files::MENU_OVERALL));
    let branch_path = args
        .branch_output
        .unwrap_or_else(|| config.report_path(report_files::MENU_BY_BRANCH));
    let summary_path = args
        .summary_output
        .unwrap_or_else(|| config.report_path(report_files::MENU_BRANCH_SUMMARY));

    let tables = build_menu_tables(&config.cleaned_dir)?;

    for path in [&overall_path, &branch_path, &summary_path] {
        ensure_parent(path)?;
    }
    write_required(&overall_path, MenuItemRow::COLUMNS, &tables.overall)?;
    write_required(&branch_path, BranchMenuRow::COLUMNS, &tables.by_branch)?;
    write_required(&summary_path, BranchSummaryRow::COLUMNS, &tables.branch_summary)?;

    info!(path = %overall_path.display(), rows = tables.overall.len(), "overall menu table");
    info!(path = %branch_path.display(), rows = tables.by_branch.len(), "branch menu table");
    info!(
        path = %summary_path.display(),
        rows = tables.branch_summary.len(),
        "branch summary table"
    );

    for row in tables
        .overall
        .iter()
        .filter(|r| r.quadrant == Quadrant::Star)
        .take(5)
    {
        info!(
            product = %row.product_desc,
            category = %row.category,
            division = %row.division,
            profit = row.total_profit,
            qty = row.qty,
            "top star by total profit"
        );
    }
    Ok(())
}
