use anyhow::{Context, Result};
use clap::Parser;
use posclean::{
    analysis::kpi::{build_branch_kpis, BranchKpi},
    config::{report_files, PipelineConfig},
    tables::write_required,
};
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "branch_kpi")]
#[command(about = "Build the branch-level KPI table from the clean tables")]
struct Args {
    /// Optional YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the clean tables (default: data/cleaned)
    #[arg(long)]
    cleaned_dir: Option<PathBuf>,

    /// Output CSV path (default: <reports-dir>/branch_kpis.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for report tables (default: reports)
    #[arg(long)]
    reports_dir: Option<PathBuf>,
}

fn show(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
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
    let output = args
        .output
        .unwrap_or_else(|| config.report_path(report_files::BRANCH_KPIS));

    let rows = build_branch_kpis(&config.cleaned_dir)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    write_required(&output, BranchKpi::COLUMNS, &rows)?;

    info!(path = %output.display(), branches = rows.len(), "KPI table generated");
    for row in rows.iter().take(5) {
        info!(
            branch = %row.branch,
            profit = %show(row.total_profit_2025),
            margin_pct = %show(row.profit_margin_pct_2025),
            jan_yoy_pct = %show(row.jan_yoy_growth_pct),
            "top branch by total profit"
        );
    }
    Ok(())
}
