use anyhow::Result;
use clap::Parser;
use posclean::{config::PipelineConfig, pipeline::run_cleaning};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "posclean")]
#[command(about = "Normalize raw POS exports into clean tables and a cleaning report")]
struct Args {
    /// Optional YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the raw rep_s_*.csv exports (default: ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output directory for clean tables (default: <data-dir>/cleaned)
    #[arg(long)]
    cleaned_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) resolve config ───────────────────────────────────────────
    let config = PipelineConfig::load(args.config.as_deref())?.with_overrides(
        args.data_dir,
        args.cleaned_dir,
        None,
    );
    info!(
        data_dir = %config.data_dir.display(),
        cleaned_dir = %config.cleaned_dir.display(),
        "startup"
    );

    // ─── 3) clean ────────────────────────────────────────────────────
    let report = run_cleaning(&config)?;
    for (key, path) in &report.output_files {
        info!(table = %key, path = %path, "written");
    }
    let checks = &report.quality_checks;
    info!(
        branch_total_mismatches = checks.rep_00673_branch_total_mismatches.len(),
        year_total_mismatches = checks.rep_00134_total_by_year_mismatches.len(),
        merge_conflicts = checks.rep_00134_merge_conflicts.len(),
        "all done"
    );
    Ok(())
}
