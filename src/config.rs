//! Where reports are read from and where tables are written.
//!
//! Precedence: built-in defaults, then an optional YAML file, then CLI flags.

use anyhow::{bail, Context, Result};
use glob::{glob_with, MatchOptions, Pattern};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// The four supported POS export layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportKind {
    ItemProfit,
    MonthlySales,
    SalesByGroup,
    CategoryProfit,
}

impl ReportKind {
    pub const ALL: [ReportKind; 4] = [
        ReportKind::ItemProfit,
        ReportKind::MonthlySales,
        ReportKind::SalesByGroup,
        ReportKind::CategoryProfit,
    ];

    /// Key used in the cleaning report.
    pub fn key(&self) -> &'static str {
        match self {
            ReportKind::ItemProfit => "rep_00014",
            ReportKind::MonthlySales => "rep_00134",
            ReportKind::SalesByGroup => "rep_00191",
            ReportKind::CategoryProfit => "rep_00673",
        }
    }

    /// Case-insensitive file-name pattern of the raw export.
    pub fn file_pattern(&self) -> &'static str {
        match self {
            ReportKind::ItemProfit => "rep_s_00014*.csv",
            ReportKind::MonthlySales => "rep_s_00134*.csv",
            ReportKind::SalesByGroup => "rep_s_00191*.csv",
            ReportKind::CategoryProfit => "rep_s_00673*.csv",
        }
    }
}

/// Output file names inside the cleaned directory.
pub mod clean_files {
    pub const ITEM_PROFIT: &str = "rep_00014_theoretical_profit_by_item_clean.csv";
    pub const SALES_BY_GROUP: &str = "rep_00191_sales_by_items_by_group_clean.csv";
    pub const CATEGORY_PROFIT: &str = "rep_00673_theoretical_profit_by_category_clean.csv";
    pub const MONTHLY_WIDE: &str = "rep_00134_comparative_monthly_sales_clean_wide.csv";
    pub const MONTHLY_LONG: &str = "rep_00134_comparative_monthly_sales_clean_long.csv";
    pub const CLEANING_REPORT: &str = "cleaning_report.json";
}

/// Output file names inside the reports directory.
pub mod report_files {
    pub const BRANCH_KPIS: &str = "branch_kpis.csv";
    pub const MENU_OVERALL: &str = "menu_engineering_overall.csv";
    pub const MENU_BY_BRANCH: &str = "menu_engineering_by_branch.csv";
    pub const MENU_BRANCH_SUMMARY: &str = "menu_engineering_branch_summary.csv";
}

/// Shape of the optional YAML config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub cleaned_dir: Option<PathBuf>,
    pub reports_dir: Option<PathBuf>,
    pub inputs: InputOverrides,
}

/// Explicit report paths that bypass file-name discovery.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputOverrides {
    pub rep_00014: Option<PathBuf>,
    pub rep_00134: Option<PathBuf>,
    pub rep_00191: Option<PathBuf>,
    pub rep_00673: Option<PathBuf>,
}

impl InputOverrides {
    pub fn get(&self, kind: ReportKind) -> Option<&PathBuf> {
        match kind {
            ReportKind::ItemProfit => self.rep_00014.as_ref(),
            ReportKind::MonthlySales => self.rep_00134.as_ref(),
            ReportKind::SalesByGroup => self.rep_00191.as_ref(),
            ReportKind::CategoryProfit => self.rep_00673.as_ref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub cleaned_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub inputs: InputOverrides,
    /// Set once `cleaned_dir` comes from the file or a flag rather than `data_dir`.
    cleaned_dir_explicit: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            cleaned_dir: PathBuf::from("data/cleaned"),
            reports_dir: PathBuf::from("reports"),
            inputs: InputOverrides::default(),
            cleaned_dir_explicit: false,
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with the YAML file at `path`, when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = path {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let file: FileConfig = serde_yaml::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?;
            config.apply_file(file);
            info!(config = %path.display(), "loaded config file");
        }
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        self.set_dirs(file.data_dir, file.cleaned_dir);
        if let Some(dir) = file.reports_dir {
            self.reports_dir = dir;
        }
        self.inputs = file.inputs;
    }

    /// A new `data_dir` moves `cleaned_dir` along unless one was given explicitly.
    fn set_dirs(&mut self, data_dir: Option<PathBuf>, cleaned_dir: Option<PathBuf>) {
        if let Some(dir) = cleaned_dir {
            self.cleaned_dir = dir;
            self.cleaned_dir_explicit = true;
        }
        if let Some(dir) = data_dir {
            if !self.cleaned_dir_explicit {
                self.cleaned_dir = dir.join("cleaned");
            }
            self.data_dir = dir;
        }
    }

    /// Apply CLI flags on top of the loaded config.
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        cleaned_dir: Option<PathBuf>,
        reports_dir: Option<PathBuf>,
    ) -> Self {
        self.set_dirs(data_dir, cleaned_dir);
        if let Some(dir) = reports_dir {
            self.reports_dir = dir;
        }
        self
    }

    /// Locate all four raw reports, failing once with every missing one named.
    pub fn resolve_inputs(&self) -> Result<BTreeMap<ReportKind, PathBuf>> {
        let mut found = BTreeMap::new();
        let mut missing = Vec::new();

        for kind in ReportKind::ALL {
            match self.locate(kind)? {
                Some(path) => {
                    found.insert(kind, path);
                }
                None => missing.push(self.expected_path(kind).display().to_string()),
            }
        }

        if !missing.is_empty() {
            bail!("Missing input files: {}", missing.join(", "));
        }
        Ok(found)
    }

    fn expected_path(&self, kind: ReportKind) -> PathBuf {
        self.inputs
            .get(kind)
            .cloned()
            .unwrap_or_else(|| self.data_dir.join(kind.file_pattern()))
    }

    fn locate(&self, kind: ReportKind) -> Result<Option<PathBuf>> {
        if let Some(path) = self.inputs.get(kind) {
            return Ok(path.exists().then(|| path.clone()));
        }

        let dir = Pattern::escape(&self.data_dir.to_string_lossy());
        let pattern = Path::new(&dir).join(kind.file_pattern());
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::default()
        };
        let mut matches: Vec<PathBuf> = glob_with(&pattern.to_string_lossy(), options)
            .with_context(|| format!("Failed to read glob pattern '{}'", pattern.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .collect();
        matches.sort();

        if matches.len() > 1 {
            warn!(
                report = kind.key(),
                candidates = matches.len(),
                chosen = %matches[0].display(),
                "several files match; using the first"
            );
        }
        Ok(matches.into_iter().next())
    }

    pub fn clean_path(&self, file_name: &str) -> PathBuf {
        self.cleaned_dir.join(file_name)
    }

    pub fn report_path(&self, file_name: &str) -> PathBuf {
        self.reports_dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cli_overrides_beat_defaults() {
        let config = PipelineConfig::default().with_overrides(Some("in".into()), None, None);
        assert_eq!(config.data_dir, PathBuf::from("in"));
        assert_eq!(config.cleaned_dir, PathBuf::from("in/cleaned"));

        let config = PipelineConfig::default().with_overrides(
            Some("in".into()),
            Some("out".into()),
            Some("rep".into()),
        );
        assert_eq!(config.cleaned_dir, PathBuf::from("out"));
        assert_eq!(config.reports_dir, PathBuf::from("rep"));
    }

    #[test]
    fn yaml_file_is_applied() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("posclean.yaml");
        fs::write(
            &path,
            "data_dir: /srv/pos\nreports_dir: /srv/out\ninputs:\n  rep_00134: /tmp/monthly.csv\n",
        )?;
        let config = PipelineConfig::load(Some(&path))?;
        assert_eq!(config.data_dir, PathBuf::from("/srv/pos"));
        assert_eq!(config.cleaned_dir, PathBuf::from("/srv/pos/cleaned"));
        assert_eq!(config.reports_dir, PathBuf::from("/srv/out"));
        assert_eq!(
            config.inputs.get(ReportKind::MonthlySales),
            Some(&PathBuf::from("/tmp/monthly.csv"))
        );
        Ok(())
    }

    #[test]
    fn yaml_cleaned_dir_survives_cli_data_dir() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("posclean.yaml");
        fs::write(&path, "cleaned_dir: /explicit/cleaned\n")?;

        let config =
            PipelineConfig::load(Some(&path))?.with_overrides(Some("in".into()), None, None);
        assert_eq!(config.data_dir, PathBuf::from("in"));
        assert_eq!(config.cleaned_dir, PathBuf::from("/explicit/cleaned"));

        let config = PipelineConfig::load(Some(&path))?.with_overrides(
            Some("in".into()),
            Some("out".into()),
            None,
        );
        assert_eq!(config.cleaned_dir, PathBuf::from("out"));
        Ok(())
    }

    #[test]
    fn unknown_yaml_keys_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "data_directory: x\n")?;
        assert!(PipelineConfig::load(Some(&path)).is_err());
        Ok(())
    }

    #[test]
    fn reports_are_found_case_insensitively() -> Result<()> {
        let dir = tempdir()?;
        for name in [
            "rep_s_00014_SMRY.csv",
            "REP_S_00134_SMRY.csv",
            "rep_s_00191_SMRY-3.csv",
            "rep_s_00673_SMRY.csv",
        ] {
            fs::write(dir.path().join(name), "")?;
        }
        let config = PipelineConfig::default().with_overrides(Some(dir.path().into()), None, None);
        let inputs = config.resolve_inputs()?;
        assert_eq!(inputs.len(), 4);
        assert!(inputs[&ReportKind::MonthlySales].ends_with("REP_S_00134_SMRY.csv"));
        Ok(())
    }

    #[test]
    fn glob_characters_in_data_dir_are_literal() -> Result<()> {
        let root = tempdir()?;
        let dir = root.path().join("pos [march]");
        fs::create_dir(&dir)?;
        for name in [
            "rep_s_00014_SMRY.csv",
            "rep_s_00134_SMRY.csv",
            "rep_s_00191_SMRY.csv",
            "rep_s_00673_SMRY.csv",
        ] {
            fs::write(dir.join(name), "")?;
        }
        let config = PipelineConfig::default().with_overrides(Some(dir.clone()), None, None);
        let inputs = config.resolve_inputs()?;
        assert_eq!(inputs[&ReportKind::ItemProfit], dir.join("rep_s_00014_SMRY.csv"));
        Ok(())
    }

    #[test]
    fn every_missing_report_is_named() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("rep_s_00014_SMRY.csv"), "")?;
        let config = PipelineConfig::default().with_overrides(Some(dir.path().into()), None, None);
        let msg = config.resolve_inputs().unwrap_err().to_string();
        assert!(msg.contains("rep_s_00134*.csv"));
        assert!(msg.contains("rep_s_00191*.csv"));
        assert!(msg.contains("rep_s_00673*.csv"));
        assert!(!msg.contains("rep_s_00014"));
        Ok(())
    }
}
