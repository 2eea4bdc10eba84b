//! Branch KPIs and menu engineering, computed from the clean tables.

pub mod kpi;
pub mod menu;

use anyhow::Result;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::process::utils::normalize;
use crate::tables::read_table;

/// Read one clean table from `cleaned_dir`.
fn read_clean<T: DeserializeOwned>(cleaned_dir: &Path, file_name: &str) -> Result<Vec<T>> {
    read_table(&cleaned_dir.join(file_name))
}

/// Whitespace-normalized label, `""` when absent.
fn label(value: Option<&str>) -> String {
    value.map(normalize).unwrap_or_default()
}
