//! Reading and writing the flat output tables.

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::process::records::Table;

/// Write `rows` to `path` as CSV under an explicit header.
///
/// The header is written even when `rows` is empty so downstream readers always
/// find the expected columns.
pub fn write_table<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<()> {
    let tmp_path = tmp_path_for(path);
    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        writer
            .write_record(columns)
            .with_context(|| format!("writing header of {}", path.display()))?;
        for row in rows {
            writer
                .serialize(row)
                .with_context(|| format!("writing row to {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("flushing {}", tmp_path.display()))?;
    }
    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
    debug!(path = %path.display(), rows = rows.len(), "table written");
    Ok(())
}

/// Write a clean dataset using its declared column order.
pub fn write_records<T: Table>(path: &Path, rows: &[T]) -> Result<()> {
    write_table(path, T::COLUMNS, rows)
}

/// Write a table that must not be empty.
pub fn write_required<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        bail!("no rows generated for {}", path.display());
    }
    write_table(path, columns, rows)
}

/// Read a clean table by column name.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize().enumerate() {
        let row: T =
            result.with_context(|| format!("decoding record {} of {}", idx, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Pretty-print `value` to `path` with a trailing newline, replacing any previous file.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp_path = tmp_path_for(path);
    let mut tmp = fs::File::create(&tmp_path)
        .with_context(|| format!("creating {}", tmp_path.display()))?;
    serde_json::to_writer_pretty(&mut tmp, value).context("serializing JSON")?;
    tmp.write_all(b"\n")?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
    Ok(())
}

/// Fail with one error naming every path in `paths` that does not exist.
pub fn ensure_exist(what: &str, paths: &[&Path]) -> Result<()> {
    let missing: Vec<String> = paths
        .iter()
        .filter(|p| !p.exists())
        .map(|p| p.display().to_string())
        .collect();
    if !missing.is_empty() {
        bail!("Missing {}: {}", what, missing.join(", "));
    }
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::records::{GroupSalesRecord, RowType};
    use tempfile::tempdir;

    fn group_row(qty: Option<f64>) -> GroupSalesRecord {
        GroupSalesRecord {
            source_file: "rep_s_00191_SMRY-3.csv".into(),
            row_type: RowType::Item,
            branch: Some("Stories Hamra".into()),
            division: None,
            group: Some("HOT".into()),
            description: Some("Latte, large".into()),
            barcode: None,
            qty,
            total_amount: Some(1250.5),
        }
    }

    #[test]
    fn records_survive_a_write_read_cycle() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("groups.csv");
        let rows = vec![group_row(Some(3.0)), group_row(None)];
        write_records(&path, &rows)?;

        let text = fs::read_to_string(&path)?;
        assert!(text.starts_with(
            "source_file,row_type,branch,division,group,description,barcode,qty,total_amount\n"
        ));
        assert!(text.contains(",item,"));

        let back: Vec<GroupSalesRecord> = read_table(&path)?;
        assert_eq!(back, rows);
        Ok(())
    }

    #[test]
    fn empty_tables_keep_their_header() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.csv");
        write_records::<GroupSalesRecord>(&path, &[])?;
        let text = fs::read_to_string(&path)?;
        assert_eq!(text.lines().count(), 1);
        Ok(())
    }

    #[test]
    fn required_tables_refuse_to_be_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("kpi.csv");
        let err = write_required::<GroupSalesRecord>(&path, &["a"], &[]).unwrap_err();
        assert!(err.to_string().contains("no rows"));
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn missing_paths_are_all_named() -> Result<()> {
        let dir = tempdir()?;
        let present = dir.path().join("present.csv");
        fs::write(&present, "x\n")?;
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");

        let err = ensure_exist("cleaned files", &[&a, &present, &b]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("a.csv"));
        assert!(msg.contains("b.csv"));
        assert!(!msg.contains("present.csv"));
        Ok(())
    }

    #[test]
    fn json_is_pretty_printed() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("report.json");
        write_json(&path, &serde_json::json!({"a": 1}))?;
        let text = fs::read_to_string(&path)?;
        assert!(text.contains("\"a\": 1"));
        assert!(text.ends_with('\n'));
        Ok(())
    }
}
