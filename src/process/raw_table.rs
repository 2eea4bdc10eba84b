use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::{fs, path::Path};
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone)]
pub struct RawTable {
    /// File name used as `source_file` on every record parsed from this table.
    pub source_file: String,
    /// Each CSV record, cells trimmed, in file order. Records keep their own width.
    pub rows: Vec<Vec<String>>,
}

/// Read a whole report export into memory.
///
/// A leading byte-order marker is dropped and records may have any number of fields.
#[tracing::instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_report<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let path = path.as_ref();
    let data =
        fs::read(path).with_context(|| format!("Failed to read report {}", path.display()))?;
    let body = data.strip_prefix(UTF8_BOM).unwrap_or(&data);

    let rows = parse_csv_rows(body).with_context(|| format!("parsing {}", path.display()))?;
    debug!(rows = rows.len(), "loaded report");

    let source_file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(RawTable { source_file, rows })
}

/// Split raw CSV bytes into trimmed string rows.
///
/// Blank lines come back as empty rows, so `rows.len()` counts every physical record.
pub fn parse_csv_rows(data: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    let mut next_line: u64 = 1;
    for (idx, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        if let Some(pos) = record.position() {
            // the reader skips empty lines; fill the gap
            while next_line < pos.line() {
                rows.push(Vec::new());
                next_line += 1;
            }
            let embedded: u64 = record.iter().map(|c| c.matches('\n').count() as u64).sum();
            next_line = pos.line() + 1 + embedded;
        }
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }

    let total_lines = line_count(data);
    while next_line <= total_lines {
        rows.push(Vec::new());
        next_line += 1;
    }
    Ok(rows)
}

fn line_count(data: &[u8]) -> u64 {
    let breaks = data.iter().filter(|&&b| b == b'\n').count() as u64;
    match data.last() {
        Some(b'\n') | None => breaks,
        Some(_) => breaks + 1,
    }
}
