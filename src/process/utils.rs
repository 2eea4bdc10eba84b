use once_cell::sync::Lazy;
use regex::Regex;

static DATE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}-[A-Za-z]{3}-\d{2,4}$").expect("valid date regex"));

/// Strip and collapse every internal whitespace run to a single space.
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lower-cased, whitespace-collapsed form used to join rows across reports.
pub fn canonical_key(raw: &str) -> String {
    normalize(raw).to_lowercase()
}

/// Parse a locale-formatted number such as `"1,234.50"`.
///
/// Returns `None` for empty or non-numeric cells; never errors.
pub fn parse_number(raw: &str) -> Option<f64> {
    let text = normalize(raw).replace(',', "");
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `D-MMM-YY` / `DD-MMM-YYYY` banner dates.
pub fn is_date_token(raw: &str) -> bool {
    DATE_TOKEN.is_match(raw)
}

pub fn has_content<S: AsRef<str>>(row: &[S]) -> bool {
    row.iter().any(|cell| !normalize(cell.as_ref()).is_empty())
}

/// Right-pad `row` with empty cells up to `width`. Longer rows are returned untouched.
pub fn pad_row(row: &[String], width: usize) -> Vec<String> {
    let mut padded = row.to_vec();
    if padded.len() < width {
        padded.resize(width, String::new());
    }
    padded
}

/// Case-insensitive prefix test on an already-trimmed cell.
pub fn starts_with_ci(cell: &str, prefix: &str) -> bool {
    cell.to_lowercase().starts_with(prefix)
}

/// Text after the first `:`, trimmed; `None` when absent or empty.
pub fn inline_label(cell: &str) -> Option<String> {
    cell.split_once(':')
        .map(|(_, rest)| rest.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Empty strings become `None`.
pub fn non_empty(cell: &str) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}
