//! Vertical card display for stored projects.
//!
//! Renders a single-row project RecordBatch as a grouped, human-readable
//! card. Columns missing from the batch or null in it are left out.

use arrow::array::{Array, BooleanArray, LargeStringArray, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};

// ── Schema section groupings ──

const IDENTITY: &[&str] = &[
    "government_id",
    "cross_reference",
    "print_key",
    "term",
    "publication_key",
    "initiator",
    "document_type",
];

const STATUS: &[&str] = &[
    "phase",
    "link_method",
    "government_status",
    "passed",
    "publication_status",
    "in_force",
];

const DATES: &[&str] = &[
    "creation_date",
    "last_modified",
    "closure_date",
    "signature_date",
    "publication_date",
    "entry_into_force",
];

const LINKS: &[&str] = &["government_url", "parliament_url", "publication_url"];

const TIMESTAMPS: &[&str] = &["updated_at"];

// ── Public API ──

/// Print a single project row as a vertical card grouped by section.
pub fn print_project_card(batch: &RecordBatch) {
    for line in card_lines(batch) {
        println!("{line}");
    }
}

fn card_lines(batch: &RecordBatch) -> Vec<String> {
    let id = get_utf8(batch, "government_id").unwrap_or_default();
    let title = get_utf8(batch, "title").unwrap_or_default();

    let mut lines = vec![format!("=== {id} ===")];
    if !title.is_empty() {
        lines.push(title);
    }
    if let Some(description) = get_utf8(batch, "description") {
        lines.push(description);
    }
    lines.push(String::new());

    for (header, cols) in [
        ("Identity", IDENTITY),
        ("Status", STATUS),
        ("Dates", DATES),
        ("Links", LINKS),
        ("Timestamps", TIMESTAMPS),
    ] {
        section(batch, header, cols, &mut lines);
    }
    lines
}

// ── Section rendering ──

fn section(batch: &RecordBatch, header: &str, cols: &[&str], lines: &mut Vec<String>) {
    let values: Vec<(&str, String)> = cols
        .iter()
        .filter_map(|&col| cell(batch, col).map(|v| (col, v)))
        .collect();
    if values.is_empty() {
        return;
    }
    lines.push(header.to_string());
    for (col, value) in values {
        lines.push(format!("  {col:<20} {value}"));
    }
    lines.push(String::new());
}

/// First-row value of a column, formatted by type.
fn cell(batch: &RecordBatch, col_name: &str) -> Option<String> {
    let idx = batch.schema().index_of(col_name).ok()?;
    let col = batch.column(idx);
    if col.is_null(0) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => get_utf8(batch, col_name),
        DataType::Boolean => col
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map(|arr| if arr.value(0) { "yes" } else { "no" }.to_string()),
        _ => ArrayFormatter::try_new(col.as_ref(), &FormatOptions::default())
            .ok()
            .map(|fmt| fmt.value(0).to_string()),
    }
}

// ── Helpers ──

fn get_utf8(batch: &RecordBatch, col_name: &str) -> Option<String> {
    let idx = batch.schema().index_of(col_name).ok()?;
    let col = batch.column(idx);
    if col.is_null(0) {
        return None;
    }
    // Try Utf8 first, then LargeUtf8.
    if let Some(arr) = col.as_any().downcast_ref::<StringArray>() {
        return Some(arr.value(0).to_string());
    }
    if let Some(arr) = col.as_any().downcast_ref::<LargeStringArray>() {
        return Some(arr.value(0).to_string());
    }
    None
}
