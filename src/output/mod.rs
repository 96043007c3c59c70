//! Output module for terminal rendering
//!
//! This module handles:
//! - Printing ingestion reports
//! - Printing resolved category parameters
//! - Listing stored records and their statistics

pub mod stats;

pub use stats::{compute_statistics, print_statistics, RecordStatistics};

use crate::resolver::CategoryParams;
use crate::service::IngestReport;
use crate::storage::StoredRecord;

/// Formats an ingestion report as a single status line
pub fn format_report(report: &IngestReport) -> String {
    if report.success {
        format!("OK: {} records. {}", report.record_count, report.message)
    } else {
        format!("FAILED: {}", report.message)
    }
}

/// Formats resolved category parameters
pub fn format_params(url: &str, params: &CategoryParams) -> String {
    let mut out = String::new();
    out.push_str(&format!("URL:      {}\n", url));
    out.push_str(&format!("Method:   {}\n", params.method));
    if let Some(id) = params.category_id {
        out.push_str(&format!("Category: {}\n", id));
    }
    out.push_str(&format!("Shard:    {}\n", params.shard.as_deref().unwrap_or("-")));
    out.push_str(&format!("Query:    {}\n", params.query.as_deref().unwrap_or("-")));
    out.push_str(&format!(
        "Complete: {}\n",
        if params.is_complete() { "yes" } else { "no" }
    ));
    out
}

/// Formats stored records as a fixed-width table
pub fn format_records(rows: &[StoredRecord]) -> String {
    let mut out = format!(
        "{:<40} {:>10} {:>10} {:>6} {:>8}  {}\n",
        "Name", "Price", "Discount", "Rating", "Reviews", "Stored"
    );

    for row in rows {
        let record = &row.record;
        out.push_str(&format!(
            "{:<40} {:>10} {:>10} {:>6} {:>8}  {}\n",
            truncate(record.name.as_deref().unwrap_or("-"), 40),
            money(record.price_before_discount),
            money(record.price_after_discount),
            record.rating.map_or("-".to_string(), |r| format!("{:.1}", r)),
            record.review_count.map_or("-".to_string(), |n| n.to_string()),
            row.created_at
                .map_or("-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
        ));
    }

    out
}

fn money(value: Option<f64>) -> String {
    value.map_or("-".to_string(), |v| format!("{:.2}", v))
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width - 1).collect();
        cut.push('…');
        cut
    }
}

/// Prints an ingestion report to the console
pub fn print_report(report: &IngestReport) {
    println!("{}", format_report(report));
}

/// Prints resolved category parameters to the console
pub fn print_params(url: &str, params: &CategoryParams) {
    print!("{}", format_params(url, params));
}

/// Prints stored records followed by their statistics
pub fn print_records(rows: &[StoredRecord]) {
    if rows.is_empty() {
        println!("No stored records.");
        return;
    }
    print!("{}", format_records(rows));
    println!();
    print_statistics(&compute_statistics(rows));
}
