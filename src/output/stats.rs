//! Statistics over stored records
//!
//! This module summarizes a set of stored records for display.

use crate::storage::StoredRecord;

/// Aggregate view of a set of records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStatistics {
    pub total: usize,

    /// Average discounted price over records that have one
    pub average_price: Option<f64>,

    /// Average rating over records that have one
    pub average_rating: Option<f64>,

    /// Average discount in percent over records with both prices
    pub average_discount_pct: Option<f64>,

    pub total_reviews: i64,
}

/// Computes statistics for a set of stored records
pub fn compute_statistics(rows: &[StoredRecord]) -> RecordStatistics {
    let prices: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.record.price_after_discount)
        .collect();
    let ratings: Vec<f64> = rows.iter().filter_map(|r| r.record.rating).collect();
    let discounts: Vec<f64> = rows
        .iter()
        .filter_map(|r| match (r.record.price_before_discount, r.record.price_after_discount) {
            (Some(before), Some(after)) if before > 0.0 => Some((before - after) / before * 100.0),
            _ => None,
        })
        .collect();

    RecordStatistics {
        total: rows.len(),
        average_price: mean(&prices),
        average_rating: mean(&ratings),
        average_discount_pct: mean(&discounts),
        total_reviews: rows.iter().filter_map(|r| r.record.review_count).sum(),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Prints statistics to the console
pub fn print_statistics(stats: &RecordStatistics) {
    println!("=== Record Statistics ===\n");
    println!("  Records: {}", stats.total);
    if let Some(price) = stats.average_price {
        println!("  Average price: {:.2}", price);
    }
    if let Some(rating) = stats.average_rating {
        println!("  Average rating: {:.2}", rating);
    }
    if let Some(discount) = stats.average_discount_pct {
        println!("  Average discount: {:.1}%", discount);
    }
    println!("  Total reviews: {}", stats.total_reviews);
}
