//! Final tidy-up of a scraped dataset

use crate::models::{Dataset, ListingRow};
use std::collections::HashSet;
use tracing::info;

/// Drops exact duplicate rows (keeping the first) and then rows with nothing
/// but a postcode. Each step logs how many rows it removed.
pub fn clean(data: Dataset) -> Dataset {
    if data.is_empty() {
        info!("No data collected, nothing to clean");
        return data;
    }

    let schema = data.schema().clone();
    let rows = data.into_rows();

    let before = rows.len();
    let mut seen: HashSet<ListingRow> = HashSet::with_capacity(before);
    let rows: Vec<ListingRow> = rows
        .into_iter()
        .filter(|row| seen.insert(row.clone()))
        .collect();
    report("duplicate", before, rows.len());

    let before = rows.len();
    let rows: Vec<ListingRow> = rows.into_iter().filter(|row| !row.is_blank()).collect();
    report("empty", before, rows.len());

    info!("{} rows left after cleaning", rows.len());
    Dataset::with_rows(schema, rows)
}

/// Share of rows removed, `None` when there was nothing to remove from
pub fn attrition(before: usize, after: usize) -> Option<f64> {
    (before > 0).then(|| (before - after.min(before)) as f64 / before as f64)
}

fn report(step: &str, before: usize, after: usize) {
    if let Some(share) = attrition(before, after) {
        info!(
            "Removed {} {} rows ({:.2}% attrition)",
            before - after,
            step,
            share * 100.0
        );
    }
}
