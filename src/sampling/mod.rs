//! Choosing which postcodes to crawl

mod source;

pub use source::{load_postcodes, read_postcodes};

use crate::models::{PostcodeRecord, PostcodeSample};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Region '{region}' has only {available} postcodes but {requested} were requested")]
    InsufficientData {
        region: String,
        available: usize,
        requested: usize,
    },

    #[error("Failed to read postcode list {path}: {source}")]
    Source { path: String, source: csv::Error },
}

/// Draws `n` postcodes per region without replacement.
///
/// Regions listed in `excluded_regions` are skipped. Regions come out in the
/// order they are first seen in `master`, each region's postcodes in draw
/// order. Every region draws from a generator seeded with `seed`, so a fixed
/// seed reproduces the sample; `None` seeds from entropy.
pub fn sample(
    master: &[PostcodeRecord],
    excluded_regions: &[String],
    n: usize,
    seed: Option<u64>,
) -> Result<PostcodeSample, SamplingError> {
    let mut groups: Vec<(&str, Vec<&PostcodeRecord>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in master
        .iter()
        .filter(|r| !excluded_regions.contains(&r.region))
    {
        let slot = *index.entry(record.region.as_str()).or_insert_with(|| {
            groups.push((record.region.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(record);
    }

    let mut drawn = Vec::with_capacity(groups.len() * n);
    for (region, pool) in groups {
        if pool.len() < n {
            return Err(SamplingError::InsufficientData {
                region: region.to_string(),
                available: pool.len(),
                requested: n,
            });
        }

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        for i in rand::seq::index::sample(&mut rng, pool.len(), n).into_iter() {
            drawn.push(pool[i].clone());
        }
    }

    info!("Sampling {} postcodes in total", drawn.len());
    Ok(PostcodeSample::from_records(drawn))
}
