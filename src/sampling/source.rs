use crate::models::PostcodeRecord;
use crate::sampling::SamplingError;
use serde::Deserialize;
use std::io;
use std::path::Path;
use tracing::info;

/// One line of the postcode list.
///
/// Older exports name the columns `region_gpt` and `country_string`.
#[derive(Debug, Clone, Deserialize)]
struct SourceRecord {
    postcode: String,
    #[serde(alias = "region_gpt")]
    region: String,
    #[serde(alias = "country_string", default)]
    country: String,
}

/// Loads the postcode list at `path`, dropping excluded countries
pub fn load_postcodes(
    path: &Path,
    excluded_countries: &[String],
) -> Result<Vec<PostcodeRecord>, SamplingError> {
    let file = std::fs::File::open(path).map_err(|e| SamplingError::Source {
        path: path.display().to_string(),
        source: csv::Error::from(e),
    })?;
    read_postcodes(file, excluded_countries).map_err(|e| match e {
        SamplingError::Source { source, .. } => SamplingError::Source {
            path: path.display().to_string(),
            source,
        },
        other => other,
    })
}

/// Reads a postcode list from CSV. Rows with a blank postcode are skipped.
pub fn read_postcodes<R: io::Read>(
    reader: R,
    excluded_countries: &[String],
) -> Result<Vec<PostcodeRecord>, SamplingError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.deserialize::<SourceRecord>() {
        let record = result.map_err(|source| SamplingError::Source {
            path: "<input>".to_string(),
            source,
        })?;
        let postcode = record.postcode.trim();
        if postcode.is_empty() {
            continue;
        }
        if excluded_countries.iter().any(|c| c == record.country.trim()) {
            dropped += 1;
            continue;
        }
        records.push(PostcodeRecord::new(postcode, record.region.trim()));
    }

    info!(
        "Removed the following countries from the sample: {:?} ({} postcodes)",
        excluded_countries, dropped
    );
    Ok(records)
}
