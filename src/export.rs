//! Writing the final dataset

use crate::models::{table, Dataset, TableError};
use crate::operator::{Intervention, OperatorIntervention};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to create {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: TableError },
}

/// Writes cleaned datasets as `<dir>/rightmove_data_<run id>.csv`
pub struct Exporter<'a> {
    dir: PathBuf,
    operator: &'a dyn OperatorIntervention,
}

impl<'a> Exporter<'a> {
    pub fn new(dir: impl Into<PathBuf>, operator: &'a dyn OperatorIntervention) -> Self {
        Self {
            dir: dir.into(),
            operator,
        }
    }

    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("rightmove_data_{}.csv", run_id))
    }

    /// Writes `data` once. An empty dataset writes nothing and returns `None`.
    ///
    /// A failed write (often the file is open elsewhere) is put to the
    /// operator, who can fix it and retry or give up.
    pub fn export(&self, data: &Dataset, run_id: &str) -> Result<Option<PathBuf>, ExportError> {
        if data.is_empty() {
            warn!("Dataset is empty, nothing exported");
            return Ok(None);
        }

        let path = self.path_for(run_id);
        loop {
            match write_file(data, &path) {
                Ok(()) => {
                    info!("Exported {} rows to {}", data.len(), path.display());
                    return Ok(Some(path));
                }
                Err(e) => {
                    warn!("{}", e);
                    let problem = format!(
                        "Could not write {}. Close any program using it.",
                        path.display()
                    );
                    match self.operator.intervene(&problem) {
                        Intervention::Retry => continue,
                        Intervention::Abort => return Err(e),
                    }
                }
            }
        }
    }
}

fn write_file(data: &Dataset, path: &Path) -> Result<(), ExportError> {
    let io_error = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_error)?;
    }
    let file = File::create(path).map_err(io_error)?;
    table::write_csv(data, BufWriter::new(file)).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldSpec, ListingRow, POSTCODE_COLUMN};
    use crate::testing::ScriptedOperator;
    use tempfile::TempDir;

    fn data() -> Dataset {
        Dataset::with_rows(
            FieldSpec::default().schema(),
            vec![ListingRow::new()
                .with(POSTCODE_COLUMN, Some("E1 6AN".into()))
                .with("property_type", Some("Flat".into()))],
        )
    }

    #[test]
    fn test_writes_named_csv() {
        let dir = TempDir::new().unwrap();
        let operator = ScriptedOperator::always(Intervention::Abort);
        let exporter = Exporter::new(dir.path(), &operator);

        let path = exporter.export(&data(), "20230411000133").unwrap().unwrap();

        assert_eq!(path, dir.path().join("rightmove_data_20230411000133.csv"));
        let back = table::read_csv(data().schema(), File::open(&path).unwrap()).unwrap();
        assert_eq!(back, data());
        assert_eq!(operator.prompts(), 0);
    }

    #[test]
    fn test_empty_dataset_is_not_written() {
        let dir = TempDir::new().unwrap();
        let operator = ScriptedOperator::always(Intervention::Abort);
        let exporter = Exporter::new(dir.path(), &operator);

        let empty = Dataset::new(FieldSpec::default().schema());
        assert_eq!(exporter.export(&empty, "20230411000133").unwrap(), None);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_write_asks_the_operator() {
        let dir = TempDir::new().unwrap();
        // A directory squatting on the export path makes every write fail
        let operator = ScriptedOperator::with_responses([Intervention::Retry], Intervention::Abort);
        let exporter = Exporter::new(dir.path(), &operator);
        fs::create_dir(exporter.path_for("20230411000133")).unwrap();

        let err = exporter.export(&data(), "20230411000133").unwrap_err();

        assert!(matches!(err, ExportError::Io { .. }));
        assert_eq!(operator.prompts(), 2);
    }
}
