//! Crawl checkpoints on disk
//!
//! A checkpoint is two files sharing a timestamp id: the rows collected so
//! far (`Data/data_<id>.csv`) and the cursors plus everything needed to read
//! those rows back (`Params/params_<id>.json`). Both must be present and
//! consistent for a checkpoint to load.

use crate::crawl::CrawlState;
use crate::models::{table, PostcodeSample, Schema};
use crate::timing::timestamp_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Version of the params file layout
pub const PARAMS_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint {id} is corrupt: {reason}")]
    Corrupt { id: CheckpointId, reason: String },

    #[error("Invalid checkpoint id {0:?}: expected YYYYMMDDHHMMSS")]
    InvalidId(String),

    #[error("Failed to write checkpoint file {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },
}

/// Timestamp naming a checkpoint, `YYYYMMDDHHMMSS`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CheckpointId(String);

impl CheckpointId {
    pub fn now() -> Self {
        Self(timestamp_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CheckpointId {
    type Err = CheckpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == 14 && s.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(CheckpointError::InvalidId(s.to_string()))
        }
    }
}

impl TryFrom<String> for CheckpointId {
    type Error = CheckpointError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CheckpointId> for String {
    fn from(id: CheckpointId) -> Self {
        id.0
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contents of the params file
#[derive(Debug, Serialize, Deserialize)]
struct CheckpointParams {
    version: u32,
    checkpoint_id: CheckpointId,
    saved_at: DateTime<Utc>,
    run_attempt_count: u32,
    region_index: usize,
    postcode_index: usize,
    page_index: u32,
    completion: f64,
    row_count: usize,
    columns: Schema,
    sample: PostcodeSample,
}

impl CheckpointParams {
    fn capture(id: &CheckpointId, state: &CrawlState) -> Self {
        Self {
            version: PARAMS_VERSION,
            checkpoint_id: id.clone(),
            saved_at: Utc::now(),
            run_attempt_count: state.run_attempt_count,
            region_index: state.region_index,
            postcode_index: state.postcode_index,
            page_index: state.page_index,
            completion: state.completion,
            row_count: state.data.len(),
            columns: state.data.schema().clone(),
            sample: state.sample.clone(),
        }
    }

    /// Cursor sanity: anything failing here means the file was not written by us
    fn check(&self) -> Result<(), String> {
        if self.version != PARAMS_VERSION {
            return Err(format!(
                "unsupported params version {} (expected {})",
                self.version, PARAMS_VERSION
            ));
        }
        if !(0.0..=1.0).contains(&self.completion) {
            return Err(format!("completion {} outside [0, 1]", self.completion));
        }
        if self.page_index < CrawlState::FIRST_PAGE {
            return Err(format!("page index {} below first page", self.page_index));
        }
        let regions = self.sample.regions();
        if self.region_index > regions.len() {
            return Err(format!(
                "region index {} beyond {} sampled regions",
                self.region_index,
                regions.len()
            ));
        }
        if let Some(group) = regions.get(self.region_index) {
            if self.postcode_index >= group.postcodes.len() {
                return Err(format!(
                    "postcode index {} beyond {} postcodes in {}",
                    self.postcode_index,
                    group.postcodes.len(),
                    group.region
                ));
            }
        }
        Ok(())
    }
}

/// Saves and restores crawl state under `<root>/Data` and `<root>/Params`
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    root: PathBuf,
}

impl CheckpointManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data_path(&self, id: &CheckpointId) -> PathBuf {
        self.root.join("Data").join(format!("data_{}.csv", id))
    }

    pub fn params_path(&self, id: &CheckpointId) -> PathBuf {
        self.root.join("Params").join(format!("params_{}.json", id))
    }

    /// Writes `state` under a fresh timestamp id
    pub fn save(&self, state: &CrawlState) -> Result<CheckpointId, CheckpointError> {
        let id = CheckpointId::now();
        self.save_as(&id, state)?;
        Ok(id)
    }

    /// Writes `state` under `id`, replacing any checkpoint with that id
    pub fn save_as(&self, id: &CheckpointId, state: &CrawlState) -> Result<(), CheckpointError> {
        let data_path = self.data_path(id);
        let file = create_file(&data_path)?;
        table::write_csv(&state.data, BufWriter::new(file)).map_err(|e| CheckpointError::Write {
            path: data_path.clone(),
            reason: e.to_string(),
        })?;
        info!("Data successfully cached in: {}", data_path.display());

        let params_path = self.params_path(id);
        let params = CheckpointParams::capture(id, state);
        let mut writer = BufWriter::new(create_file(&params_path)?);
        serde_json::to_writer_pretty(&mut writer, &params)
            .map_err(|e| e.to_string())
            .and_then(|()| writer.flush().map_err(|e| e.to_string()))
            .map_err(|reason| CheckpointError::Write {
                path: params_path.clone(),
                reason,
            })?;
        info!(
            "Current parameters successfully cached in: {}",
            params_path.display()
        );

        Ok(())
    }

    /// Reads the checkpoint `id` back into a crawl state
    pub fn load(&self, id: &CheckpointId) -> Result<CrawlState, CheckpointError> {
        let corrupt = |reason: String| CheckpointError::Corrupt {
            id: id.clone(),
            reason,
        };

        let params_path = self.params_path(id);
        let raw = fs::read_to_string(&params_path)
            .map_err(|e| corrupt(format!("cannot read {}: {}", params_path.display(), e)))?;
        let params: CheckpointParams = serde_json::from_str(&raw)
            .map_err(|e| corrupt(format!("params file unreadable: {}", e)))?;
        if params.checkpoint_id != *id {
            return Err(corrupt(format!(
                "params file belongs to checkpoint {}",
                params.checkpoint_id
            )));
        }
        params.check().map_err(&corrupt)?;

        let data_path = self.data_path(id);
        let file = File::open(&data_path)
            .map_err(|e| corrupt(format!("cannot read {}: {}", data_path.display(), e)))?;
        let data = table::read_csv(&params.columns, BufReader::new(file))
            .map_err(|e| corrupt(format!("data file unreadable: {}", e)))?;
        if data.len() != params.row_count {
            return Err(corrupt(format!(
                "expected {} rows, found {}",
                params.row_count,
                data.len()
            )));
        }

        info!("Cache with ID {} successfully retrieved and unpacked", id);
        Ok(CrawlState {
            run_attempt_count: params.run_attempt_count,
            region_index: params.region_index,
            postcode_index: params.postcode_index,
            page_index: params.page_index,
            completion: params.completion,
            sample: params.sample,
            data,
        })
    }
}

fn create_file(path: &Path) -> Result<File, CheckpointError> {
    let write_error = |e: std::io::Error| CheckpointError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(write_error)?;
    }
    File::create(path).map_err(write_error)
}
