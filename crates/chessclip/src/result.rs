//! Final job payload and where it goes.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::GameRecord;

#[derive(thiserror::Error, Debug)]
pub enum ResultSinkError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// `{status: "done", moves, pgn}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub status: String,
    pub moves: Vec<String>,
    pub pgn: String,
}

impl From<&GameRecord> for JobResult {
    fn from(record: &GameRecord) -> Self {
        Self {
            status: "done".to_string(),
            moves: record.moves.clone(),
            pgn: record.pgn.clone(),
        }
    }
}

/// Receives the result of a finished job.
pub trait ResultSink {
    fn publish(&mut self, result: &JobResult) -> Result<(), ResultSinkError>;
}

impl ResultSink for Vec<JobResult> {
    fn publish(&mut self, result: &JobResult) -> Result<(), ResultSinkError> {
        self.push(result.clone());
        Ok(())
    }
}

/// Writes the result as JSON to a fixed path.
#[derive(Clone, Debug)]
pub struct JsonResultWriter {
    path: PathBuf,
}

impl JsonResultWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `result.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join("result.json"))
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for JsonResultWriter {
    fn publish(&mut self, result: &JobResult) -> Result<(), ResultSinkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(result)?)?;
        log::info!("wrote {}", self.path.display());
        Ok(())
    }
}
