//! Job progress reporting.
//!
//! Each job writes its own entry; any number of readers may poll the store
//! concurrently.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

pub type JobId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Initializing,
    Working,
    Done,
    Error,
}

impl JobStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

/// `{progress: 0-100, status, message?}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub progress: u8,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressUpdate {
    fn new(progress: u8, status: JobStatus) -> Self {
        Self {
            progress: progress.min(100),
            status,
            message: None,
        }
    }

    pub fn queued() -> Self {
        Self::new(0, JobStatus::Queued)
    }

    pub fn initializing() -> Self {
        Self::new(0, JobStatus::Initializing)
    }

    pub fn working(progress: u8) -> Self {
        Self::new(progress, JobStatus::Working)
    }

    pub fn done() -> Self {
        Self::new(100, JobStatus::Done)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(100, JobStatus::Error)
        }
    }
}

/// Receives the progress of one job.
pub trait ProgressSink {
    fn report(&mut self, update: ProgressUpdate);
}

/// Discards every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _update: ProgressUpdate) {}
}

/// Keeps every update in order.
impl ProgressSink for Vec<ProgressUpdate> {
    fn report(&mut self, update: ProgressUpdate) {
        self.push(update);
    }
}

/// Latest update per job.
#[derive(Debug, Default)]
pub struct ProgressStore {
    entries: RwLock<HashMap<JobId, ProgressUpdate>>,
}

impl ProgressStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a `queued` entry for `id` and return its writer handle.
    pub fn register(self: &Arc<Self>, id: impl Into<JobId>) -> JobProgress {
        let id = id.into();
        self.set(&id, ProgressUpdate::queued());
        JobProgress {
            store: Arc::clone(self),
            id,
        }
    }

    pub fn get(&self, id: &str) -> Option<ProgressUpdate> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn snapshot(&self) -> HashMap<JobId, ProgressUpdate> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn remove(&self, id: &str) -> Option<ProgressUpdate> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    fn set(&self, id: &str, update: ProgressUpdate) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), update);
    }
}

/// Writer for a single job's entry.
#[derive(Debug)]
pub struct JobProgress {
    store: Arc<ProgressStore>,
    id: JobId,
}

impl JobProgress {
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl ProgressSink for JobProgress {
    fn report(&mut self, update: ProgressUpdate) {
        log::trace!("job {}: {:?} {}%", self.id, update.status, update.progress);
        self.store.set(&self.id, update);
    }
}
