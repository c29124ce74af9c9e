//! One background thread per job.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chessclip_board::{BoardLocator, LocateBoard};

use crate::{
    ChessclipConfig, FrameSource, GameRecord, JobId, PipelineDriver, PipelineError, ProgressStore,
    ResultSink,
};

#[derive(thiserror::Error, Debug)]
pub enum JobError {
    #[error("failed to start job thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("job {0} panicked")]
    Panicked(JobId),
}

/// A running job.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    thread: JoinHandle<Result<GameRecord, PipelineError>>,
}

impl JobHandle {
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the job to end.
    pub fn join(self) -> Result<GameRecord, JobError> {
        match self.thread.join() {
            Ok(outcome) => Ok(outcome?),
            Err(_) => Err(JobError::Panicked(self.id)),
        }
    }
}

/// Starts independent jobs that share nothing but the progress store.
#[derive(Clone, Debug)]
pub struct JobRunner {
    store: Arc<ProgressStore>,
    config: ChessclipConfig,
}

impl JobRunner {
    pub fn new(store: Arc<ProgressStore>, config: ChessclipConfig) -> Self {
        Self { store, config }
    }

    #[inline]
    pub fn store(&self) -> &Arc<ProgressStore> {
        &self.store
    }

    /// Start a job with the contour board locator.
    pub fn spawn<S, R>(
        &self,
        id: impl Into<JobId>,
        source: S,
        results: R,
    ) -> Result<JobHandle, JobError>
    where
        S: FrameSource + Send + 'static,
        R: ResultSink + Send + 'static,
    {
        let locator = BoardLocator::new(self.config.locator.clone());
        self.spawn_with(id, locator, source, results)
    }

    /// Start a job with a custom locator. The job is registered as `queued`
    /// before its thread starts.
    pub fn spawn_with<L, S, R>(
        &self,
        id: impl Into<JobId>,
        locator: L,
        mut source: S,
        mut results: R,
    ) -> Result<JobHandle, JobError>
    where
        L: LocateBoard + Send + 'static,
        S: FrameSource + Send + 'static,
        R: ResultSink + Send + 'static,
    {
        let id = id.into();
        let mut progress = self.store.register(id.clone());
        let mut driver = PipelineDriver::new(locator, self.config.clone());
        let thread = thread::Builder::new()
            .name(format!("chessclip-{id}"))
            .spawn(move || driver.run(&mut source, &mut progress, &mut results))
            .map_err(JobError::Spawn)?;
        log::debug!("job {id} started");
        Ok(JobHandle { id, thread })
    }
}
