//! Frame sampling and the per-job state machine.
//!
//! `SeekingBoard` samples the start of the video until the board is located
//! once; that observation becomes the reference grid. `Tracking` rewinds and
//! runs locate → occupancy → binarize → diff → legality on every sampled
//! frame until the source is exhausted. `Done` publishes the moves and the
//! transcript; `Failed` reports an error status instead.

use chessclip_board::{binarize, BinaryGrid, BoardLocator, LocateBoard};
use chessclip_moves::{
    render_pgn, GameSetupError, GameState, LegalityFilter, MoveRecord, MoveTracker, TickOutcome,
    TrackerStats,
};
use image::RgbImage;
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    sampling_stride, ChessclipConfig, FrameSource, JobResult, ProgressSink, ProgressUpdate,
    PromotionPiece, ResultSink, ResultSinkError, SourceError,
};

/// Highest progress reported before the job is finalized.
const MAX_TRACKING_PROGRESS: u8 = 99;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    SeekingBoard,
    Tracking,
    Done,
    Failed,
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("board not found in the first {attempts} frames")]
    InitializationFailure { attempts: usize },
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Setup(#[from] GameSetupError),
    #[error(transparent)]
    Result(#[from] ResultSinkError),
}

/// What one sampled frame contributed while tracking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Skipped; the reference grid is left as it was.
    BoardNotFound,
    Observed(TickOutcome),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Frames read while looking for the board, the successful one included.
    pub seek_frames: usize,
    /// Frames read while tracking.
    pub frames_read: usize,
    /// Sampled frames without a board while tracking.
    pub board_not_found: usize,
    pub tracker: TrackerStats,
}

/// Output of a finished run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameRecord {
    /// Accepted moves in SAN, in order.
    pub moves: Vec<String>,
    pub records: Vec<MoveRecord>,
    pub pgn: String,
    pub stats: RunStats,
}

/// `floor(90 × processed / (estimated_steps + 1))`, kept below 100.
pub fn tracking_progress(processed: usize, estimated_steps: usize) -> u8 {
    let pct = processed.saturating_mul(90) / estimated_steps.saturating_add(1);
    pct.min(MAX_TRACKING_PROGRESS as usize) as u8
}

/// Drives one video through the pipeline. Runs are sequential and
/// single-threaded; a driver can be reused for another source.
#[derive(Clone, Debug)]
pub struct PipelineDriver<L> {
    locator: L,
    config: ChessclipConfig,
    state: PipelineState,
}

impl PipelineDriver<BoardLocator> {
    /// Driver with the contour locator configured by `config.locator`.
    pub fn from_config(config: ChessclipConfig) -> Self {
        Self::new(BoardLocator::new(config.locator.clone()), config)
    }
}

impl<L: LocateBoard> PipelineDriver<L> {
    pub fn new(locator: L, config: ChessclipConfig) -> Self {
        Self {
            locator,
            config,
            state: PipelineState::SeekingBoard,
        }
    }

    #[inline]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    #[inline]
    pub fn config(&self) -> &ChessclipConfig {
        &self.config
    }

    /// Locate the board in `frame` and threshold its occupancy.
    pub fn observe_frame(&self, frame: &RgbImage) -> Option<BinaryGrid> {
        let board = self.locator.locate(frame)?;
        Some(binarize(&board.occupancy(), &self.config.binarize))
    }

    /// Process `source` to the end.
    ///
    /// Per-frame problems (no board, ambiguous or illegal transitions) are
    /// absorbed. Any returned error has already been reported to `progress`
    /// as a terminal `error` status, and nothing was published to `results`.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        progress: &mut dyn ProgressSink,
        results: &mut dyn ResultSink,
    ) -> Result<GameRecord, PipelineError> {
        self.state = PipelineState::SeekingBoard;
        progress.report(ProgressUpdate::initializing());

        let outcome = self.execute(source, progress, results);
        if let Err(e) = &outcome {
            self.transition(PipelineState::Failed);
            log::warn!("job failed: {e}");
            progress.report(ProgressUpdate::error(e.to_string()));
        }
        outcome
    }

    fn execute(
        &mut self,
        source: &mut dyn FrameSource,
        progress: &mut dyn ProgressSink,
        results: &mut dyn ResultSink,
    ) -> Result<GameRecord, PipelineError> {
        let game = match self.config.start_fen.as_deref() {
            Some(fen) => GameState::from_fen(fen)?,
            None => GameState::new(),
        };
        let fps = source
            .fps()
            .filter(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(self.config.tracking.fallback_fps);

        let (reference, seek_frames) = self.seek(source, fps)?;
        self.transition(PipelineState::Tracking);
        source.rewind()?;

        let tracking = &self.config.tracking;
        let filter = LegalityFilter::new(self.config.orientation)
            .with_promotion(tracking.promotion.map(PromotionPiece::role));
        let mut tracker = MoveTracker::new(reference, game, filter, tracking.confirmation);

        let stride = sampling_stride(fps, tracking.track_interval_secs);
        let estimated_steps = (source.frame_count().unwrap_or(0) / stride).max(1);
        log::debug!("tracking every {stride} frames, ~{estimated_steps} ticks");

        let mut stats = RunStats {
            seek_frames,
            ..RunStats::default()
        };
        let mut processed = 0usize;
        let mut last_progress = 0u8;
        while let Some(frame) = source.read_frame()? {
            let index = stats.frames_read;
            stats.frames_read += 1;
            if index % stride != 0 {
                continue;
            }
            if let Tick::BoardNotFound = self.tick(&frame, &mut tracker) {
                log::debug!("frame {index}: board not found");
                stats.board_not_found += 1;
                continue;
            }
            processed += 1;
            last_progress = tracking_progress(processed, estimated_steps).max(last_progress);
            progress.report(ProgressUpdate::working(last_progress));
        }

        self.transition(PipelineState::Done);
        stats.tracker = tracker.stats();
        let game = tracker.into_game();
        let record = GameRecord {
            moves: game.san_moves(),
            records: game.records().to_vec(),
            pgn: render_pgn(&game),
            stats,
        };
        log::info!(
            "{} moves from {} ticks ({} without board)",
            record.moves.len(),
            stats.tracker.ticks,
            stats.board_not_found
        );
        results.publish(&JobResult::from(&record))?;
        progress.report(ProgressUpdate::done());
        Ok(record)
    }

    /// Read up to `seek_max_frames` frames, trying to locate the board on
    /// every `stride`-th one. Returns the first located grid and the number
    /// of frames read.
    fn seek(
        &self,
        source: &mut dyn FrameSource,
        fps: f64,
    ) -> Result<(BinaryGrid, usize), PipelineError> {
        let stride = sampling_stride(fps, self.config.tracking.seek_interval_secs);
        let budget = self.config.tracking.seek_max_frames;
        let mut attempts = 0usize;
        while attempts < budget {
            let Some(frame) = source.read_frame()? else {
                break;
            };
            if attempts % stride == 0 {
                if let Some(grid) = self.observe_frame(&frame) {
                    log::info!(
                        "board located at frame {attempts}, {} squares occupied",
                        grid.count()
                    );
                    return Ok((grid, attempts + 1));
                }
            }
            attempts += 1;
        }
        Err(PipelineError::InitializationFailure { attempts })
    }

    fn tick(&self, frame: &RgbImage, tracker: &mut MoveTracker) -> Tick {
        match self.observe_frame(frame) {
            Some(grid) => Tick::Observed(tracker.observe(grid)),
            None => Tick::BoardNotFound,
        }
    }

    fn transition(&mut self, next: PipelineState) {
        log::debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
