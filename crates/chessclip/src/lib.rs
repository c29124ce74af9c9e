//! Chess game extraction from video.
//!
//! A video (or a directory of frames) goes in; the list of moves in SAN and
//! a PGN transcript come out. The board is located once, then every sampled
//! frame is reduced to an 8×8 occupancy grid and compared with the previous
//! one. A single vacated plus a single newly occupied square becomes a
//! candidate move, which is kept only if it is legal.
//!
//! ## Quickstart
//!
//! ```no_run
//! use chessclip::{open_source, ChessclipConfig, NoProgress, PipelineDriver};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut source = open_source("game.mp4", None)?;
//! let mut results = Vec::new();
//! let record = PipelineDriver::from_config(ChessclipConfig::default()).run(
//!     source.as_mut(),
//!     &mut NoProgress,
//!     &mut results,
//! )?;
//! println!("{}", record.pgn);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `chessclip::core`: images, homographies, quads, 8×8 grids, logger.
//! - `chessclip::board`: board location, rectification, occupancy scores.
//! - `chessclip::moves`: grid diffs, legality, game state, PGN.
//! - this crate: frame sources, the pipeline driver, progress, results, jobs.

pub use chessclip_board as board;
pub use chessclip_core as core;
pub use chessclip_moves as moves;

mod config;
mod job;
mod pipeline;
mod progress;
mod result;
mod source;

pub use chessclip_board::{BoardLocator, LocateBoard, PrerectifiedInput};
pub use chessclip_moves::{Confirmation, Orientation};

pub use config::{sampling_stride, ChessclipConfig, ConfigError, PromotionPiece, TrackingParams};
pub use job::{JobError, JobHandle, JobRunner};
pub use pipeline::{
    tracking_progress, GameRecord, PipelineDriver, PipelineError, PipelineState, RunStats, Tick,
};
pub use progress::{
    JobId, JobProgress, JobStatus, NoProgress, ProgressSink, ProgressStore, ProgressUpdate,
};
pub use result::{JobResult, JsonResultWriter, ResultSink, ResultSinkError};
pub use source::{
    open_source, FfmpegSource, FrameSource, ImageSequenceSource, MemorySource, SourceError,
};
