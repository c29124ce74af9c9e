//! Board location and occupancy sampling.
//!
//! Per sampled frame:
//! 1. [`BoardLocator`] finds the largest 4-vertex contour and warps the frame
//!    onto a fixed square canvas ([`RectifiedBoard`]).
//! 2. [`extract_occupancy`] splits the canvas into 8×8 tiles and scores each
//!    one with `mean × (stddev + 1)`.
//! 3. [`binarize`] thresholds the scores into an occupied/empty grid.
//!
//! The score is a heuristic proxy for piece presence, not a piece classifier.

mod binarize;
mod locator;
mod occupancy;
mod params;
mod rectified;
mod refine;

pub use binarize::{binarize, median_score, resolve_threshold, BinaryGrid};
pub use locator::{BoardLocator, LocateBoard, PrerectifiedInput};
pub use occupancy::{extract_occupancy, square_stats, OccupancyGrid, SquareStats};
pub use params::{BinarizeParams, LocatorParams, Polarity};
pub use rectified::RectifiedBoard;
