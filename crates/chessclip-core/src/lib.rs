//! Core types and utilities for the chessclip pipeline.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any image decoding library or on the chess rules engine: frames
//! enter it as borrowed grayscale views and leave it as rectified canvases and
//! 8×8 grids.

mod grid;
mod homography;
mod image;
mod logger;
mod quad;

pub use grid::{BoardGrid, BOARD_SIZE};
pub use homography::{homography_from_4pt, warp_perspective_gray, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView, ImageBufferError};
pub use quad::{polygon_area, Quad};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
