use chessclip_core::{GrayImage, Homography, Quad};

use crate::{extract_occupancy, OccupancyGrid};

/// Fixed-size top-down view of the board.
///
/// Square `(r, c)` always covers the same canvas region regardless of the
/// source frame, so the canvas can be partitioned directly.
#[derive(Clone, Debug)]
pub struct RectifiedBoard {
    /// Square grayscale canvas.
    pub canvas: GrayImage,
    /// Board corners in source-frame coordinates.
    pub quad: Quad,
    /// Canvas → frame mapping used to resample the canvas.
    pub h_img_from_rect: Homography,
}

impl RectifiedBoard {
    #[inline]
    pub fn size(&self) -> usize {
        self.canvas.width
    }

    /// Score every square of the canvas.
    pub fn occupancy(&self) -> OccupancyGrid {
        extract_occupancy(&self.canvas.view())
    }
}
