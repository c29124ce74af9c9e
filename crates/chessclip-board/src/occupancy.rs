use chessclip_core::{BoardGrid, GrayImageView, BOARD_SIZE};

/// Per-square foreground scores.
pub type OccupancyGrid = BoardGrid<f32>;

/// Intensity statistics of one tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SquareStats {
    pub mean: f64,
    /// Population standard deviation.
    pub stddev: f64,
}

impl SquareStats {
    /// `mean × (stddev + 1)`: darkness combined with texture.
    #[inline]
    pub fn score(&self) -> f32 {
        (self.mean * (self.stddev + 1.0)) as f32
    }
}

/// Statistics of the `w × h` tile whose top-left pixel is `(x0, y0)`.
pub fn square_stats(img: &GrayImageView<'_>, x0: usize, y0: usize, w: usize, h: usize) -> SquareStats {
    let n = (w * h) as f64;
    if n == 0.0 {
        return SquareStats {
            mean: 0.0,
            stddev: 0.0,
        };
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for y in y0..y0 + h {
        let row = &img.data[y * img.width + x0..y * img.width + x0 + w];
        for &v in row {
            let v = v as f64;
            sum += v;
            sum_sq += v * v;
        }
    }
    let mean = sum / n;
    let var = (sum_sq / n - mean * mean).max(0.0);
    SquareStats {
        mean,
        stddev: var.sqrt(),
    }
}

/// Split the canvas into 8×8 equal tiles and score each one.
///
/// Tile size is `width / 8` by `height / 8` (integer division); remainder
/// pixels on the right and bottom edges are not sampled.
pub fn extract_occupancy(canvas: &GrayImageView<'_>) -> OccupancyGrid {
    let tw = canvas.width / BOARD_SIZE;
    let th = canvas.height / BOARD_SIZE;
    BoardGrid::from_fn(|r, c| square_stats(canvas, c * tw, r * th, tw, th).score())
}
