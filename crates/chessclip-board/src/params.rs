use serde::{Deserialize, Serialize};

/// Parameters of the contour-based board locator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorParams {
    /// Side of the square rectified canvas in pixels.
    pub canvas_size: u32,
    /// Gaussian pre-blur sigma. `1.1` is what a 5×5 kernel with automatic
    /// sigma amounts to. Non-positive values disable the blur.
    pub blur_sigma: f32,
    /// Canny hysteresis thresholds.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Dilation radius (L∞, pixels) applied to the edge map so that small
    /// gaps in the board outline still close into one contour. `0` disables.
    pub edge_dilation: u8,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub approx_epsilon_frac: f64,
    /// Reject quads whose area is below this fraction of the frame area.
    pub min_area_frac: f64,
    /// Half-width in pixels of the search for each board side around the
    /// contour quad. Non-positive values skip sub-pixel refinement.
    pub refine_search_px: f32,
    /// Sampling stations per side during refinement.
    pub refine_stations: usize,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            canvas_size: 800,
            blur_sigma: 1.1,
            canny_low: 50.0,
            canny_high: 150.0,
            edge_dilation: 1,
            approx_epsilon_frac: 0.02,
            min_area_frac: 0.0,
            refine_search_px: 4.0,
            refine_stations: 32,
        }
    }
}

/// Which side of the threshold counts as "occupied".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Scores below the threshold hold a piece (dark, textured silhouettes).
    #[default]
    DarkOccupied,
    /// Scores above the threshold hold a piece.
    BrightOccupied,
}

/// Thresholding of occupancy scores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarizeParams {
    /// Fixed threshold. When `None`, `median_factor × median(scores)` is used.
    pub threshold: Option<f32>,
    pub median_factor: f32,
    pub polarity: Polarity,
}

impl Default for BinarizeParams {
    fn default() -> Self {
        Self {
            threshold: None,
            median_factor: 0.6,
            polarity: Polarity::DarkOccupied,
        }
    }
}
