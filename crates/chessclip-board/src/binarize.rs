use chessclip_core::BoardGrid;

use crate::{BinarizeParams, OccupancyGrid, Polarity};

/// Per-square occupied (`true`) / empty (`false`) flags.
pub type BinaryGrid = BoardGrid<bool>;

/// Median of the 64 scores; the two central values are averaged.
pub fn median_score(scores: &OccupancyGrid) -> f32 {
    let mut values: Vec<f32> = scores.iter().map(|(_, v)| v).collect();
    values.sort_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    }
}

/// Threshold actually applied for `scores` under `params`.
pub fn resolve_threshold(scores: &OccupancyGrid, params: &BinarizeParams) -> f32 {
    params
        .threshold
        .unwrap_or_else(|| params.median_factor * median_score(scores))
}

/// Threshold scores into a binary occupancy grid.
pub fn binarize(scores: &OccupancyGrid, params: &BinarizeParams) -> BinaryGrid {
    let t = resolve_threshold(scores, params);
    scores.map(|s| match params.polarity {
        Polarity::DarkOccupied => s < t,
        Polarity::BrightOccupied => s > t,
    })
}
