//! JSON configuration for a chessclip run.

use std::{fs, path::Path};

use chessclip_board::{BinarizeParams, LocatorParams};
use chessclip_moves::{Confirmation, Orientation, Role};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Piece a pawn is promoted to when it reaches the last rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionPiece {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl PromotionPiece {
    pub fn role(self) -> Role {
        match self {
            PromotionPiece::Queen => Role::Queen,
            PromotionPiece::Rook => Role::Rook,
            PromotionPiece::Bishop => Role::Bishop,
            PromotionPiece::Knight => Role::Knight,
        }
    }
}

/// Frame sampling and move acceptance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingParams {
    /// Seconds between locate attempts while looking for the board.
    pub seek_interval_secs: f64,
    /// Frames read before giving up on finding the board.
    pub seek_max_frames: usize,
    /// Seconds between tracked ticks.
    pub track_interval_secs: f64,
    /// Used when the source does not report a frame rate.
    pub fallback_fps: f64,
    pub confirmation: Confirmation,
    pub promotion: Option<PromotionPiece>,
}

impl Default for TrackingParams {
    fn default() -> Self {
        Self {
            seek_interval_secs: 0.2,
            seek_max_frames: 200,
            track_interval_secs: 0.5,
            fallback_fps: 25.0,
            confirmation: Confirmation::Immediate,
            promotion: None,
        }
    }
}

/// Frame stride for a sampling interval: `max(1, floor(fps × secs))`.
pub fn sampling_stride(fps: f64, secs: f64) -> usize {
    ((fps * secs).floor() as usize).max(1)
}

/// Everything a run needs besides its input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChessclipConfig {
    pub locator: LocatorParams,
    pub binarize: BinarizeParams,
    pub orientation: Orientation,
    pub tracking: TrackingParams,
    /// Start position other than the standard one.
    pub start_fen: Option<String>,
}

impl ChessclipConfig {
    /// Load a JSON config from disk. Missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
