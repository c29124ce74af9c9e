//! From occupancy grids to a legal move list.
//!
//! - [`diff_grids`] compares two binary grids and proposes a
//!   [`CandidateMove`] only for exactly one vacated and one newly occupied
//!   square.
//! - [`LegalityFilter`] turns the candidate into a coordinate descriptor
//!   (`e2e4`) and accepts it only if the rules engine lists it as legal.
//! - [`MoveTracker`] threads the reference grid and the [`GameState`]
//!   across ticks.
//! - [`render_pgn`] writes the transcript from the game's own history.
//!
//! Rules (legal moves, SAN, outcomes) come from `shakmaty`.

mod diff;
mod game;
mod legality;
mod square;
mod tracker;
mod transcript;

pub use diff::{diff_grids, CandidateMove, OccupancyDiff};
pub use game::{GameSetupError, GameState, MoveRecord};
pub use legality::{LegalityFilter, Rejection, Verdict};
pub use square::{GridPos, Orientation};
pub use tracker::{Confirmation, MoveTracker, TickOutcome, TrackerStats};
pub use transcript::{render_pgn, result_token};

pub use shakmaty::Role;
