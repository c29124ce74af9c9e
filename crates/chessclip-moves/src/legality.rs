use serde::{Deserialize, Serialize};
use shakmaty::uci::UciMove;
use shakmaty::{Position, Rank, Role};

use crate::{CandidateMove, GameState, MoveRecord, Orientation};

/// Why a candidate was discarded. Never surfaced as an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// The descriptor does not parse as a coordinate move.
    Malformed { descriptor: String },
    /// Well-formed, but not legal in the current position.
    Illegal { descriptor: String },
}

impl Rejection {
    pub fn descriptor(&self) -> &str {
        match self {
            Rejection::Malformed { descriptor } | Rejection::Illegal { descriptor } => descriptor,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted(MoveRecord),
    Rejected(Rejection),
}

/// Validates candidates against the rules engine and advances the game.
#[derive(Clone, Copy, Debug, Default)]
pub struct LegalityFilter {
    orientation: Orientation,
    promotion: Option<Role>,
}

impl LegalityFilter {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            promotion: None,
        }
    }

    /// Promote pawns that reach the last rank to `role` instead of rejecting
    /// the bare descriptor.
    pub fn with_promotion(mut self, role: Option<Role>) -> Self {
        self.promotion = role;
        self
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Coordinate descriptor for `candidate`: `from ++ to`, plus the
    /// promotion letter when configured and applicable.
    pub fn descriptor(&self, game: &GameState, candidate: &CandidateMove) -> String {
        let from = self.orientation.square_at(candidate.from);
        let to = self.orientation.square_at(candidate.to);
        let (Some(from), Some(to)) = (from, to) else {
            return format!(
                "r{}c{}r{}c{}",
                candidate.from.row, candidate.from.col, candidate.to.row, candidate.to.col
            );
        };

        let mut descriptor = format!("{from}{to}");
        if let Some(role) = self.promotion {
            let is_pawn = game
                .position()
                .board()
                .piece_at(from)
                .is_some_and(|p| p.role == Role::Pawn);
            if is_pawn && matches!(to.rank(), Rank::First | Rank::Eighth) {
                descriptor.push(role.char());
            }
        }
        descriptor
    }

    /// Accept and play `candidate` if legal; otherwise leave `game` untouched.
    pub fn submit(&self, game: &mut GameState, candidate: &CandidateMove) -> Verdict {
        let descriptor = self.descriptor(game, candidate);
        let uci = match UciMove::from_ascii(descriptor.as_bytes()) {
            Ok(uci) => uci,
            Err(_) => return Verdict::Rejected(Rejection::Malformed { descriptor }),
        };
        match uci.to_move(game.position()) {
            Ok(m) if game.position().is_legal(&m) => Verdict::Accepted(game.play(m).clone()),
            _ => Verdict::Rejected(Rejection::Illegal { descriptor }),
        }
    }
}
