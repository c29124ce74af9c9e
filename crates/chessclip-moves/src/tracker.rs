use chessclip_core::BoardGrid;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{diff_grids, CandidateMove, GameState, LegalityFilter, MoveRecord, Rejection, Verdict};

/// When a candidate is handed to the legality filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    /// On the tick it is observed.
    #[default]
    Immediate,
    /// Only once the next tick shows the same occupancy again.
    Stable,
}

/// What one observation contributed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    NoChange,
    /// Not exactly one vacated and one occupied square.
    Ambiguous { vacated: usize, occupied: usize },
    /// Held until the next tick confirms it.
    Pending(CandidateMove),
    Rejected(Rejection),
    Accepted(MoveRecord),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerStats {
    pub ticks: usize,
    pub no_change: usize,
    pub ambiguous: usize,
    pub rejected: usize,
    pub accepted: usize,
    pub unconfirmed: usize,
}

/// Threads the reference grid and the game across observations.
///
/// The reference becomes the current observation after every tick, whatever
/// the tick produced. Keeping a stale reference after a missed move would
/// make every later diff carry that move's squares.
#[derive(Clone, Debug)]
pub struct MoveTracker {
    reference: BoardGrid<bool>,
    game: GameState,
    filter: LegalityFilter,
    confirmation: Confirmation,
    pending: Option<(CandidateMove, BoardGrid<bool>)>,
    stats: TrackerStats,
}

impl MoveTracker {
    pub fn new(
        reference: BoardGrid<bool>,
        game: GameState,
        filter: LegalityFilter,
        confirmation: Confirmation,
    ) -> Self {
        Self {
            reference,
            game,
            filter,
            confirmation,
            pending: None,
            stats: TrackerStats::default(),
        }
    }

    #[inline]
    pub fn reference(&self) -> &BoardGrid<bool> {
        &self.reference
    }

    #[inline]
    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn into_game(self) -> GameState {
        self.game
    }

    #[inline]
    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    /// Diff `current` against the reference, validate any candidate and
    /// advance the reference.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(ply = self.game.ply())))]
    pub fn observe(&mut self, current: BoardGrid<bool>) -> TickOutcome {
        let outcome = match self.confirmation {
            Confirmation::Immediate => self.evaluate(&current, false),
            Confirmation::Stable => match self.pending.take() {
                Some((candidate, seen)) if seen == current => self.submit(&candidate),
                Some((candidate, _)) => {
                    log::debug!("dropping unconfirmed candidate {candidate:?}");
                    self.stats.unconfirmed += 1;
                    self.evaluate(&current, true)
                }
                None => self.evaluate(&current, true),
            },
        };

        self.reference = current;
        self.stats.ticks += 1;
        match &outcome {
            TickOutcome::NoChange => self.stats.no_change += 1,
            TickOutcome::Ambiguous { .. } => self.stats.ambiguous += 1,
            TickOutcome::Rejected(_) => self.stats.rejected += 1,
            TickOutcome::Accepted(_) => self.stats.accepted += 1,
            TickOutcome::Pending(_) => {}
        }
        outcome
    }

    fn evaluate(&mut self, current: &BoardGrid<bool>, defer: bool) -> TickOutcome {
        let diff = diff_grids(&self.reference, current);
        if diff.is_empty() {
            return TickOutcome::NoChange;
        }
        let Some(candidate) = diff.single_move() else {
            log::debug!(
                "ambiguous transition: {} vacated, {} occupied",
                diff.vacated.len(),
                diff.occupied.len()
            );
            return TickOutcome::Ambiguous {
                vacated: diff.vacated.len(),
                occupied: diff.occupied.len(),
            };
        };
        if defer {
            self.pending = Some((candidate, *current));
            return TickOutcome::Pending(candidate);
        }
        self.submit(&candidate)
    }

    fn submit(&mut self, candidate: &CandidateMove) -> TickOutcome {
        match self.filter.submit(&mut self.game, candidate) {
            Verdict::Accepted(record) => {
                log::info!("move {}: {}", self.game.ply(), record.san);
                TickOutcome::Accepted(record)
            }
            Verdict::Rejected(rejection) => {
                log::debug!("rejected candidate {}", rejection.descriptor());
                TickOutcome::Rejected(rejection)
            }
        }
    }
}
