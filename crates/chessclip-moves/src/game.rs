use serde::{Deserialize, Serialize};
use shakmaty::fen::{Fen, ParseFenError};
use shakmaty::san::SanPlus;
use shakmaty::{CastlingMode, Chess, Move};

#[derive(thiserror::Error, Debug)]
pub enum GameSetupError {
    #[error(transparent)]
    Fen(#[from] ParseFenError),
    #[error("illegal start position: {0}")]
    Position(String),
}

/// One accepted move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Standard algebraic notation, with check/mate suffix.
    pub san: String,
    /// Coordinate notation of the same move.
    pub uci: String,
}

/// Running game: start position, current position and the accepted moves in
/// order.
///
/// Only [`GameState::play`] mutates it, and moves are never taken back.
#[derive(Clone, Debug)]
pub struct GameState {
    start: Chess,
    start_fen: Option<String>,
    position: Chess,
    history: Vec<Move>,
    records: Vec<MoveRecord>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Standard starting position.
    pub fn new() -> Self {
        Self::from_position(Chess::default(), None)
    }

    /// Start from a FEN position.
    pub fn from_fen(fen: &str) -> Result<Self, GameSetupError> {
        let parsed: Fen = fen.parse()?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| GameSetupError::Position(e.to_string()))?;
        Ok(Self::from_position(position, Some(fen.trim().to_string())))
    }

    fn from_position(position: Chess, start_fen: Option<String>) -> Self {
        Self {
            start: position.clone(),
            start_fen,
            position,
            history: Vec::new(),
            records: Vec::new(),
        }
    }

    #[inline]
    pub fn position(&self) -> &Chess {
        &self.position
    }

    #[inline]
    pub fn start_position(&self) -> &Chess {
        &self.start
    }

    /// FEN of a non-standard start position.
    pub fn start_fen(&self) -> Option<&str> {
        self.start_fen.as_deref()
    }

    /// Accepted moves, oldest first.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn records(&self) -> &[MoveRecord] {
        &self.records
    }

    pub fn san_moves(&self) -> Vec<String> {
        self.records.iter().map(|r| r.san.clone()).collect()
    }

    /// Number of half-moves played.
    #[inline]
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    /// Apply a move the rules engine has already validated against the
    /// current position and record it.
    pub(crate) fn play(&mut self, m: Move) -> &MoveRecord {
        let uci = m.to_uci(CastlingMode::Standard).to_string();
        let san = SanPlus::from_move_and_play_unchecked(&mut self.position, &m).to_string();
        self.history.push(m);
        self.records.push(MoveRecord { san, uci });
        &self.records[self.records.len() - 1]
    }
}
