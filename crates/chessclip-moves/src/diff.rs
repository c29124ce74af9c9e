use chessclip_core::BoardGrid;
use serde::{Deserialize, Serialize};

use crate::GridPos;

/// Squares whose occupancy changed between two observations, row-major.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyDiff {
    /// Occupied before, empty now.
    pub vacated: Vec<GridPos>,
    /// Empty before, occupied now.
    pub occupied: Vec<GridPos>,
}

/// Unvalidated `(from, to)` pair inferred purely from occupancy change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateMove {
    pub from: GridPos,
    pub to: GridPos,
}

impl OccupancyDiff {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vacated.is_empty() && self.occupied.is_empty()
    }

    /// A candidate exists only for exactly one vacated and one occupied
    /// square. Captures, castling, en passant and noise are all dropped.
    pub fn single_move(&self) -> Option<CandidateMove> {
        match (self.vacated.as_slice(), self.occupied.as_slice()) {
            ([from], [to]) => Some(CandidateMove {
                from: *from,
                to: *to,
            }),
            _ => None,
        }
    }
}

/// Compare the previous reference grid with the current observation.
pub fn diff_grids(previous: &BoardGrid<bool>, current: &BoardGrid<bool>) -> OccupancyDiff {
    let mut diff = OccupancyDiff::default();
    for ((row, col), now) in current.iter() {
        match (previous.get(row, col), now) {
            (true, false) => diff.vacated.push(GridPos::new(row, col)),
            (false, true) => diff.occupied.push(GridPos::new(row, col)),
            _ => {}
        }
    }
    diff
}
