use chessclip_core::BOARD_SIZE;
use serde::{Deserialize, Serialize};
use shakmaty::{File, Rank, Square};

/// Cell of the 8×8 grid: row 0 is the top of the rectified canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    pub row: usize,
    pub col: usize,
}

impl GridPos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// How the rectified canvas relates to the board's files and ranks.
///
/// Fixed once for the whole video; a wrong choice shifts every square and is
/// not detected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// White at the bottom: `file = 'a' + col`, `rank = 8 - row`.
    #[default]
    WhiteBottom,
    /// Black at the bottom: `file = 'h' - col`, `rank = row + 1`.
    BlackBottom,
}

impl Orientation {
    /// Square shown at `pos`; `None` outside the 8×8 grid.
    pub fn square_at(self, pos: GridPos) -> Option<Square> {
        if pos.row >= BOARD_SIZE || pos.col >= BOARD_SIZE {
            return None;
        }
        let (file, rank) = match self {
            Orientation::WhiteBottom => (pos.col, BOARD_SIZE - 1 - pos.row),
            Orientation::BlackBottom => (BOARD_SIZE - 1 - pos.col, pos.row),
        };
        Some(Square::from_coords(
            File::new(file as u32),
            Rank::new(rank as u32),
        ))
    }

    /// Grid cell showing `sq`.
    pub fn grid_pos(self, sq: Square) -> GridPos {
        let file = sq.file() as usize;
        let rank = sq.rank() as usize;
        match self {
            Orientation::WhiteBottom => GridPos::new(BOARD_SIZE - 1 - rank, file),
            Orientation::BlackBottom => GridPos::new(rank, BOARD_SIZE - 1 - file),
        }
    }
}
