use serde::{Deserialize, Serialize};

/// Number of ranks and files on the board.
pub const BOARD_SIZE: usize = 8;

/// 8×8 per-square matrix; row 0 is the topmost rank of the rectified canvas,
/// column 0 its leftmost file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardGrid<T> {
    cells: [[T; BOARD_SIZE]; BOARD_SIZE],
}

impl<T: Copy> BoardGrid<T> {
    pub fn filled(value: T) -> Self {
        Self {
            cells: [[value; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    pub fn from_rows(cells: [[T; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Self { cells }
    }

    pub fn from_fn(mut f: impl FnMut(usize, usize) -> T) -> Self {
        Self {
            cells: std::array::from_fn(|r| std::array::from_fn(|c| f(r, c))),
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.cells[row][col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.cells[row][col] = value;
    }

    pub fn rows(&self) -> &[[T; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }

    /// Row-major iteration over `((row, col), value)`.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), T)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().enumerate().map(move |(c, &v)| ((r, c), v)))
    }

    pub fn map<U: Copy>(&self, mut f: impl FnMut(T) -> U) -> BoardGrid<U> {
        BoardGrid::from_fn(|r, c| f(self.cells[r][c]))
    }
}

impl BoardGrid<bool> {
    /// Number of `true` cells.
    pub fn count(&self) -> usize {
        self.iter().filter(|&(_, v)| v).count()
    }
}
