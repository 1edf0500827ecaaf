//! Queen placements: validation and rendering.
//!
//! Everything here works on plain placements and never touches a solver,
//! so a solution can be checked independently of whoever produced it.

use std::fmt::{Display, Formatter};

use thiserror::Error;

/// A set of occupied cells on an `size x size` board.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Placement {
    size: usize,
    /// Row-major occupancy.
    cells: Vec<bool>,
}

impl Placement {
    /// An empty board.
    pub fn empty(size: usize) -> Self {
        Self {
            size,
            cells: vec![false; size * size],
        }
    }

    /// A board with queens on the given `(row, col)` cells.
    ///
    /// # Panics
    ///
    /// Panics if a cell is off the board.
    pub fn from_queens(size: usize, queens: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut placement = Self::empty(size);
        for (row, col) in queens {
            placement.set(row, col, true);
        }
        placement
    }

    /// A board with one queen per row, in the given columns.
    pub fn from_columns(columns: &[usize]) -> Self {
        Self::from_queens(columns.len(), columns.iter().copied().enumerate())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_queen(&self, row: usize, col: usize) -> bool {
        self.cells[self.offset(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, queen: bool) {
        let offset = self.offset(row, col);
        self.cells[offset] = queen;
    }

    fn offset(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.size && col < self.size,
            "cell ({}, {}) is off the {}x{} board",
            row,
            col,
            self.size,
            self.size
        );
        row * self.size + col
    }

    /// Occupied cells in row-major order.
    pub fn queens(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, q)| **q)
            .map(|(i, _)| (i / self.size, i % self.size))
    }

    pub fn num_queens(&self) -> usize {
        self.cells.iter().filter(|&&q| q).count()
    }

    /// Column of the queen in each row, if every row holds exactly one.
    pub fn columns(&self) -> Option<Vec<usize>> {
        (0..self.size)
            .map(|row| {
                let mut cols = (0..self.size).filter(|&col| self.is_queen(row, col));
                match (cols.next(), cols.next()) {
                    (Some(col), None) => Some(col),
                    _ => None,
                }
            })
            .collect()
    }

    /// Render one line per row, markers separated by single spaces.
    pub fn render(&self, style: &RenderStyle) -> String {
        let mut out = String::with_capacity(self.size * self.size * 2);
        for row in 0..self.size {
            if row > 0 {
                out.push('\n');
            }
            for col in 0..self.size {
                if col > 0 {
                    out.push(' ');
                }
                out.push(if self.is_queen(row, col) {
                    style.queen
                } else {
                    style.empty
                });
            }
        }
        out
    }
}

impl Display for Placement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(&RenderStyle::default()))
    }
}

/// Markers used by [`Placement::render`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RenderStyle {
    pub queen: char,
    pub empty: char,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            queen: 'Q',
            empty: '_',
        }
    }
}

/// The first broken placement rule found by [`validate`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum Violation {
    #[error("row {row} holds {count} queens instead of one")]
    RowCount { row: usize, count: usize },
    #[error("queens at {a:?} and {b:?} share a column")]
    SameColumn { a: (usize, usize), b: (usize, usize) },
    #[error("queens at {a:?} and {b:?} share a diagonal")]
    SameDiagonal { a: (usize, usize), b: (usize, usize) },
    #[error("queens at {a:?} and {b:?} share an anti-diagonal")]
    SameAntiDiagonal { a: (usize, usize), b: (usize, usize) },
}

/// Check that `placement` has exactly one queen per row and that no two
/// queens share a column, a diagonal or an anti-diagonal.
pub fn validate(placement: &Placement) -> Result<(), Violation> {
    let n = placement.size();

    for row in 0..n {
        let count = (0..n).filter(|&col| placement.is_queen(row, col)).count();
        if count != 1 {
            return Err(Violation::RowCount { row, count });
        }
    }

    let queens: Vec<(usize, usize)> = placement.queens().collect();
    for (k, &a) in queens.iter().enumerate() {
        for &b in &queens[k + 1..] {
            if a.1 == b.1 {
                return Err(Violation::SameColumn { a, b });
            }
            // Compare i - j and i + j without leaving unsigned arithmetic.
            if a.0 + b.1 == b.0 + a.1 {
                return Err(Violation::SameDiagonal { a, b });
            }
            if a.0 + a.1 == b.0 + b.1 {
                return Err(Violation::SameAntiDiagonal { a, b });
            }
        }
    }

    Ok(())
}
