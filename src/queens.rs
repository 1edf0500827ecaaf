//! The N-Queens constraint model.
//!
//! One boolean variable per cell says whether a queen stands there. The
//! model asserts:
//!
//! - **row coverage**: every row contains at least one queen;
//! - **threat-freedom**: a queen on `(i, j)` implies that no other cell in
//!   its row, its column or either of its diagonals holds a queen.
//!
//! Together these force exactly one queen per row, so the models of the
//! instance are exactly the valid placements.
//!
//! # Examples
//!
//! ```
//! use nqueens_bdd::board::validate;
//! use nqueens_bdd::config::SolverConfig;
//! use nqueens_bdd::queens::{solve, BoardSize, Outcome};
//!
//! let size = BoardSize::new(6)?;
//! match solve(size, &SolverConfig::default())? {
//!     Outcome::Solved(placement) => assert!(validate(&placement).is_ok()),
//!     other => panic!("6 queens must be solvable, got {:?}", other),
//! }
//! # Ok::<(), nqueens_bdd::error::QueensError>(())
//! ```

use std::fmt::{Display, Formatter};

use log::{debug, info};
use num_bigint::BigUint;

use crate::ast::Formula;
use crate::board::{Placement, RenderStyle};
use crate::config::SolverConfig;
use crate::error::QueensError;
use crate::solver::{Model, SatResult, Session};
use crate::types::Var;

/// Largest accepted board. Beyond it the BDD of the instance gets too large.
///
/// 11x11 needs about `2^24` nodes of storage; 12x12 does not fit in `2^26`.
pub const MAX_BOARD_SIZE: usize = 11;

/// Validated board dimension, `1..=MAX_BOARD_SIZE`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BoardSize(usize);

impl BoardSize {
    pub fn new(n: usize) -> Result<Self, QueensError> {
        if (1..=MAX_BOARD_SIZE).contains(&n) {
            Ok(BoardSize(n))
        } else {
            Err(QueensError::InvalidSize {
                size: n.try_into().unwrap_or(i64::MAX),
                max: MAX_BOARD_SIZE,
            })
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl TryFrom<i64> for BoardSize {
    type Error = QueensError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        match usize::try_from(n) {
            Ok(n) => BoardSize::new(n),
            Err(_) => Err(QueensError::InvalidSize {
                size: n,
                max: MAX_BOARD_SIZE,
            }),
        }
    }
}

impl Display for BoardSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dense `(row, col)` grid of cell variables.
#[derive(Debug, Clone)]
pub struct CellGrid {
    size: usize,
    vars: Vec<Var>,
}

impl CellGrid {
    /// Declare one fresh variable per cell, in row-major order.
    pub fn declare(session: &mut Session, size: BoardSize) -> Self {
        let n = size.get();
        let vars = (0..n * n).map(|_| session.new_var()).collect();
        Self { size: n, vars }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn var(&self, row: usize, col: usize) -> Var {
        assert!(row < self.size && col < self.size);
        self.vars[row * self.size + col]
    }

    pub fn cell(&self, row: usize, col: usize) -> Formula {
        Formula::var(self.var(row, col))
    }

    /// The cells a queen on `(row, col)` attacks: the rest of its row and
    /// column, then the four diagonal rays. Rays stop at the board edge.
    pub fn attacked_by(&self, row: usize, col: usize) -> Vec<(usize, usize)> {
        let n = self.size as isize;
        let (i, j) = (row as isize, col as isize);
        let mut cells = Vec::with_capacity(4 * self.size);

        cells.extend((0..self.size).filter(|&k| k != col).map(|k| (row, k)));
        cells.extend((0..self.size).filter(|&k| k != row).map(|k| (k, col)));

        for (di, dj) in [(1, 1), (-1, -1), (-1, 1), (1, -1)] {
            for o in 1..n {
                let (r, c) = (i + di * o, j + dj * o);
                if r < 0 || r >= n || c < 0 || c >= n {
                    break;
                }
                cells.push((r as usize, c as usize));
            }
        }

        cells
    }

    /// The assignment encoding `placement`: queens true, every other cell false.
    pub fn assignment(&self, placement: &Placement) -> Model {
        assert_eq!(placement.size(), self.size, "placement does not fit the grid");
        let mut values = vec![false; self.vars.len()];
        for (row, col) in placement.queens() {
            values[self.var(row, col).id() as usize - 1] = true;
        }
        Model::new(values)
    }

    /// Read the placement encoded by `model`.
    pub fn placement(&self, model: &Model) -> Result<Placement, QueensError> {
        let mut placement = Placement::empty(self.size);
        for row in 0..self.size {
            for col in 0..self.size {
                placement.set(row, col, model.value(self.var(row, col))?);
            }
        }
        Ok(placement)
    }
}

/// At least one queen in each row.
pub fn row_coverage(grid: &CellGrid) -> Vec<Formula> {
    (0..grid.size())
        .map(|row| Formula::or((0..grid.size()).map(|col| grid.cell(row, col))))
        .collect()
}

/// For each cell, a queen there excludes queens on every cell it attacks.
pub fn threat_freedom(grid: &CellGrid) -> Vec<Formula> {
    let n = grid.size();
    let mut constraints = Vec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            let safe = Formula::and(
                grid.attacked_by(row, col)
                    .into_iter()
                    .map(|(r, c)| !grid.cell(r, c)),
            );
            constraints.push(Formula::implies(grid.cell(row, col), safe));
        }
    }
    constraints
}

/// Result of a solve call.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Outcome {
    /// A valid placement. Any solution may be returned, not a canonical one.
    Solved(Placement),
    /// No placement exists for this size.
    Unsatisfiable,
    /// The configured timeout elapsed first.
    Timeout,
}

impl Outcome {
    pub fn placement(&self) -> Option<&Placement> {
        match self {
            Outcome::Solved(placement) => Some(placement),
            _ => None,
        }
    }

    /// Render the outcome: the board, `unsat` or `unknown`.
    pub fn render(&self, style: &RenderStyle) -> String {
        match self {
            Outcome::Solved(placement) => placement.render(style),
            Outcome::Unsatisfiable => SatResult::Unsat.to_string(),
            Outcome::Timeout => SatResult::Unknown.to_string(),
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(&RenderStyle::default()))
    }
}

/// The N-Queens instance loaded into its own solver session.
pub struct QueensModel {
    size: BoardSize,
    session: Session,
    grid: CellGrid,
}

impl QueensModel {
    /// Declare the cell variables and assert all constraints.
    pub fn build(size: BoardSize, config: &SolverConfig) -> Result<Self, QueensError> {
        let mut session = Session::new(*config);
        let grid = CellGrid::declare(&mut session, size);

        for constraint in row_coverage(&grid).into_iter().chain(threat_freedom(&grid)) {
            debug!("assert {}", constraint);
            session.add(constraint)?;
        }
        info!(
            "{}-queens: {} variables, {} constraints",
            size,
            session.num_vars(),
            session.num_constraints()
        );

        Ok(Self {
            size,
            session,
            grid,
        })
    }

    pub fn size(&self) -> BoardSize {
        self.size
    }

    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Look for one (more) placement.
    pub fn solve(&mut self) -> Result<Outcome, QueensError> {
        match self.session.check()? {
            SatResult::Sat => {
                let model = self.session.model()?;
                Ok(Outcome::Solved(self.grid.placement(&model)?))
            }
            SatResult::Unsat => Ok(Outcome::Unsatisfiable),
            SatResult::Unknown => Ok(Outcome::Timeout),
        }
    }

    /// Exclude `placement` from later calls to [`solve`][QueensModel::solve].
    ///
    /// The session holds nothing but the cell variables, so blocking the
    /// placement's assignment excludes exactly that placement.
    pub fn exclude(&mut self, placement: &Placement) -> Result<(), QueensError> {
        let model = self.grid.assignment(placement);
        self.session.block(&model)?;
        Ok(())
    }

    /// Number of placements, counted without enumerating them.
    pub fn count(&mut self) -> Result<Option<BigUint>, QueensError> {
        Ok(self.session.count_models()?)
    }
}

/// Solve `size`-queens in a fresh session.
pub fn solve(size: BoardSize, config: &SolverConfig) -> Result<Outcome, QueensError> {
    QueensModel::build(size, config)?.solve()
}

/// Number of distinct placements for `size`, or `None` on timeout.
pub fn count_solutions(
    size: BoardSize,
    config: &SolverConfig,
) -> Result<Option<BigUint>, QueensError> {
    QueensModel::build(size, config)?.count()
}

/// Iterate over all placements for `size`.
pub fn solutions(size: BoardSize, config: &SolverConfig) -> Result<Solutions, QueensError> {
    Ok(Solutions {
        model: QueensModel::build(size, config)?,
        done: false,
        timed_out: false,
    })
}

/// Iterator over all placements of a [`QueensModel`].
///
/// Each step solves the model and then excludes the placement it found,
/// until the model becomes unsatisfiable. If the timeout elapses the
/// iterator stops early and [`timed_out`][Solutions::timed_out] is set.
pub struct Solutions {
    model: QueensModel,
    done: bool,
    timed_out: bool,
}

impl Solutions {
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }
}

impl Iterator for Solutions {
    type Item = Result<Placement, QueensError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let outcome = match self.model.solve() {
            Ok(outcome) => outcome,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        match outcome {
            Outcome::Solved(placement) => {
                if let Err(e) = self.model.exclude(&placement) {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok(placement))
            }
            Outcome::Unsatisfiable => {
                self.done = true;
                None
            }
            Outcome::Timeout => {
                self.done = true;
                self.timed_out = true;
                None
            }
        }
    }
}
