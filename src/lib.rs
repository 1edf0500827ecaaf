//! # nqueens-bdd: the N-Queens puzzle as a boolean constraint model
//!
//! **`nqueens-bdd`** encodes the N-Queens puzzle as a satisfiability instance
//! over one boolean variable per board cell, hands it to a solver session,
//! and turns the satisfying assignment back into a board.
//!
//! The solver behind the session is a small **Binary Decision Diagram (BDD)**
//! engine. A BDD is a canonical graph representation of a boolean function:
//! once the constraints are compiled, satisfiability is a constant-time check,
//! one solution is a single walk down the graph, and counting all solutions
//! is linear in the size of the graph.
//!
//! ## Quick Start
//!
//! ```rust
//! use nqueens_bdd::config::SolverConfig;
//! use nqueens_bdd::queens::{solve, count_solutions, BoardSize, Outcome};
//!
//! let size = BoardSize::new(4)?;
//! let outcome = solve(size, &SolverConfig::default())?;
//! if let Outcome::Solved(placement) = &outcome {
//!     assert_eq!(placement.num_queens(), 4);
//! }
//! println!("{}", outcome);
//!
//! let count = count_solutions(size, &SolverConfig::default())?;
//! assert_eq!(count.map(|c| c.to_string()), Some("2".to_string()));
//! # Ok::<(), nqueens_bdd::error::QueensError>(())
//! ```
//!
//! ## Core Components
//!
//! - **[`queens`]**: board size, cell grid, constraint builder, solve/enumerate/count.
//! - **[`board`]**: placements, solver-independent validation, rendering.
//! - **[`solver`]**: caller-owned solver sessions over [`ast::Formula`]s.
//! - **[`bdd`]**: the BDD manager (unique table, ITE, computed table).
//! - **[`sat`]**: model extraction and model counting.

pub mod ast;
pub mod bdd;
pub mod board;
pub mod cache;
pub mod config;
pub mod error;
pub mod queens;
pub mod reference;
pub mod sat;
pub mod solver;
pub mod table;
pub mod types;
pub mod utils;
