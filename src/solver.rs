//! Solver sessions.
//!
//! A [`Session`] owns its variables, its constraints and the BDD manager
//! they are compiled into. Nothing is shared between sessions, so
//! constraints added to one can never leak into another.
//!
//! ```
//! use nqueens_bdd::ast::Formula;
//! use nqueens_bdd::solver::{SatResult, Session};
//!
//! let mut session = Session::default();
//! let p = session.new_var();
//! let q = session.new_var();
//! session.add(Formula::or([p.into(), q.into()]))?;
//! session.add(!Formula::var(p))?;
//!
//! assert_eq!(session.check()?, SatResult::Sat);
//! let model = session.model()?;
//! assert!(!model.value(p)?);
//! assert!(model.value(q)?);
//! # Ok::<(), nqueens_bdd::error::SolverError>(())
//! ```

use std::fmt::{Display, Formatter};
use std::time::Instant;

use log::{debug, info};
use num_bigint::BigUint;

use crate::ast::Formula;
use crate::bdd::Bdd;
use crate::config::SolverConfig;
use crate::error::{BddError, SolverError};
use crate::reference::Ref;
use crate::types::{Lit, Var};

/// Outcome of [`Session::check`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SatResult {
    /// A satisfying assignment exists; see [`Session::model`].
    Sat,
    /// No satisfying assignment exists.
    Unsat,
    /// The configured timeout elapsed before an answer was found.
    Unknown,
}

impl Display for SatResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SatResult::Sat => write!(f, "sat"),
            SatResult::Unsat => write!(f, "unsat"),
            SatResult::Unknown => write!(f, "unknown"),
        }
    }
}

/// A total assignment of the session variables.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Model {
    values: Vec<bool>,
}

impl Model {
    /// Assignment of variables `1..=values.len()`, in id order.
    pub fn new(values: Vec<bool>) -> Self {
        Self { values }
    }

    /// Value of `var`.
    pub fn value(&self, var: Var) -> Result<bool, SolverError> {
        self.values
            .get(var.id() as usize - 1)
            .copied()
            .ok_or(SolverError::UnknownVariable(var.id()))
    }

    /// Value of `formula` under this assignment.
    pub fn eval(&self, formula: &Formula) -> Result<bool, SolverError> {
        if let Some(&last) = formula.vars().last() {
            self.value(last)?;
        }
        Ok(formula.eval(&|v: Var| self.values[v.id() as usize - 1]))
    }

    /// Number of variables in the assignment.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The assignment as literals, one per variable.
    pub fn literals(&self) -> impl Iterator<Item = Lit> + '_ {
        self.values.iter().enumerate().map(|(i, &b)| {
            let var = Var::new(i as u32 + 1);
            if b {
                var.pos()
            } else {
                var.neg()
            }
        })
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, lit) in self.literals().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", lit.var(), lit.is_positive())?;
        }
        write!(f, "]")
    }
}

/// Engine counters of a session, for diagnostics.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SessionStats {
    pub nodes: usize,
    pub steps: u64,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

pub struct Session {
    config: SolverConfig,
    bdd: Bdd,
    num_vars: u32,
    constraints: Vec<Formula>,
    /// Conjunction of the first `compiled` constraints.
    root: Ref,
    compiled: usize,
    model: Option<Model>,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(SolverConfig::default())
    }
}

impl Session {
    pub fn new(config: SolverConfig) -> Self {
        let bdd = Bdd::with_cache_bits(config.storage_bits(), config.cache_bits());
        let root = bdd.one();
        Self {
            config,
            bdd,
            num_vars: 0,
            constraints: Vec::new(),
            root,
            compiled: 0,
            model: None,
        }
    }

    /// Declare a fresh boolean variable.
    pub fn new_var(&mut self) -> Var {
        self.num_vars += 1;
        Var::new(self.num_vars)
    }

    /// Declare a fresh boolean variable and return it as a formula.
    pub fn bool_var(&mut self) -> Formula {
        Formula::var(self.new_var())
    }

    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Assert `formula`. It takes effect at the next [`check`][Session::check].
    pub fn add(&mut self, formula: Formula) -> Result<(), SolverError> {
        if let Some(&last) = formula.vars().last() {
            if last.id() > self.num_vars {
                return Err(SolverError::UnknownVariable(last.id()));
            }
        }
        self.constraints.push(formula);
        self.model = None;
        Ok(())
    }

    /// Exclude exactly the assignment `model` from future checks.
    pub fn block(&mut self, model: &Model) -> Result<(), SolverError> {
        let clause = Formula::or(model.literals().map(|lit| {
            let x = Formula::var(lit.var());
            if lit.is_positive() {
                !x
            } else {
                x
            }
        }));
        self.add(clause)
    }

    /// Compile pending constraints into the root BDD under the configured timeout.
    fn compile(&mut self) -> Result<(), BddError> {
        let deadline = self.config.timeout().map(|t| Instant::now() + t);
        self.bdd.set_deadline(deadline);

        let result = self.compile_pending();

        self.bdd.set_deadline(None);
        result
    }

    fn compile_pending(&mut self) -> Result<(), BddError> {
        self.bdd.check_deadline()?;

        while self.compiled < self.constraints.len() {
            self.bdd.check_deadline()?;
            let constraint = self.constraints[self.compiled].to_bdd(&self.bdd)?;
            self.root = self.bdd.apply_and(self.root, constraint)?;
            self.compiled += 1;
            debug!(
                "compiled constraint {}/{}, root size {}, {} nodes total",
                self.compiled,
                self.constraints.len(),
                self.bdd.size(self.root),
                self.bdd.num_nodes()
            );
            if self.bdd.is_zero(self.root) {
                // Nothing can satisfy the rest either.
                self.compiled = self.constraints.len();
            }
        }
        Ok(())
    }

    /// Decide whether the asserted constraints are satisfiable.
    pub fn check(&mut self) -> Result<SatResult, SolverError> {
        let start = Instant::now();
        self.model = None;

        match self.compile() {
            Ok(()) => {}
            Err(BddError::DeadlineExceeded { steps }) => {
                info!("check gave up after {} steps ({:?})", steps, start.elapsed());
                return Ok(SatResult::Unknown);
            }
            Err(e) => return Err(SolverError::Engine(e)),
        }

        let result = match self.bdd.one_sat(self.root) {
            None => SatResult::Unsat,
            Some(path) => {
                let mut values = vec![false; self.num_vars as usize];
                for lit in path {
                    values[lit.var().id() as usize - 1] = lit.is_positive();
                }
                self.model = Some(Model { values });
                SatResult::Sat
            }
        };

        info!(
            "check: {} in {:?} ({} constraints, {} vars, {} nodes)",
            result,
            start.elapsed(),
            self.constraints.len(),
            self.num_vars,
            self.bdd.num_nodes()
        );
        Ok(result)
    }

    /// The satisfying assignment found by the last [`check`][Session::check].
    pub fn model(&self) -> Result<Model, SolverError> {
        self.model.clone().ok_or(SolverError::NoModel)
    }

    /// Number of assignments of all session variables satisfying the constraints.
    ///
    /// Returns `None` if the timeout elapsed.
    pub fn count_models(&mut self) -> Result<Option<BigUint>, SolverError> {
        match self.compile() {
            Ok(()) => Ok(Some(
                self.bdd.sat_count(self.root, self.num_vars as usize),
            )),
            Err(BddError::DeadlineExceeded { .. }) => Ok(None),
            Err(e) => Err(SolverError::Engine(e)),
        }
    }

    pub fn stats(&self) -> SessionStats {
        let cache = self.bdd.cache();
        SessionStats {
            nodes: self.bdd.num_nodes(),
            steps: self.bdd.steps(),
            cache_hits: cache.hits(),
            cache_misses: cache.misses(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use test_log::test;

    use super::*;

    #[test]
    fn test_empty_session_is_sat() {
        let mut session = Session::default();
        assert_eq!(session.check().unwrap(), SatResult::Sat);
        assert!(session.model().unwrap().is_empty());
    }

    #[test]
    fn test_bool_or() {
        let mut session = Session::default();
        let p = session.new_var();
        let q = session.new_var();
        session.add(Formula::var(p) | Formula::var(q)).unwrap();

        assert_eq!(session.check().unwrap(), SatResult::Sat);
        let model = session.model().unwrap();
        assert!(model.value(p).unwrap() || model.value(q).unwrap());
        assert!(model.eval(&(Formula::var(p) | Formula::var(q))).unwrap());
    }

    #[test]
    fn test_unsat() {
        let mut session = Session::default();
        let p = session.bool_var();
        session.add(p.clone()).unwrap();
        session.add(!p).unwrap();

        assert_eq!(session.check().unwrap(), SatResult::Unsat);
        assert_eq!(session.model(), Err(SolverError::NoModel));
    }

    #[test]
    fn test_model_before_check() {
        let mut session = Session::default();
        let p = session.bool_var();
        session.add(p).unwrap();
        assert_eq!(session.model(), Err(SolverError::NoModel));
    }

    #[test]
    fn test_unknown_variable() {
        let mut session = Session::default();
        let _p = session.new_var();
        let res = session.add(Formula::var(Var::new(2)));
        assert_eq!(res, Err(SolverError::UnknownVariable(2)));

        session.check().unwrap();
        let model = session.model().unwrap();
        assert_eq!(model.value(Var::new(5)), Err(SolverError::UnknownVariable(5)));
    }

    #[test]
    fn test_block_enumerates_all() {
        let mut session = Session::default();
        let p = session.new_var();
        let q = session.new_var();
        let r = session.new_var();
        // Exactly the assignments with p xor q.
        session
            .add(Formula::or([
                Formula::var(p) & !Formula::var(q),
                !Formula::var(p) & Formula::var(q),
            ]))
            .unwrap();

        let mut models = Vec::new();
        while session.check().unwrap() == SatResult::Sat {
            let model = session.model().unwrap();
            assert!(model.value(p).unwrap() ^ model.value(q).unwrap());
            assert!(!models.contains(&model));
            session.block(&model).unwrap();
            models.push(model);
        }
        // r is free, so 2 * 2 models.
        assert_eq!(models.len(), 4);
        let _ = r;
    }

    #[test]
    fn test_count_models() {
        let mut session = Session::default();
        let p = session.new_var();
        let q = session.new_var();
        let _r = session.new_var();
        session.add(Formula::implies(p.into(), q.into())).unwrap();

        assert_eq!(session.count_models().unwrap(), Some(BigUint::from(6u32)));
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut first = Session::default();
        let p = first.bool_var();
        first.add(!p).unwrap();
        assert_eq!(first.check().unwrap(), SatResult::Sat);

        let mut second = Session::default();
        let p = second.bool_var();
        second.add(p).unwrap();
        assert_eq!(second.check().unwrap(), SatResult::Sat);
        assert!(second.model().unwrap().value(Var::new(1)).unwrap());
    }

    #[test]
    fn test_zero_timeout_is_unknown() {
        let config = SolverConfig::default().with_timeout(Some(Duration::ZERO));
        let mut session = Session::new(config);
        let p = session.bool_var();
        session.add(p).unwrap();

        assert_eq!(session.check().unwrap(), SatResult::Unknown);
        assert_eq!(session.model(), Err(SolverError::NoModel));
        assert_eq!(session.count_models().unwrap(), None);
    }

    #[test]
    fn test_timeout_during_compilation_keeps_state() {
        use crate::queens::{row_coverage, threat_freedom, BoardSize, CellGrid};

        let mut session = Session::default();
        let grid = CellGrid::declare(&mut session, BoardSize::new(9).unwrap());
        let rows = row_coverage(&grid);
        session.add(rows[0].clone()).unwrap();
        assert_eq!(session.check().unwrap(), SatResult::Sat);
        let (compiled, root) = (session.compiled, session.root);

        // A single large constraint: the deadline can only fire inside ITE recursion.
        let queens = Formula::and(rows.into_iter().skip(1).chain(threat_freedom(&grid)));
        session.add(queens.clone()).unwrap();
        session.config = session.config.with_timeout(Some(Duration::from_millis(2)));
        let steps = session.bdd.steps();

        assert_eq!(session.check().unwrap(), SatResult::Unknown);
        assert!(session.bdd.steps() > steps);
        assert_eq!(session.compiled, compiled);
        assert_eq!(session.root, root);
        assert_eq!(session.model(), Err(SolverError::NoModel));

        session.config = session.config.with_timeout(None);
        assert_eq!(session.check().unwrap(), SatResult::Sat);
        assert_eq!(session.compiled, 2);
        let model = session.model().unwrap();
        assert!(model.eval(&queens).unwrap());
        assert_eq!(session.count_models().unwrap(), Some(BigUint::from(352u32)));
    }

    #[test]
    fn test_storage_exhaustion_is_error() {
        let config = SolverConfig::default().with_storage_bits(3).unwrap();
        let mut session = Session::new(config);
        let vars: Vec<Formula> = (0..6).map(|_| session.bool_var()).collect();
        session.add(Formula::or(vars.iter().cloned())).unwrap();
        session.add(Formula::and(vars.iter().cloned().map(|v| !v))).unwrap();
        session.add(Formula::or(vars.iter().cloned().map(|v| !v))).unwrap();

        let res = session.check();
        assert!(matches!(
            res,
            Err(SolverError::Engine(BddError::StorageFull { .. }))
        ));
    }

    #[test]
    fn test_incremental_check() {
        let mut session = Session::default();
        let p = session.new_var();
        session.add(Formula::var(p)).unwrap();
        assert_eq!(session.check().unwrap(), SatResult::Sat);
        assert!(session.model().unwrap().value(p).unwrap());

        session.add(!Formula::var(p)).unwrap();
        assert_eq!(session.check().unwrap(), SatResult::Unsat);
    }

    #[test]
    fn test_model_display() {
        let mut session = Session::default();
        let p = session.new_var();
        let _q = session.new_var();
        session.add(Formula::var(p)).unwrap();
        session.check().unwrap();
        assert_eq!(session.model().unwrap().to_string(), "[x1 = true, x2 = false]");
    }
}
