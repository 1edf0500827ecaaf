//! Boolean formulas over solver variables.
//!
//! A [`Formula`] is a plain syntax tree. It is only turned into a BDD when a
//! session is checked, via [`Formula::to_bdd`].

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::ops::{BitAnd, BitOr, Not};

use crate::bdd::Bdd;
use crate::error::BddError;
use crate::reference::Ref;
use crate::types::Var;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Formula {
    Const(bool),
    Var(Var),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
}

impl Formula {
    pub fn constant(value: bool) -> Self {
        Formula::Const(value)
    }

    pub fn var(var: Var) -> Self {
        Formula::Var(var)
    }

    /// Negation; folds constants and double negations.
    pub fn not(value: Self) -> Self {
        match value {
            Formula::Const(b) => Formula::Const(!b),
            Formula::Not(inner) => *inner,
            _ => Formula::Not(Box::new(value)),
        }
    }

    /// Conjunction of all `values`. The empty conjunction is `true`.
    pub fn and(values: impl IntoIterator<Item = Self>) -> Self {
        Formula::And(values.into_iter().collect())
    }

    /// Disjunction of all `values`. The empty disjunction is `false`.
    pub fn or(values: impl IntoIterator<Item = Self>) -> Self {
        Formula::Or(values.into_iter().collect())
    }

    pub fn implies(lhs: Self, rhs: Self) -> Self {
        Formula::Implies(Box::new(lhs), Box::new(rhs))
    }

    /// Evaluate the formula under the given assignment.
    pub fn eval(&self, value: &impl Fn(Var) -> bool) -> bool {
        match self {
            Formula::Const(b) => *b,
            Formula::Var(v) => value(*v),
            Formula::Not(a) => !a.eval(value),
            Formula::And(xs) => xs.iter().all(|x| x.eval(value)),
            Formula::Or(xs) => xs.iter().any(|x| x.eval(value)),
            Formula::Implies(a, b) => !a.eval(value) || b.eval(value),
        }
    }

    /// All variables mentioned in the formula.
    pub fn vars(&self) -> BTreeSet<Var> {
        let mut vars = BTreeSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut BTreeSet<Var>) {
        match self {
            Formula::Const(_) => {}
            Formula::Var(v) => {
                vars.insert(*v);
            }
            Formula::Not(a) => a.collect_vars(vars),
            Formula::And(xs) | Formula::Or(xs) => {
                for x in xs {
                    x.collect_vars(vars);
                }
            }
            Formula::Implies(a, b) => {
                a.collect_vars(vars);
                b.collect_vars(vars);
            }
        }
    }

    /// Build the BDD of this formula in `bdd`.
    pub fn to_bdd(&self, bdd: &Bdd) -> Result<Ref, BddError> {
        match self {
            Formula::Const(true) => Ok(bdd.one()),
            Formula::Const(false) => Ok(bdd.zero()),
            Formula::Var(v) => bdd.mk_var(*v),
            Formula::Not(a) => Ok(bdd.apply_not(a.to_bdd(bdd)?)),
            Formula::And(xs) => {
                let mut res = bdd.one();
                for x in xs {
                    res = bdd.apply_and(res, x.to_bdd(bdd)?)?;
                    if bdd.is_zero(res) {
                        break;
                    }
                }
                Ok(res)
            }
            Formula::Or(xs) => {
                let mut res = bdd.zero();
                for x in xs {
                    res = bdd.apply_or(res, x.to_bdd(bdd)?)?;
                    if bdd.is_one(res) {
                        break;
                    }
                }
                Ok(res)
            }
            Formula::Implies(a, b) => {
                let a = a.to_bdd(bdd)?;
                if bdd.is_zero(a) {
                    return Ok(bdd.one());
                }
                bdd.apply_imply(a, b.to_bdd(bdd)?)
            }
        }
    }
}

impl From<Var> for Formula {
    fn from(var: Var) -> Self {
        Formula::Var(var)
    }
}

impl Not for Formula {
    type Output = Formula;

    fn not(self) -> Self::Output {
        Formula::not(self)
    }
}

impl BitAnd for Formula {
    type Output = Formula;

    fn bitand(self, rhs: Self) -> Self::Output {
        match self {
            Formula::And(mut xs) => {
                xs.push(rhs);
                Formula::And(xs)
            }
            lhs => Formula::And(vec![lhs, rhs]),
        }
    }
}

impl BitOr for Formula {
    type Output = Formula;

    fn bitor(self, rhs: Self) -> Self::Output {
        match self {
            Formula::Or(mut xs) => {
                xs.push(rhs);
                Formula::Or(xs)
            }
            lhs => Formula::Or(vec![lhs, rhs]),
        }
    }
}

// SMT-LIB flavoured s-expressions.
impl Display for Formula {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn list(f: &mut Formatter<'_>, op: &str, xs: &[Formula]) -> std::fmt::Result {
            write!(f, "({}", op)?;
            for x in xs {
                write!(f, " {}", x)?;
            }
            write!(f, ")")
        }

        match self {
            Formula::Const(b) => write!(f, "{}", b),
            Formula::Var(v) => write!(f, "{}", v),
            Formula::Not(a) => write!(f, "(not {})", a),
            Formula::And(xs) => list(f, "and", xs),
            Formula::Or(xs) => list(f, "or", xs),
            Formula::Implies(a, b) => write!(f, "(=> {} {})", a, b),
        }
    }
}
