//! The BDD manager.
//!
//! All nodes live in a single unique table owned by [`Bdd`], so two equal
//! functions always get the same [`Ref`]. Edges may be complemented; the
//! high edge of a stored node never is, which keeps the representation
//! canonical. Variables are 1-indexed and their ids are their levels.
//!
//! Every constructive operation is fallible: the table has a fixed capacity
//! and the manager may carry a deadline.

use std::cell::{Cell, RefCell};
use std::cmp::min;
use std::collections::{HashSet, VecDeque};
use std::fmt::Debug;
use std::time::Instant;

use log::debug;

use crate::cache::Cache;
use crate::error::BddError;
use crate::reference::Ref;
use crate::table::Table;
use crate::types::{Lit, Var};
use crate::utils::{hash3, MyHash};

/// How many ITE steps run between two deadline polls.
const DEADLINE_POLL_INTERVAL: u64 = 256;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            variable: 0,
            low: Ref::positive(0),
            high: Ref::positive(0),
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        hash3(
            self.variable as u64,
            self.low.raw() as u64,
            self.high.raw() as u64,
        )
    }
}

pub struct Bdd {
    storage: RefCell<Table<Node>>,
    cache: RefCell<Cache<(Ref, Ref, Ref), Ref>>,
    deadline: Cell<Option<Instant>>,
    steps: Cell<u64>,
    one: Ref,
    zero: Ref,
}

impl Bdd {
    /// Create a manager with room for `2^storage_bits` nodes.
    pub fn new(storage_bits: usize) -> Self {
        Self::with_cache_bits(storage_bits, min(storage_bits, 16))
    }

    /// Create a manager with explicit unique table and computed table sizes.
    pub fn with_cache_bits(storage_bits: usize, cache_bits: usize) -> Self {
        assert!(
            (1..=31).contains(&storage_bits),
            "Storage bits should be in the range 1..=31"
        );

        let mut storage = Table::new(storage_bits);

        // Allocate the terminal node:
        let one = storage.put(Node::default());
        assert_eq!(one, Some(1), "Terminal node must be at index 1");
        let one = Ref::positive(1);
        let zero = -one;

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(cache_bits)),
            deadline: Cell::new(None),
            steps: Cell::new(0),
            one,
            zero,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(20)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Bdd")
            .field("capacity", &storage.capacity())
            .field("size", &storage.size())
            .field("steps", &self.steps.get())
            .finish()
    }
}

impl Bdd {
    pub fn one(&self) -> Ref {
        self.one
    }
    pub fn zero(&self) -> Ref {
        self.zero
    }

    pub fn cache(&self) -> std::cell::Ref<'_, Cache<(Ref, Ref, Ref), Ref>> {
        self.cache.borrow()
    }

    /// Number of allocated decision nodes (the terminal included).
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().size()
    }

    /// Number of ITE steps that missed the computed table so far.
    pub fn steps(&self) -> u64 {
        self.steps.get()
    }

    /// Abort operations with [`BddError::DeadlineExceeded`] once `deadline` passes.
    pub fn set_deadline(&self, deadline: Option<Instant>) {
        self.deadline.set(deadline);
    }

    /// Return an error if the deadline has already passed.
    pub fn check_deadline(&self) -> Result<(), BddError> {
        match self.deadline.get() {
            Some(deadline) if Instant::now() >= deadline => {
                debug!("deadline exceeded after {} steps", self.steps.get());
                Err(BddError::DeadlineExceeded {
                    steps: self.steps.get(),
                })
            }
            _ => Ok(()),
        }
    }

    fn tick(&self) -> Result<(), BddError> {
        let steps = self.steps.get() + 1;
        self.steps.set(steps);
        if steps % DEADLINE_POLL_INTERVAL == 0 {
            self.check_deadline()?;
        }
        Ok(())
    }

    /// Variable of the node, or 0 for the terminal.
    pub fn variable(&self, node: Ref) -> u32 {
        self.storage.borrow().value(node.index() as usize).variable
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.storage.borrow().value(node.index() as usize).low;
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.storage.borrow().value(node.index() as usize).high;
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == self.one.index()
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Result<Ref, BddError> {
        assert_ne!(v, 0, "Variable index should not be zero");

        // Handle duplicates
        if low == high {
            return Ok(low);
        }

        // Handle canonicity
        if high.is_negated() {
            return Ok(-self.mk_node(v, -low, -high)?);
        }

        let mut storage = self.storage.borrow_mut();
        let i = storage
            .put(Node {
                variable: v,
                low,
                high,
            })
            .ok_or(BddError::StorageFull {
                capacity: storage.capacity(),
            })?;
        Ok(Ref::positive(i as u32))
    }

    pub fn mk_var(&self, v: Var) -> Result<Ref, BddError> {
        self.mk_node(v.id(), self.zero, self.one)
    }

    /// Conjunction of the given literals.
    ///
    /// Literals must mention pairwise distinct variables; repeated literals are merged.
    pub fn mk_cube<L>(&self, literals: impl IntoIterator<Item = L>) -> Result<Ref, BddError>
    where
        L: Into<Lit>,
    {
        let mut literals: Vec<Lit> = literals.into_iter().map(Into::into).collect();
        literals.sort_by_key(|lit| std::cmp::Reverse(lit.var()));
        literals.dedup();
        let mut current = self.one;
        for lit in literals {
            let v = lit.var().id();
            current = if lit.is_negative() {
                self.mk_node(v, current, self.zero)?
            } else {
                self.mk_node(v, self.zero, current)?
            };
        }
        Ok(current)
    }

    /// Disjunction of the given literals.
    pub fn mk_clause<L>(&self, literals: impl IntoIterator<Item = L>) -> Result<Ref, BddError>
    where
        L: Into<Lit>,
    {
        let mut literals: Vec<Lit> = literals.into_iter().map(Into::into).collect();
        literals.sort_by_key(|lit| std::cmp::Reverse(lit.var()));
        literals.dedup();
        let mut current = self.zero;
        for lit in literals {
            let v = lit.var().id();
            current = if lit.is_negative() {
                self.mk_node(v, self.one, current)?
            } else {
                self.mk_node(v, current, self.one)?
            };
        }
        Ok(current)
    }

    /// Cofactors of `node` with respect to the top variable `v`.
    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        if self.is_terminal(node) || v < self.variable(node) {
            return (node, node);
        }
        debug_assert_eq!(v, self.variable(node));
        (self.low_node(node), self.high_node(node))
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    ///
    /// # Examples
    ///
    /// ```
    /// use nqueens_bdd::bdd::Bdd;
    /// use nqueens_bdd::types::Var;
    ///
    /// let bdd = Bdd::default();
    /// let x = bdd.mk_var(Var::new(1)).unwrap();
    /// let y = bdd.mk_var(Var::new(2)).unwrap();
    /// let z = bdd.mk_var(Var::new(3)).unwrap();
    /// let f = bdd.apply_ite(x, y, z).unwrap();
    /// let x_and_y = bdd.apply_and(x, y).unwrap();
    /// let not_x_and_z = bdd.apply_and(-x, z).unwrap();
    /// assert_eq!(f, bdd.apply_or(x_and_y, not_x_and_z).unwrap());
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Result<Ref, BddError> {
        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        if self.is_one(f) {
            return Ok(g);
        }
        if self.is_zero(f) {
            return Ok(h);
        }

        // From now on, F is known not to be a constant.

        // More base cases:
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        //   ite(F,0,1) => ~F
        if g == h {
            return Ok(g);
        }
        if self.is_one(g) && self.is_zero(h) {
            return Ok(f);
        }
        if self.is_zero(g) && self.is_one(h) {
            return Ok(-f);
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,~F) => ite(F,G,1)
        if g == f {
            return self.apply_ite(f, self.one, h);
        }
        if h == f {
            return self.apply_ite(f, g, self.zero);
        }
        if g == -f {
            return self.apply_ite(f, self.zero, h);
        }
        if h == -f {
            return self.apply_ite(f, g, self.one);
        }

        let i = self.variable(f);
        let j = self.variable(g);
        let k = self.variable(h);

        // Equivalent pairs (choose the one with the lowest top variable):
        //   ite(F,1,H) == ite(H,1,F) == F ∨ H
        //   ite(F,G,0) == ite(G,F,0) == F ∧ G
        //   ite(F,G,1) == ite(~G,~F,1) == F -> G
        //   ite(F,0,H) == ite(~H,0,~F) == ~F ∧ H
        //   ite(F,G,~G) == ite(G,F,~F)
        // The base cases above guarantee that the swapped-in argument is not terminal.
        if self.is_one(g) && k < i {
            return self.apply_ite(h, self.one, f);
        }
        if self.is_zero(h) && j < i {
            return self.apply_ite(g, f, self.zero);
        }
        if self.is_one(h) && j < i {
            return self.apply_ite(-g, -f, self.one);
        }
        if self.is_zero(g) && k < i {
            return self.apply_ite(-h, self.zero, -f);
        }
        if g == -h && j < i {
            return self.apply_ite(g, f, -f);
        }

        // Make sure the first two arguments are regular:
        //   ite(~F,G,H) => ite(F,H,G)
        //   ite(F,~G,H) => ~ite(F,G,~H)
        let (mut f, mut g, mut h) = (f, g, h);
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }
        let negate = g.is_negated();
        if negate {
            g = -g;
            h = -h;
        }

        let key = (f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return Ok(if negate { -res } else { res });
        }

        self.tick()?;

        // Determine the top variable:
        let mut m = self.variable(f);
        for v in [self.variable(g), self.variable(h)] {
            if v != 0 {
                m = m.min(v);
            }
        }
        debug_assert_ne!(m, 0);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0)?;
        let t = self.apply_ite(f1, g1, h1)?;

        let res = self.mk_node(m, e, t)?;
        self.cache.borrow_mut().insert(key, res);

        Ok(if negate { -res } else { res })
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        self.apply_ite(u, v, self.zero)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        self.apply_ite(u, self.one, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Result<Ref, BddError> {
        self.apply_ite(u, v, self.one)
    }

    /// Conjunction of all `nodes`; stops early once the result is `zero`.
    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Result<Ref, BddError> {
        let mut res = self.one;
        for node in nodes {
            res = self.apply_and(res, node)?;
            if self.is_zero(res) {
                break;
            }
        }
        Ok(res)
    }

    /// Disjunction of all `nodes`; stops early once the result is `one`.
    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Result<Ref, BddError> {
        let mut res = self.zero;
        for node in nodes {
            res = self.apply_or(res, node)?;
            if self.is_one(res) {
                break;
            }
        }
        Ok(res)
    }

    /// Indices of all nodes reachable from `nodes`, the terminal included.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<u32> {
        let mut visited = HashSet::new();
        visited.insert(self.one.index());
        let mut queue = VecDeque::from_iter(nodes);

        while let Some(node) = queue.pop_front() {
            if visited.insert(node.index()) {
                queue.push_back(self.low_node(node));
                queue.push_back(self.high_node(node));
            }
        }

        visited
    }

    /// Number of nodes in the graph of `f`, the terminal included.
    pub fn size(&self, f: Ref) -> usize {
        self.descendants([f]).len()
    }

    pub fn to_bracket_string(&self, node: Ref) -> String {
        if self.is_zero(node) {
            return "(0)".to_string();
        } else if self.is_one(node) {
            return "(1)".to_string();
        }

        format!(
            "{}:(x{}, {}, {})",
            node,
            self.variable(node),
            self.to_bracket_string(self.high_node(node)),
            self.to_bracket_string(self.low_node(node))
        )
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn var(bdd: &Bdd, v: u32) -> Ref {
        bdd.mk_var(Var::new(v)).unwrap()
    }

    #[test]
    fn test_var() {
        let bdd = Bdd::default();

        let x = var(&bdd, 1);

        assert_eq!(bdd.variable(x), 1);
        assert_eq!(bdd.high_node(x), bdd.one());
        assert_eq!(bdd.low_node(x), bdd.zero());
    }

    #[test]
    fn test_not_var() {
        let bdd = Bdd::default();

        let x = var(&bdd, 1);
        let not_x = bdd.apply_not(x);

        assert_eq!(bdd.variable(not_x), 1);
        assert_eq!(bdd.high_node(not_x), bdd.zero());
        assert_eq!(bdd.low_node(not_x), bdd.one());
    }

    #[test]
    fn test_terminal() {
        let bdd = Bdd::default();

        assert!(bdd.is_terminal(bdd.zero()));
        assert!(bdd.is_zero(bdd.zero()));
        assert!(!bdd.is_one(bdd.zero()));

        assert!(bdd.is_terminal(bdd.one()));
        assert!(!bdd.is_zero(bdd.one()));
        assert!(bdd.is_one(bdd.one()));

        assert_eq!(bdd.variable(bdd.zero()), 0);
        assert_eq!(bdd.variable(bdd.one()), 0);
    }

    #[test]
    fn test_hash_consing() {
        let bdd = Bdd::default();

        let x1 = var(&bdd, 1);
        let again = var(&bdd, 1);
        assert_eq!(x1, again);
        assert_eq!(bdd.num_nodes(), 2);
    }

    #[test]
    fn test_cube() {
        let bdd = Bdd::default();

        let x1 = var(&bdd, 1);
        let x2 = var(&bdd, 2);
        let x3 = var(&bdd, 3);

        let f = bdd.apply_and_many([x1, x2, x3]).unwrap();
        assert_eq!(f, bdd.mk_cube([1, 2, 3]).unwrap());

        let f = bdd.apply_and_many([x1, -x2, -x3]).unwrap();
        assert_eq!(f, bdd.mk_cube([-3, 1, -2]).unwrap());
    }

    #[test]
    fn test_clause() {
        let bdd = Bdd::default();

        let x1 = var(&bdd, 1);
        let x2 = var(&bdd, 2);
        let x3 = var(&bdd, 3);

        let f = bdd.apply_or_many([x1, x2, x3]).unwrap();
        assert_eq!(f, bdd.mk_clause([1, 2, 3]).unwrap());

        let f = bdd.apply_or_many([x1, -x2, -x3]).unwrap();
        assert_eq!(f, bdd.mk_clause([1, -2, -3]).unwrap());
    }

    #[test]
    fn test_de_morgan() {
        let bdd = Bdd::default();

        let x = var(&bdd, 1);
        let y = var(&bdd, 2);

        let f = -bdd.apply_and(x, y).unwrap();
        let g = bdd.apply_or(-x, -y).unwrap();
        assert_eq!(f, g);

        let f = -bdd.apply_or(x, y).unwrap();
        let g = bdd.apply_and(-x, -y).unwrap();
        assert_eq!(f, g);
    }

    #[test]
    fn test_xor() {
        let bdd = Bdd::default();

        let x = var(&bdd, 1);
        let y = var(&bdd, 2);
        let f = bdd.apply_and(x, y).unwrap();

        assert_eq!(bdd.apply_xor(f, f).unwrap(), bdd.zero());
        assert_eq!(bdd.apply_xor(f, -f).unwrap(), bdd.one());
        assert_eq!(bdd.apply_xor(x, y).unwrap(), -bdd.apply_eq(x, y).unwrap());
    }

    #[test]
    fn test_imply() {
        let bdd = Bdd::default();

        let x = var(&bdd, 1);
        let y = var(&bdd, 2);

        let f = bdd.apply_imply(x, y).unwrap();
        assert_eq!(f, bdd.apply_or(-x, y).unwrap());
        assert_eq!(bdd.apply_imply(bdd.zero(), x).unwrap(), bdd.one());
        assert_eq!(bdd.apply_imply(x, x).unwrap(), bdd.one());
    }

    #[test]
    fn test_apply_ite() {
        let bdd = Bdd::default();

        // Terminal cases
        let g = var(&bdd, 2);
        let h = var(&bdd, 3);
        assert_eq!(bdd.apply_ite(bdd.one(), g, h).unwrap(), g);
        assert_eq!(bdd.apply_ite(bdd.zero(), g, h).unwrap(), h);

        // Standard triples
        let f = bdd.mk_node(1, bdd.one(), h).unwrap();
        assert_eq!(bdd.apply_ite(f, f, h).unwrap(), bdd.apply_or(f, h).unwrap());
        assert_eq!(bdd.apply_ite(f, g, f).unwrap(), bdd.apply_and(f, g).unwrap());
        assert_eq!(
            bdd.apply_ite(f, -g, bdd.one()).unwrap(),
            -bdd.apply_and(f, g).unwrap()
        );
        assert_eq!(
            bdd.apply_ite(f, bdd.zero(), -h).unwrap(),
            -bdd.apply_or(f, h).unwrap()
        );

        // Constants
        let f = var(&bdd, 5);
        assert_eq!(bdd.apply_ite(f, g, g).unwrap(), g);
        assert_eq!(bdd.apply_ite(f, bdd.one(), bdd.zero()).unwrap(), f);
        assert_eq!(bdd.apply_ite(f, bdd.zero(), bdd.one()).unwrap(), -f);

        // General case
        let f = var(&bdd, 6);
        let g = var(&bdd, 7);
        let h = var(&bdd, 8);
        let result = bdd.mk_node(6, -g, -h).unwrap();
        assert_eq!(bdd.apply_ite(-f, -g, -h).unwrap(), result);
    }

    #[test]
    fn test_canonical_high_edge() {
        let bdd = Bdd::default();

        let x = var(&bdd, 1);
        let y = var(&bdd, 2);
        let f = bdd.apply_xor(x, y).unwrap();

        for node in [f, -f, bdd.apply_or(x, -y).unwrap()] {
            let regular = node.regular();
            let high = bdd.high_node(regular);
            assert!(!high.is_negated(), "{} has a complemented high edge", regular);
        }
    }

    #[test]
    fn test_size() {
        let bdd = Bdd::default();

        let f = bdd.mk_cube([1, 2, 3]).unwrap();
        assert_eq!(bdd.size(f), 4);
        assert_eq!(bdd.size(-f), 4);
        assert_eq!(bdd.size(bdd.one()), 1);
        println!("f = {}", bdd.to_bracket_string(f));
    }

    #[test]
    fn test_storage_full() {
        let bdd = Bdd::new(2);

        let x1 = var(&bdd, 1);
        let x2 = var(&bdd, 2);
        let res = bdd.apply_and(x1, x2);
        assert_eq!(res, Err(BddError::StorageFull { capacity: 4 }));
    }

    #[test]
    fn test_deadline() {
        let bdd = Bdd::default();
        bdd.set_deadline(Some(Instant::now()));
        assert!(matches!(
            bdd.check_deadline(),
            Err(BddError::DeadlineExceeded { .. })
        ));

        bdd.set_deadline(None);
        assert_eq!(bdd.check_deadline(), Ok(()));
    }

    #[test]
    fn test_deadline_polled_during_ite() {
        let bdd = Bdd::default();
        let vars: Vec<Ref> = (1..=64).map(|v| var(&bdd, v)).collect();
        bdd.set_deadline(Some(Instant::now()));

        // Parity chain: every step misses the cache once per level.
        let mut f = bdd.zero();
        let mut res = Ok(());
        for &x in &vars {
            match bdd.apply_xor(f, x) {
                Ok(g) => f = g,
                Err(e) => {
                    res = Err(e);
                    break;
                }
            }
        }
        assert_eq!(
            res,
            Err(BddError::DeadlineExceeded {
                steps: DEADLINE_POLL_INTERVAL
            })
        );
    }

    #[test]
    fn test_cache_hits() {
        let bdd = Bdd::default();

        let x = var(&bdd, 1);
        let y = var(&bdd, 2);
        let z = var(&bdd, 3);
        let f = bdd.apply_and(bdd.apply_or(x, y).unwrap(), z).unwrap();
        let hits = bdd.cache().hits();
        let g = bdd.apply_and(bdd.apply_or(x, y).unwrap(), z).unwrap();
        assert_eq!(f, g);
        assert!(bdd.cache().hits() > hits);
    }
}
