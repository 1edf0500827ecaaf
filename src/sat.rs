use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::reference::Ref;
use crate::types::{Lit, Var};

impl Bdd {
    /// Returns one satisfying assignment for the BDD, if any exists.
    ///
    /// The assignment is returned as a vector of literals along one path to
    /// the terminal; variables not on the path are unconstrained.
    ///
    /// Returns `None` if the BDD represents the constant false function.
    pub fn one_sat(&self, node: Ref) -> Option<Vec<Lit>> {
        if self.is_zero(node) {
            return None;
        }

        let mut path = Vec::new();
        let mut current = node;

        // Walk down the BDD, always picking a satisfying branch.
        // Every non-zero node has at least one non-zero child.
        while !self.is_one(current) {
            let var = Var::new(self.variable(current));
            let high = self.high_node(current);
            let low = self.low_node(current);

            // Prefer the low branch, otherwise take high
            if !self.is_zero(low) {
                path.push(var.neg());
                current = low;
            } else {
                path.push(var.pos());
                current = high;
            }
        }

        Some(path)
    }

    /// Number of satisfying assignments of `node` over variables `1..=num_vars`.
    ///
    /// `num_vars` must be at least the largest variable id in `node`.
    pub fn sat_count(&self, node: Ref, num_vars: usize) -> BigUint {
        let max = BigUint::from(1u32) << num_vars;
        let mut cache = HashMap::new();
        let count = self.sat_count_regular(node.regular(), &max, &mut cache);
        if node.is_negated() {
            &max - count
        } else {
            count
        }
    }

    fn sat_count_regular(
        &self,
        node: Ref,
        max: &BigUint,
        cache: &mut HashMap<u32, BigUint>,
    ) -> BigUint {
        debug_assert!(!node.is_negated());

        if self.is_one(node) {
            return max.clone();
        }

        if let Some(count) = cache.get(&node.index()) {
            return count.clone();
        }

        let count_of = |child: Ref, cache: &mut HashMap<u32, BigUint>| {
            let count = self.sat_count_regular(child.regular(), max, cache);
            if child.is_negated() {
                max - count
            } else {
                count
            }
        };

        let count_low = count_of(self.low_node(node), cache);
        let count_high = count_of(self.high_node(node), cache);

        // Each branch covers half of the assignments.
        let count: BigUint = (count_low + count_high) >> 1;

        cache.insert(node.index(), count.clone());
        count
    }
}
