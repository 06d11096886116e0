//! Points-to Graph
//!
//! Per-function graph of alias classes over IR values: nodes are pointer
//! values, an undirected edge says "may alias in this function". Built from
//! the whole-module alias oracle's partition, restricted to
//! one function's values.

use crate::ir::ValueId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Points-to graph for a single function.
///
/// Construction is idempotent given a stable alias oracle: calling
/// `from_partition` twice with the same partition and value set yields
/// graphs with identical `representative()` results for every value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointsToGraph {
    /// value -> alias-class representative (union-find result, already
    /// path-compressed by the oracle).
    representative: FxHashMap<ValueId, ValueId>,
    /// representative -> members, kept for edge enumeration / export.
    classes: FxHashMap<ValueId, Vec<ValueId>>,
}

impl PointsToGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a PTG for one function by restricting a whole-module alias
    /// partition (value -> representative) to the values that function owns.
    pub fn from_partition(
        partition: &FxHashMap<ValueId, ValueId>,
        function_values: impl IntoIterator<Item = ValueId>,
    ) -> Self {
        let mut ptg = Self::new();
        for value in function_values {
            let rep = *partition.get(&value).unwrap_or(&value);
            ptg.representative.insert(value, rep);
            ptg.classes.entry(rep).or_default().push(value);
        }
        ptg
    }

    pub fn representative(&self, value: ValueId) -> ValueId {
        *self.representative.get(&value).unwrap_or(&value)
    }

    /// Two values may alias in this function iff they share a representative.
    pub fn may_alias(&self, a: ValueId, b: ValueId) -> bool {
        self.representative(a) == self.representative(b)
    }

    pub fn values(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.representative.keys().copied()
    }

    /// All values that may alias `value` (its alias class, including itself).
    pub fn alias_class(&self, value: ValueId) -> &[ValueId] {
        let rep = self.representative(value);
        self.classes.get(&rep).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Undirected edges of the graph: all distinct pairs within each alias
    /// class. Used for `.dot` export and tests; not on the hot path.
    pub fn edges(&self) -> Vec<(ValueId, ValueId)> {
        let mut out = Vec::new();
        for members in self.classes.values() {
            for i in 0..members.len() {
                for j in (i + 1)..members.len() {
                    out.push((members[i], members[j]));
                }
            }
        }
        out
    }

    pub fn node_count(&self) -> usize {
        self.representative.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u32) -> ValueId {
        ValueId(n)
    }

    #[test]
    fn values_in_same_class_alias() {
        let mut partition = FxHashMap::default();
        partition.insert(v(1), v(1));
        partition.insert(v(2), v(1));
        partition.insert(v(3), v(3));

        let ptg = PointsToGraph::from_partition(&partition, [v(1), v(2), v(3)]);
        assert!(ptg.may_alias(v(1), v(2)));
        assert!(!ptg.may_alias(v(1), v(3)));
        assert_eq!(ptg.edges().len(), 1);
    }

    #[test]
    fn construction_is_idempotent() {
        let mut partition = FxHashMap::default();
        partition.insert(v(1), v(1));
        partition.insert(v(2), v(1));

        let a = PointsToGraph::from_partition(&partition, [v(1), v(2)]);
        let b = PointsToGraph::from_partition(&partition, [v(1), v(2)]);
        assert_eq!(a.representative(v(1)), b.representative(v(1)));
        assert_eq!(a.representative(v(2)), b.representative(v(2)));
    }

    #[test]
    fn unknown_value_aliases_only_itself() {
        let partition = FxHashMap::default();
        let ptg = PointsToGraph::from_partition(&partition, [v(9)]);
        assert!(ptg.may_alias(v(9), v(9)));
        assert!(!ptg.may_alias(v(9), v(10)));
    }
}
