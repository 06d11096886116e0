//! Flow-insensitive alias oracle: a Steensgaard-style
//! union-find partition of pointer-typed values, computed per module.
//!
//! Treated as an external collaborator contracted only by its result shape
//! (a partition of values). Unification is deliberately coarse — one class per
//! "pointer and whatever flows through it" rather than a separate points-to
//! set per pointer — since the framework only needs a stable partition to
//! build per-function PTGs and to restrict `PointsTo`-resolved indirect
//! calls, not maximal precision.

use crate::ir::{Module, Opcode, ValueId};
use rustc_hash::FxHashMap;

/// Union-find over `ValueId`, path-compressed on find.
#[derive(Debug, Default)]
pub struct AliasPartition {
    parent: FxHashMap<ValueId, ValueId>,
    rank: FxHashMap<ValueId, u32>,
}

impl AliasPartition {
    pub fn new() -> Self {
        Self::default()
    }

    fn make_set(&mut self, v: ValueId) {
        self.parent.entry(v).or_insert(v);
        self.rank.entry(v).or_insert(0);
    }

    fn find(&mut self, v: ValueId) -> ValueId {
        self.make_set(v);
        let p = self.parent[&v];
        if p == v {
            return v;
        }
        let root = self.find(p);
        self.parent.insert(v, root);
        root
    }

    fn union(&mut self, a: ValueId, b: ValueId) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        // Union-by-rank with the lower ValueId as tie-break so the result
        // is deterministic independent of call order.
        let (rank_a, rank_b) = (self.rank[&ra], self.rank[&rb]);
        let (winner, loser) = match rank_a.cmp(&rank_b) {
            std::cmp::Ordering::Greater => (ra, rb),
            std::cmp::Ordering::Less => (rb, ra),
            std::cmp::Ordering::Equal => {
                if ra.0 <= rb.0 {
                    (ra, rb)
                } else {
                    (rb, ra)
                }
            }
        };
        self.parent.insert(loser, winner);
        if rank_a == rank_b {
            *self.rank.get_mut(&winner).unwrap() += 1;
        }
    }

    /// Materialize `value -> representative` for every value seen.
    pub fn into_representatives(mut self) -> FxHashMap<ValueId, ValueId> {
        let values: Vec<ValueId> = self.parent.keys().copied().collect();
        values.into_iter().map(|v| (v, self.find(v))).collect()
    }
}

/// Run the Steensgaard-style oracle over every function in a module, in
/// database order, and return the resulting value partition.
pub fn analyze_module(module: &Module) -> FxHashMap<ValueId, ValueId> {
    let mut uf = AliasPartition::new();
    for function in &module.functions {
        for instruction in function.instructions() {
            match &instruction.opcode {
                Opcode::Alloca => uf.make_set(instruction.id),
                Opcode::Load { pointer } => {
                    uf.make_set(instruction.id);
                    uf.union(instruction.id, *pointer);
                }
                Opcode::Store { pointer, value } => {
                    uf.union(*pointer, *value);
                }
                Opcode::Identity { value } => {
                    uf.union(instruction.id, *value);
                }
                _ => {}
            }
        }
    }
    uf.into_representatives()
}
