//! A classic constant-propagation lattice over stack slots (`Alloca`
//! results), shared by the monotone-framework test problems. Height 2:
//! `Bottom` (not yet observed) -> `Const(n)` -> `Top` (conflicting writes),
//! so `meet(Const(2), Const(2)) == Const(2)` rather than widening on every
//! revisit of a loop back-edge.

use crate::features::solvers::mono_intra::MonotoneLattice;
use crate::ir::ValueId;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstValue {
    Bottom,
    Const(i64),
    Top,
}

impl ConstValue {
    pub fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (ConstValue::Bottom, v) | (v, ConstValue::Bottom) => *v,
            (ConstValue::Top, _) | (_, ConstValue::Top) => ConstValue::Top,
            (ConstValue::Const(a), ConstValue::Const(b)) => {
                if a == b {
                    ConstValue::Const(*a)
                } else {
                    ConstValue::Top
                }
            }
        }
    }
}

/// Per-slot constant environment. Keyed on the `Alloca`'s `ValueId`, not on
/// every SSA value, since this problem tracks stack slots the way a
/// pre-mem2reg pass would see them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstEnv(pub FxHashMap<ValueId, ConstValue>);

impl ConstEnv {
    pub fn get(&self, slot: ValueId) -> ConstValue {
        self.0.get(&slot).copied().unwrap_or(ConstValue::Bottom)
    }

    pub fn with(mut self, slot: ValueId, value: ConstValue) -> Self {
        self.0.insert(slot, value);
        self
    }
}

impl MonotoneLattice for ConstEnv {
    fn bottom() -> Self {
        ConstEnv::default()
    }

    fn join(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (&slot, &v) in &other.0 {
            let joined = out.get(slot).join(&v);
            out.0.insert(slot, joined);
        }
        out
    }
}

/// Parses the `const:<slot>:<n>` convention this problem's fixtures use in
/// place of a literal-producing opcode (the IR surface has none): `slot` is
/// the target `Alloca`'s `ValueId.0`, `n` the `i64` constant stored there.
pub fn parse_const_store(other: &str) -> Option<(ValueId, i64)> {
    let rest = other.strip_prefix("const:")?;
    let (slot, n) = rest.split_once(':')?;
    Some((ValueId(slot.parse().ok()?), n.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn meet_same_constant_does_not_widen() {
        let a = ConstValue::Const(2);
        assert_eq!(a.join(&a), ConstValue::Const(2));
    }

    #[test]
    fn meet_different_constants_goes_top() {
        assert_eq!(ConstValue::Const(2).join(&ConstValue::Const(3)), ConstValue::Top);
    }

    #[test]
    fn parses_const_store_convention() {
        assert_eq!(parse_const_store("const:3:2"), Some((ValueId(3), 2)));
        assert_eq!(parse_const_store("other"), None);
    }

    fn arb_const_value() -> impl Strategy<Value = ConstValue> {
        prop_oneof![
            Just(ConstValue::Bottom),
            Just(ConstValue::Top),
            any::<i64>().prop_map(ConstValue::Const),
        ]
    }

    proptest! {
        // Bottom is the join identity for any lattice element.
        #[test]
        fn prop_bottom_is_join_identity(v in arb_const_value()) {
            prop_assert_eq!(v.join(&ConstValue::Bottom), v);
            prop_assert_eq!(ConstValue::Bottom.join(&v), v);
        }

        // Height-2 lattice: join is commutative.
        #[test]
        fn prop_join_is_commutative(a in arb_const_value(), b in arb_const_value()) {
            prop_assert_eq!(a.join(&b), b.join(&a));
        }

        // Join is associative, so worklist revisit order cannot change the
        // fixed point a monotone analysis converges to.
        #[test]
        fn prop_join_is_associative(a in arb_const_value(), b in arb_const_value(), c in arb_const_value()) {
            prop_assert_eq!(a.join(&b).join(&c), a.join(&b.join(&c)));
        }

        // Join is idempotent: re-observing the same value never changes
        // the result, which is what keeps a loop from widening past a
        // stable constant.
        #[test]
        fn prop_join_is_idempotent(a in arb_const_value()) {
            prop_assert_eq!(a.join(&a), a);
        }

        // Once a slot reaches `Top` no further join can bring it back down
        // the lattice -- `Top` is absorbing.
        #[test]
        fn prop_top_is_absorbing(a in arb_const_value()) {
            prop_assert_eq!(a.join(&ConstValue::Top), ConstValue::Top);
        }
    }
}
