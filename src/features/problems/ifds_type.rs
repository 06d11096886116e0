//! Concrete-type propagation: a direct call to a known constructor
//! produces a value of a statically-known runtime type; the fact is
//! forwarded through assignments the same way taint is (`support::forward_flow`)
//! and checked at call sites that declare an expected parameter type,
//! flagging a mismatch.

use crate::features::ir_db::Irdb;
use crate::features::problems::support::{forward_flow, IrIndex};
use crate::features::solvers::ifds::{DataflowFact, FlowFunction, IdentityFlow, IfdsProblem, IfdsResult};
use crate::ir::{CallTarget, Opcode, ValueId};
use rustc_hash::FxHashMap;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeFact {
    Zero,
    Typed(ValueId, String),
}

impl DataflowFact for TypeFact {
    fn is_zero(&self) -> bool {
        matches!(self, TypeFact::Zero)
    }
    fn zero() -> Self {
        TypeFact::Zero
    }
}

struct ForwardTypeFlow {
    instr: Option<crate::ir::Instruction>,
}

impl FlowFunction<TypeFact> for ForwardTypeFlow {
    fn compute(&self, input: &TypeFact) -> HashSet<TypeFact> {
        match (input, &self.instr) {
            (TypeFact::Zero, _) => HashSet::from([TypeFact::Zero]),
            (TypeFact::Typed(v, ty), Some(instr)) => {
                forward_flow(instr, *v).into_iter().map(|id| TypeFact::Typed(id, ty.clone())).collect()
            }
            (TypeFact::Typed(v, ty), None) => HashSet::from([TypeFact::Typed(*v, ty.clone())]),
        }
    }
}

struct GenTypeFlow {
    id: ValueId,
    ty: String,
}

impl FlowFunction<TypeFact> for GenTypeFlow {
    fn compute(&self, input: &TypeFact) -> HashSet<TypeFact> {
        let mut out = HashSet::from([input.clone()]);
        if input.is_zero() {
            out.insert(TypeFact::Typed(self.id, self.ty.clone()));
        }
        out
    }
}

struct ZeroOnlyFlow;

impl FlowFunction<TypeFact> for ZeroOnlyFlow {
    fn compute(&self, input: &TypeFact) -> HashSet<TypeFact> {
        if input.is_zero() { HashSet::from([TypeFact::Zero]) } else { HashSet::new() }
    }
}

pub struct IfdsTypeProblem<'a> {
    irdb: &'a Irdb,
    index: IrIndex,
    entry_points: Vec<String>,
    /// Constructor function name -> the concrete type it produces.
    constructors: FxHashMap<String, String>,
    /// Sink function name -> (argument index, expected type).
    expected: FxHashMap<String, (usize, String)>,
}

impl<'a> IfdsTypeProblem<'a> {
    pub fn new(
        irdb: &'a Irdb,
        entry_points: Vec<String>,
        constructors: FxHashMap<String, String>,
        expected: FxHashMap<String, (usize, String)>,
    ) -> Self {
        Self { irdb, index: IrIndex::build(irdb), entry_points, constructors, expected }
    }

    fn direct_call(&self, node_id: &str) -> Option<(&str, &[ValueId])> {
        match self.index.instruction(node_id).map(|i| &i.opcode) {
            Some(Opcode::Call { target: CallTarget::Direct(name), args }) => Some((name.as_str(), args.as_slice())),
            _ => None,
        }
    }

    /// Sink call-site node ids whose expected argument is known to carry a
    /// type other than the one declared.
    pub fn findings(&self, result: &IfdsResult<TypeFact>) -> Vec<String> {
        let mut out = Vec::new();
        for node_id in result.reachable_nodes() {
            let Some((name, args)) = self.direct_call(node_id) else { continue };
            let Some((idx, expected_ty)) = self.expected.get(name) else { continue };
            let Some(&arg) = args.get(*idx) else { continue };
            let facts = result.facts_at(node_id);
            let observed: Vec<&String> = facts
                .iter()
                .filter_map(|f| match f {
                    TypeFact::Typed(v, ty) if *v == arg => Some(ty),
                    _ => None,
                })
                .collect();
            if observed.iter().any(|ty| *ty != expected_ty) {
                out.push(node_id.to_string());
            }
        }
        out.sort();
        out
    }
}

impl<'a> IfdsProblem<TypeFact> for IfdsTypeProblem<'a> {
    fn initial_seeds(&self) -> Vec<(String, TypeFact)> {
        self.entry_points
            .iter()
            .filter_map(|name| self.index.entry_node(self.irdb, name))
            .map(|node| (node, TypeFact::Zero))
            .collect()
    }

    fn normal_flow(&self, from: &str, _to: &str) -> Box<dyn FlowFunction<TypeFact>> {
        Box::new(ForwardTypeFlow { instr: self.index.instruction(from).cloned() })
    }

    fn call_flow(&self, _call_site: &str, _callee_entry: &str) -> Box<dyn FlowFunction<TypeFact>> {
        Box::new(ZeroOnlyFlow)
    }

    fn return_flow(
        &self,
        _callee_exit: &str,
        _return_site: &str,
        _call_site: &str,
    ) -> Box<dyn FlowFunction<TypeFact>> {
        Box::new(ZeroOnlyFlow)
    }

    fn call_to_return_flow(&self, call_site: &str, _return_site: &str) -> Box<dyn FlowFunction<TypeFact>> {
        match self.direct_call(call_site) {
            Some((name, _)) if self.constructors.contains_key(name) => Box::new(GenTypeFlow {
                id: self.index.instruction(call_site).map(|i| i.id).unwrap_or(ValueId(0)),
                ty: self.constructors[name].clone(),
            }),
            _ => Box::new(IdentityFlow),
        }
    }
}
