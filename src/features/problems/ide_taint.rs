//! Taint tracking with provenance: the same reachability shape as
//! [`ifds_taint`](crate::features::problems::ifds_taint), but the second
//! lattice records *which* source function tainted a value rather than a
//! bare yes/no, using the generic IDE edge-value machinery.

use crate::features::ir_db::Irdb;
use crate::features::problems::support::{forward_flow, IrIndex, ValueFact};
use crate::features::solvers::ide::{ConstantEdgeFunction, EdgeFunction, IdeProblem, IdeResult, IdeValue, IdentityEdgeFunction};
use crate::ir::{CallTarget, Opcode, ValueId};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaintLabel {
    Bottom,
    Source(String),
    /// More than one distinct source reaches the same fact.
    Top,
}

impl IdeValue for TaintLabel {
    fn top() -> Self {
        TaintLabel::Top
    }
    fn bottom() -> Self {
        TaintLabel::Bottom
    }
    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (TaintLabel::Bottom, v) | (v, TaintLabel::Bottom) => v.clone(),
            (TaintLabel::Top, _) | (_, TaintLabel::Top) => TaintLabel::Top,
            (TaintLabel::Source(a), TaintLabel::Source(b)) => {
                if a == b { TaintLabel::Source(a.clone()) } else { TaintLabel::Top }
            }
        }
    }
    fn is_top(&self) -> bool {
        matches!(self, TaintLabel::Top)
    }
    fn is_bottom(&self) -> bool {
        matches!(self, TaintLabel::Bottom)
    }
}

pub struct IdeTaintProblem<'a> {
    irdb: &'a Irdb,
    index: IrIndex,
    entry_points: Vec<String>,
    sources: FxHashMap<String, ()>,
}

impl<'a> IdeTaintProblem<'a> {
    pub fn new(irdb: &'a Irdb, entry_points: Vec<String>, sources: impl IntoIterator<Item = String>) -> Self {
        Self {
            irdb,
            index: IrIndex::build(irdb),
            entry_points,
            sources: sources.into_iter().map(|s| (s, ())).collect(),
        }
    }

    fn direct_call(&self, node_id: &str) -> Option<(&str, ValueId)> {
        match self.index.instruction(node_id) {
            Some(instr) => match &instr.opcode {
                Opcode::Call { target: CallTarget::Direct(name), .. } => Some((name.as_str(), instr.id)),
                _ => None,
            },
            None => None,
        }
    }

    /// `node -> provenance label` for every non-bottom value the IDE solver
    /// materialized.
    pub fn provenance(&self, result: &IdeResult<ValueFact, TaintLabel>) -> Vec<(String, ValueId, TaintLabel)> {
        let mut out = Vec::new();
        for node_id in result.reachable_nodes() {
            for fact in result.facts_at(node_id) {
                if let ValueFact::Tracked(v) = fact {
                    if let Some(label) = result.value_at(node_id, &ValueFact::Tracked(v)) {
                        if !label.is_bottom() {
                            out.push((node_id.to_string(), v, label.clone()));
                        }
                    }
                }
            }
        }
        out.sort_by(|a, b| (a.0.as_str(), a.1 .0).cmp(&(b.0.as_str(), b.1 .0)));
        out
    }
}

impl<'a> IdeProblem<ValueFact, TaintLabel> for IdeTaintProblem<'a> {
    fn initial_seeds(&self) -> Vec<(String, ValueFact, TaintLabel)> {
        self.entry_points
            .iter()
            .filter_map(|name| self.index.entry_node(self.irdb, name))
            .map(|node| (node, ValueFact::Zero, TaintLabel::bottom()))
            .collect()
    }

    fn normal_flow_function(&self, from: &str, _to: &str, source_fact: &ValueFact) -> Vec<ValueFact> {
        match source_fact {
            ValueFact::Zero => vec![ValueFact::Zero],
            ValueFact::Tracked(v) => match self.index.instruction(from) {
                Some(instr) => forward_flow(instr, *v).into_iter().map(ValueFact::Tracked).collect(),
                None => vec![ValueFact::Tracked(*v)],
            },
        }
    }

    fn call_flow_function(&self, _call_site: &str, _callee_entry: &str, source_fact: &ValueFact) -> Vec<ValueFact> {
        if source_fact.is_zero() { vec![ValueFact::Zero] } else { vec![] }
    }

    fn return_flow_function(
        &self,
        _callee_exit: &str,
        _return_site: &str,
        _call_site: &str,
        source_fact: &ValueFact,
    ) -> Vec<ValueFact> {
        if source_fact.is_zero() { vec![ValueFact::Zero] } else { vec![] }
    }

    fn call_to_return_flow_function(&self, call_site: &str, _return_site: &str, source_fact: &ValueFact) -> Vec<ValueFact> {
        let mut out = vec![source_fact.clone()];
        if source_fact.is_zero() {
            if let Some((name, id)) = self.direct_call(call_site) {
                if self.sources.contains_key(name) {
                    out.push(ValueFact::Tracked(id));
                }
            }
        }
        out
    }

    fn normal_edge_function(
        &self,
        _from: &str,
        _to: &str,
        _source_fact: &ValueFact,
        _target_fact: &ValueFact,
    ) -> Box<dyn EdgeFunction<TaintLabel>> {
        Box::new(IdentityEdgeFunction)
    }

    fn call_edge_function(
        &self,
        _call_site: &str,
        _callee_entry: &str,
        _source_fact: &ValueFact,
        _target_fact: &ValueFact,
    ) -> Box<dyn EdgeFunction<TaintLabel>> {
        Box::new(IdentityEdgeFunction)
    }

    fn return_edge_function(
        &self,
        _callee_exit: &str,
        _return_site: &str,
        _call_site: &str,
        _source_fact: &ValueFact,
        _target_fact: &ValueFact,
    ) -> Box<dyn EdgeFunction<TaintLabel>> {
        Box::new(IdentityEdgeFunction)
    }

    fn call_to_return_edge_function(
        &self,
        call_site: &str,
        _return_site: &str,
        source_fact: &ValueFact,
        target_fact: &ValueFact,
    ) -> Box<dyn EdgeFunction<TaintLabel>> {
        if source_fact.is_zero() {
            if let (Some((name, id)), ValueFact::Tracked(t)) = (self.direct_call(call_site), target_fact) {
                if self.sources.contains_key(name) && *t == id {
                    return Box::new(ConstantEdgeFunction::new(TaintLabel::Source(name.to_string())));
                }
            }
        }
        Box::new(IdentityEdgeFunction)
    }
}
