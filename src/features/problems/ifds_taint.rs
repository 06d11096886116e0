//! Source-to-sink taint tracking: a direct call to one of `sources` taints
//! its own result value; the taint is forwarded through assignments, loads,
//! stores, and binary operations (`support::forward_flow`); a direct call
//! to one of `sinks` whose argument is tainted at that point is a finding.
//! Library calls are observed entirely at their call-to-return edge since
//! source/sink functions are declarations with no resolvable call/return
//! edge of their own.

use crate::features::ir_db::Irdb;
use crate::features::problems::support::{ForwardTrackFlow, IrIndex, ValueFact};
use crate::features::solvers::ifds::{DataflowFact, FlowFunction, IdentityFlow, IfdsProblem, IfdsResult};
use crate::ir::{CallTarget, Opcode, ValueId};
use std::collections::HashSet;

/// `{zero} -> {zero, Tracked(gen)}` at a source call's return site, identity
/// otherwise. `gen` is `None` for an ordinary call-to-return edge.
struct CallToReturnFlow {
    gen: Option<ValueId>,
}

impl FlowFunction<ValueFact> for CallToReturnFlow {
    fn compute(&self, input: &ValueFact) -> HashSet<ValueFact> {
        let mut out = HashSet::from([*input]);
        if input.is_zero() {
            if let Some(gen) = self.gen {
                out.insert(ValueFact::Tracked(gen));
            }
        }
        out
    }
}

struct ZeroOnlyFlow;

impl FlowFunction<ValueFact> for ZeroOnlyFlow {
    fn compute(&self, input: &ValueFact) -> HashSet<ValueFact> {
        if input.is_zero() { HashSet::from([ValueFact::Zero]) } else { HashSet::new() }
    }
}

pub struct IfdsTaintProblem<'a> {
    irdb: &'a Irdb,
    index: IrIndex,
    entry_points: Vec<String>,
    sources: HashSet<String>,
    sinks: HashSet<String>,
}

impl<'a> IfdsTaintProblem<'a> {
    pub fn new(
        irdb: &'a Irdb,
        entry_points: Vec<String>,
        sources: impl IntoIterator<Item = String>,
        sinks: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            irdb,
            index: IrIndex::build(irdb),
            entry_points,
            sources: sources.into_iter().collect(),
            sinks: sinks.into_iter().collect(),
        }
    }

    fn direct_call_target(&self, node_id: &str) -> Option<(&str, &[ValueId])> {
        match self.index.instruction(node_id).map(|i| &i.opcode) {
            Some(Opcode::Call { target: CallTarget::Direct(name), args }) => Some((name.as_str(), args.as_slice())),
            _ => None,
        }
    }

    /// Sink call-site node ids where at least one argument is tainted.
    pub fn findings(&self, result: &IfdsResult<ValueFact>) -> Vec<String> {
        let mut out = Vec::new();
        for node_id in result.reachable_nodes() {
            let Some((name, args)) = self.direct_call_target(node_id) else { continue };
            if !self.sinks.contains(name) {
                continue;
            }
            let facts = result.facts_at(node_id);
            if args.iter().any(|a| facts.contains(&ValueFact::Tracked(*a))) {
                out.push(node_id.to_string());
            }
        }
        out.sort();
        out
    }
}

impl<'a> IfdsProblem<ValueFact> for IfdsTaintProblem<'a> {
    fn initial_seeds(&self) -> Vec<(String, ValueFact)> {
        self.entry_points
            .iter()
            .filter_map(|name| self.index.entry_node(self.irdb, name))
            .map(|node| (node, ValueFact::Zero))
            .collect()
    }

    fn normal_flow(&self, from: &str, _to: &str) -> Box<dyn FlowFunction<ValueFact>> {
        Box::new(ForwardTrackFlow { instr: self.index.instruction(from).cloned() })
    }

    fn call_flow(&self, _call_site: &str, _callee_entry: &str) -> Box<dyn FlowFunction<ValueFact>> {
        Box::new(ZeroOnlyFlow)
    }

    fn return_flow(
        &self,
        _callee_exit: &str,
        _return_site: &str,
        _call_site: &str,
    ) -> Box<dyn FlowFunction<ValueFact>> {
        Box::new(ZeroOnlyFlow)
    }

    fn call_to_return_flow(&self, call_site: &str, _return_site: &str) -> Box<dyn FlowFunction<ValueFact>> {
        let gen = self.direct_call_target(call_site).and_then(|(name, _)| {
            self.sources.contains(name).then(|| self.index.instruction(call_site).map(|i| i.id)).flatten()
        });
        if gen.is_some() {
            Box::new(CallToReturnFlow { gen })
        } else {
            Box::new(IdentityFlow)
        }
    }
}
