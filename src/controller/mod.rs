//! Controller (Dispatcher). Composes the components above per the selected
//! composition mode and analysis list, the way the reference
//! pipeline orchestrator composes its own fixed stage sequence: construct
//! with a config, then walk the stages in order from a single `run` call.
//!
//! Unlike that orchestrator, the stages here aren't swappable strategy
//! objects — the solver family is picked per analysis name out of the
//! registry, not injected at construction — so there's no matching
//! generic-parameter-per-stage shape here.

pub mod state;

use crate::config::{AnalysisName, CompositionMode, RunConfig};
use crate::errors::{Diagnostic, FrameworkError, Result};
use crate::features::class_hierarchy::ClassHierarchy;
use crate::features::icfg::{merge_icfgs, IcfgBuilder, IcfgGraph, ResolveStrategy, WalkerStrategy};
use crate::features::ir_db::Irdb;
use crate::features::preanalysis;
use crate::features::problems::{self, AnalysisContext, AnalysisOutput};
use crate::ir::{Context, Module};
pub use state::ControllerState;

/// A named Graphviz DOT diagnostic artifact, returned for the
/// caller to write rather than written by the controller itself — nothing
/// in this crate touches the filesystem except the `dfa` binary.
pub struct DotArtifact {
    pub filename: String,
    pub dot: String,
}

/// Everything a single `run()` produced: the result document per analysis,
/// diagnostics gathered along the way (broken modules, failed solvers),
/// any requested DOT artifacts, and whether a required module came back
/// broken.
/// `BrokenModule` itself is a logged diagnostic, not an `Err`; the
/// controller resolves "required" against its entry-point list while the
/// `Irdb` is still in scope, before `run()` returns it to the caller.
pub struct RunOutcome {
    pub outputs: Vec<AnalysisOutput>,
    pub diagnostics: Vec<Diagnostic>,
    pub dot_artifacts: Vec<DotArtifact>,
    pub required_module_broken: bool,
}

/// Composes the IR database, pre-analyzer, class hierarchy, ICFG builder
/// and analysis registry into the fixed WPA/MW pipeline.
pub struct Controller {
    irdb: Irdb,
    config: RunConfig,
    state: ControllerState,
}

impl Controller {
    pub fn new(config: RunConfig) -> Self {
        crate::logging::init();
        Self { irdb: Irdb::new(), config, state: ControllerState::Init }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Add one input module before `run()`. Mirrors `Irdb::add_module`'s
    /// `DuplicateModule` check so link conflicts surface before any
    /// pipeline work begins.
    pub fn add_module(&mut self, module: Module, context: Context) -> Result<()> {
        self.irdb.add_module(module, context)
    }

    /// Runs pre-analysis, builds the ICFG(s) per the configured mode, then
    /// every requested analysis in order.
    pub fn run(mut self) -> Result<RunOutcome> {
        let mut diagnostics = self.pre_analyze();
        let required_module_broken = diagnostics.iter().any(|d| match d {
            Diagnostic::BrokenModule { module_id } => self
                .config
                .entry_points
                .iter()
                .any(|ep| self.irdb.module_defining(ep).map(|m| &m.id) == Some(module_id)),
            _ => false,
        });
        let result = match self.config.mode {
            CompositionMode::Wpa => self.run_wpa(),
            CompositionMode::Mw => self.run_mw(),
        };
        let (outputs, dot_artifacts, mut run_diagnostics) = result?;
        diagnostics.append(&mut run_diagnostics);
        self.state = ControllerState::Done;
        Ok(RunOutcome { outputs, diagnostics, dot_artifacts, required_module_broken })
    }

    fn pre_analyze(&mut self) -> Vec<Diagnostic> {
        let report = preanalysis::run(&mut self.irdb, self.config.mem2reg_mode);
        let mut diagnostics = Vec::new();
        for module_id in report.broken_modules {
            diagnostics.push(Diagnostic::BrokenModule { module_id });
        }
        for module_id in report.broken_debug_info {
            diagnostics.push(Diagnostic::BrokenDebugInfo { module_id });
        }
        tracing::info!(
            functions = report.totals.function_count,
            instructions = report.totals.instruction_count,
            indirect_call_sites = report.totals.indirect_call_sites,
            "pre-analysis complete"
        );
        self.state = ControllerState::PreAnalyzed;
        diagnostics
    }

    fn run_wpa(&mut self) -> Result<(Vec<AnalysisOutput>, Vec<DotArtifact>, Vec<Diagnostic>)> {
        self.irdb.link_for_wpa()?;
        let ch = ClassHierarchy::build(&self.irdb);
        let icfg = IcfgBuilder::new(&self.irdb, &ch, WalkerStrategy::Pointer, ResolveStrategy::PointsTo)
            .build(&self.config.entry_points)?;
        self.state = ControllerState::IcfgBuilt;
        self.state = ControllerState::Solving;

        let mut outputs = Vec::new();
        let mut diagnostics = Vec::new();
        for name in self.config.analyses.iter().copied() {
            let ctx = AnalysisContext { irdb: &self.irdb, icfg: Some(&icfg), entry_points: &self.config.entry_points };
            match problems::build(name, &ctx) {
                Ok(problem) => outputs.push(problem.run()),
                Err(err) => {
                    tracing::warn!(analysis = name.as_str(), error = %err, "analysis failed, continuing batch");
                    diagnostics.push(Diagnostic::SolverFailed { analysis: name.as_str().to_string(), error: err.to_string() });
                }
            }
        }

        let dot_artifacts = if self.config.print_edge_recorder {
            vec![DotArtifact { filename: "interproc_cfg.dot".to_string(), dot: icfg.to_dot() }]
        } else {
            Vec::new()
        };
        Ok((outputs, dot_artifacts, diagnostics))
    }

    fn run_mw(&mut self) -> Result<(Vec<AnalysisOutput>, Vec<DotArtifact>, Vec<Diagnostic>)> {
        let ch = ClassHierarchy::build(&self.irdb);
        let module_ids: Vec<String> = self.irdb.module_ids().map(|s| s.to_string()).collect();

        let mut per_module: Vec<(String, IcfgGraph)> = Vec::new();
        for module_id in &module_ids {
            let Some(module) = self.irdb.module(module_id) else { continue };
            let entries: Vec<String> =
                module.functions.iter().filter(|f| !f.is_declaration()).map(|f| f.name.clone()).collect();
            if entries.is_empty() {
                continue;
            }
            let scope: std::collections::HashSet<String> = entries.iter().cloned().collect();
            let icfg = IcfgBuilder::new(&self.irdb, &ch, WalkerStrategy::Pointer, ResolveStrategy::PointsTo)
                .with_module_scope(scope)
                .build(&entries)?;
            per_module.push((module_id.clone(), icfg));
        }
        self.state = ControllerState::PerModuleIcfgs;
        self.state = ControllerState::Solving;

        let mut outputs = Vec::new();
        let mut diagnostics = Vec::new();
        let mut dot_artifacts = Vec::new();

        for name in self.config.analyses.iter().copied() {
            if name != AnalysisName::None {
                tracing::warn!(analysis = name.as_str(), "MW mode supports only the `none` analysis, skipping");
                diagnostics.push(Diagnostic::SolverFailed {
                    analysis: name.as_str().to_string(),
                    error: FrameworkError::NotImplemented(name.as_str().to_string()).to_string(),
                });
                continue;
            }
            for (module_id, icfg) in &per_module {
                let ctx = AnalysisContext { irdb: &self.irdb, icfg: Some(icfg), entry_points: &self.config.entry_points };
                let problem = problems::build(name, &ctx)?;
                let mut output = problem.run();
                output.analysis = format!("{}@{module_id}", output.analysis);
                outputs.push(output);
                if self.config.print_edge_recorder {
                    dot_artifacts.push(DotArtifact { filename: format!("icfg_{module_id}.dot"), dot: icfg.to_dot() });
                }
            }
        }

        if let Some((first_id, first)) = per_module.first() {
            let mut merged = first.clone();
            let mut merged_ids = vec![first_id.clone()];
            for (module_id, icfg) in per_module.iter().skip(1) {
                merged = merge_icfgs(&self.irdb, &ch, WalkerStrategy::Pointer, ResolveStrategy::PointsTo, merged, icfg.clone());
                merged_ids.push(module_id.clone());
            }
            self.state = ControllerState::Merged;

            if self.config.analyses.contains(&AnalysisName::None) {
                let ctx = AnalysisContext { irdb: &self.irdb, icfg: Some(&merged), entry_points: &self.config.entry_points };
                let problem = problems::build(AnalysisName::None, &ctx)?;
                let mut output = problem.run();
                output.analysis = format!("{}@merged({})", output.analysis, merged_ids.join(","));
                outputs.push(output);
            }
            if self.config.print_edge_recorder {
                dot_artifacts.push(DotArtifact { filename: "icfg_after_merge.dot".to_string(), dot: merged.to_dot() });
            }
        } else {
            self.state = ControllerState::Merged;
        }

        Ok((outputs, dot_artifacts, diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BasicBlock, CallTarget, Function, Instruction, Linkage, Opcode, ValueId};

    fn ret_module(id: &str, fname: &str) -> Module {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(Instruction::new(ValueId(0), Opcode::Ret { value: None }));
        Module::new(id).with_function(Function { name: fname.to_string(), linkage: Linkage::Strong, params: vec![], blocks: vec![block] })
    }

    fn caller_callee_module(id: &str) -> Module {
        let mut caller_block = BasicBlock::new("entry");
        caller_block.instructions.push(Instruction::new(
            ValueId(0),
            Opcode::Call { target: CallTarget::Direct("callee".to_string()), args: vec![] },
        ));
        caller_block.instructions.push(Instruction::new(ValueId(1), Opcode::Ret { value: None }));
        let mut callee_block = BasicBlock::new("entry");
        callee_block.instructions.push(Instruction::new(ValueId(2), Opcode::Ret { value: None }));
        Module::new(id)
            .with_function(Function { name: "main".to_string(), linkage: Linkage::Strong, params: vec![], blocks: vec![caller_block] })
            .with_function(Function { name: "callee".to_string(), linkage: Linkage::Strong, params: vec![], blocks: vec![callee_block] })
    }

    #[test]
    fn wpa_none_reports_one_result_after_reaching_done() {
        let config = RunConfig::default().wpa(true).with_analysis_names(["none"]).unwrap();
        let mut controller = Controller::new(config);
        controller.add_module(caller_callee_module("m1"), Context::new(1)).unwrap();
        let outcome = controller.run().unwrap();
        assert_eq!(outcome.outputs.len(), 1);
        assert_eq!(outcome.outputs[0].analysis, "none");
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn mw_merges_two_modules_and_runs_none_over_the_merge() {
        let config = RunConfig::default().wpa(false).with_analysis_names(["none"]).unwrap();
        let mut controller = Controller::new(config);
        controller.add_module(ret_module("m1", "a"), Context::new(1)).unwrap();
        controller.add_module(ret_module("m2", "b"), Context::new(2)).unwrap();
        let outcome = controller.run().unwrap();
        // One `none` result per module plus one over the merged graph.
        assert_eq!(outcome.outputs.len(), 3);
        assert!(outcome.outputs.iter().any(|o| o.analysis.starts_with("none@merged(")));
    }

    /// Concrete scenario: a two-module program where `main` (in its own
    /// module) calls `foo`, defined in a separate module. MW mode, `none`
    /// requested. Expected per spec.md: `icfg_main.dot`, `icfg_foo.dot`,
    /// `icfg_after_merge.dot`, and the merged ICFG's call site from
    /// `main` resolved against `foo`'s entry (no longer an
    /// `unresolved_call`, despite each per-module ICFG seeing it that way
    /// on its own since `foo` is out of `main`'s module scope).
    #[test]
    fn mw_merged_icfg_resolves_the_cross_module_call_from_main_to_foo() {
        let mut main_block = BasicBlock::new("entry");
        main_block.instructions.push(Instruction::new(
            ValueId(0),
            Opcode::Call { target: CallTarget::Direct("foo".to_string()), args: vec![] },
        ));
        main_block.instructions.push(Instruction::new(ValueId(1), Opcode::Ret { value: None }));
        let main_module = Module::new("main").with_function(Function {
            name: "main".to_string(),
            linkage: Linkage::Strong,
            params: vec![],
            blocks: vec![main_block],
        });
        let mut foo_block = BasicBlock::new("entry");
        foo_block.instructions.push(Instruction::new(ValueId(2), Opcode::Ret { value: None }));
        let foo_module = Module::new("foo").with_function(Function {
            name: "foo".to_string(),
            linkage: Linkage::Strong,
            params: vec![],
            blocks: vec![foo_block],
        });

        let config = RunConfig::default()
            .wpa(false)
            .mem2reg(false)
            .edge_recorder(true)
            .with_analysis_names(["none"])
            .unwrap()
            .entry_points(vec!["main".to_string(), "foo".to_string()]);
        let mut controller = Controller::new(config);
        controller.add_module(main_module, Context::new(1)).unwrap();
        controller.add_module(foo_module, Context::new(2)).unwrap();
        let outcome = controller.run().unwrap();

        let mut filenames: Vec<&str> = outcome.dot_artifacts.iter().map(|a| a.filename.as_str()).collect();
        filenames.sort_unstable();
        assert_eq!(filenames, vec!["icfg_after_merge.dot", "icfg_foo.dot", "icfg_main.dot"]);

        // Each per-module ICFG alone cannot resolve the cross-module call
        // (`foo` is out of `main`'s module scope).
        let per_module_main = outcome.outputs.iter().find(|o| o.analysis == "none@main").unwrap();
        assert!(per_module_main.results[0].facts.iter().any(|f| f == "unresolved_calls=1"));

        // The merged graph resolves it: zero unresolved calls, and at
        // least one call site total.
        let merged = outcome.outputs.iter().find(|o| o.analysis.starts_with("none@merged(")).unwrap();
        assert!(merged.results[0].facts.iter().any(|f| f == "call_sites=1"));
        assert!(merged.results[0].facts.iter().any(|f| f == "unresolved_calls=0"));

        let merged_dot = &outcome.dot_artifacts.iter().find(|a| a.filename == "icfg_after_merge.dot").unwrap().dot;
        assert!(merged_dot.contains("[label=\"call\"]"));
        assert!(!merged_dot.contains("[label=\"unresolved_call\"]"));
    }

    #[test]
    fn mw_skips_unsupported_analyses_and_records_a_diagnostic() {
        let config = RunConfig::default().wpa(false).with_analysis_names(["ifds_uninit"]).unwrap();
        let mut controller = Controller::new(config);
        controller.add_module(ret_module("m1", "a"), Context::new(1)).unwrap();
        let outcome = controller.run().unwrap();
        assert!(outcome.outputs.is_empty());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(matches!(&outcome.diagnostics[0], Diagnostic::SolverFailed { analysis, .. } if analysis == "ifds_uninit"));
    }

    #[test]
    fn wpa_ifds_uninit_finds_the_load_before_store() {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(Instruction::new(ValueId(0), Opcode::Alloca));
        block.instructions.push(Instruction::new(ValueId(1), Opcode::Load { pointer: ValueId(0) }));
        block.instructions.push(Instruction::new(ValueId(2), Opcode::Ret { value: None }));
        let module = Module::new("m1").with_function(Function {
            name: "main".to_string(),
            linkage: Linkage::Strong,
            params: vec![],
            blocks: vec![block],
        });

        let config = RunConfig::default().wpa(true).with_analysis_names(["ifds_uninit"]).unwrap();
        let mut controller = Controller::new(config);
        controller.add_module(module, Context::new(1)).unwrap();
        let outcome = controller.run().unwrap();
        assert_eq!(outcome.outputs.len(), 1);
        assert_eq!(outcome.outputs[0].analysis, "ifds_uninit");
    }
}
