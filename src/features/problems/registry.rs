//! The string-keyed analysis registry and the JSON result
//! shape the controller exports. Recognized names map to a
//! tagged `AnalysisProblem`, a capability-set enum rather than a trait
//! object: the four solver families are parametric over different fact and
//! value types that can't share one vtable, so each variant instead carries
//! the already-monomorphized solve-and-report closure for its family.

use crate::config::AnalysisName;
use crate::errors::{FrameworkError, Result};
use crate::features::cfg::Cfg;
use crate::features::icfg::IcfgGraph;
use crate::features::ir_db::Irdb;
use crate::features::problems::ide_solvertest::IdeSolverTestProblem;
use crate::features::problems::ide_taint::IdeTaintProblem;
use crate::features::problems::ifds_solvertest::IfdsSolverTestProblem;
use crate::features::problems::ifds_taint::IfdsTaintProblem;
use crate::features::problems::ifds_type::IfdsTypeProblem;
use crate::features::problems::ifds_uninit::IfdsUninitProblem;
use crate::features::problems::mono_inter_solvertest::MonoInterSolverTestProblem;
use crate::features::problems::mono_intra_fullconstpropagation::FullConstPropagationProblem;
use crate::features::problems::mono_intra_solvertest::MonoIntraSolverTestProblem;
use crate::features::problems::none::NoneAnalysis;
use crate::features::solvers::ide::IdeSolver;
use crate::features::solvers::ifds::IfdsSolver;
use crate::features::solvers::mono_inter::InterMonotoneSolver;
use crate::features::solvers::mono_intra::IntraMonotoneSolver;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// One node's contribution to a result document.
#[derive(Debug, Clone, Serialize)]
pub struct NodeResult {
    pub node_id: String,
    pub facts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_values: Option<Vec<String>>,
}

/// `{analysis, results: [...]}`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    pub analysis: String,
    pub results: Vec<NodeResult>,
}

/// A constructed, not-yet-run analysis, tagged by solver family.
pub enum AnalysisProblem<'a> {
    Ifds(Box<dyn FnOnce() -> AnalysisOutput + 'a>),
    Ide(Box<dyn FnOnce() -> AnalysisOutput + 'a>),
    IntraMonotone(Box<dyn FnOnce() -> AnalysisOutput + 'a>),
    InterMonotone(Box<dyn FnOnce() -> AnalysisOutput + 'a>),
    None(Box<dyn FnOnce() -> AnalysisOutput + 'a>),
}

impl<'a> AnalysisProblem<'a> {
    pub fn family(&self) -> &'static str {
        match self {
            AnalysisProblem::Ifds(_) => "ifds",
            AnalysisProblem::Ide(_) => "ide",
            AnalysisProblem::IntraMonotone(_) => "intra_monotone",
            AnalysisProblem::InterMonotone(_) => "inter_monotone",
            AnalysisProblem::None(_) => "none",
        }
    }

    pub fn run(self) -> AnalysisOutput {
        match self {
            AnalysisProblem::Ifds(f)
            | AnalysisProblem::Ide(f)
            | AnalysisProblem::IntraMonotone(f)
            | AnalysisProblem::InterMonotone(f)
            | AnalysisProblem::None(f) => f(),
        }
    }
}

/// What a registry factory needs to build any recognized analysis: the
/// database, the ICFG it was asked to solve over, and the entry-point set.
pub struct AnalysisContext<'a> {
    pub irdb: &'a Irdb,
    pub icfg: Option<&'a IcfgGraph>,
    pub entry_points: &'a [String],
}

/// Declarations named by convention stand in for the per-analysis parameter
/// lists (taint source/sink names, constructor/expected-type names) a real
/// driver would carry explicitly; `RunConfig` has no such surface, so
/// the registry infers them from declaration names (`source_*`/`sink_*` for
/// taint, `new_*`/`expect_*` for type checking) -- see DESIGN.md.
fn declared_names(irdb: &Irdb) -> Vec<String> {
    let mut names: Vec<String> = irdb
        .modules()
        .flat_map(|m| m.functions.iter())
        .filter(|f| f.is_declaration())
        .map(|f| f.name.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}

fn taint_sources(irdb: &Irdb) -> Vec<String> {
    const BUILTIN: &[&str] = &["read_input", "getenv", "recv", "fgets", "scanf"];
    declared_names(irdb).into_iter().filter(|n| n.starts_with("source_") || BUILTIN.contains(&n.as_str())).collect()
}

fn taint_sinks(irdb: &Irdb) -> Vec<String> {
    const BUILTIN: &[&str] = &["run_query", "system", "exec", "popen", "sprintf"];
    declared_names(irdb).into_iter().filter(|n| n.starts_with("sink_") || BUILTIN.contains(&n.as_str())).collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn type_constructors(irdb: &Irdb) -> FxHashMap<String, String> {
    let mut out = FxHashMap::default();
    for name in declared_names(irdb) {
        if let Some(rest) = name.strip_prefix("new_") {
            let ty = capitalize(rest);
            out.insert(name, ty);
        }
    }
    out
}

fn type_expectations(irdb: &Irdb) -> FxHashMap<String, (usize, String)> {
    let mut out = FxHashMap::default();
    for name in declared_names(irdb) {
        if let Some(rest) = name.strip_prefix("expect_") {
            let ty = capitalize(rest);
            out.insert(name, (0usize, ty));
        }
    }
    out
}

fn require_icfg<'a>(ctx: &AnalysisContext<'a>, analysis: &str) -> Result<&'a IcfgGraph> {
    ctx.icfg.ok_or_else(|| FrameworkError::SolverPrecondition(format!("{analysis} requires a built ICFG")))
}

/// Construct (but do not run) the analysis named by `name`. Unknown
/// names are rejected earlier, at config time, by [`AnalysisName::parse`].
pub fn build<'a>(name: AnalysisName, ctx: &AnalysisContext<'a>) -> Result<AnalysisProblem<'a>> {
    let irdb = ctx.irdb;
    let entry_points = ctx.entry_points.to_vec();

    match name {
        AnalysisName::IfdsUninit => {
            let icfg = require_icfg(ctx, "ifds_uninit")?;
            Ok(AnalysisProblem::Ifds(Box::new(move || {
                let problem = IfdsUninitProblem::new(irdb, entry_points);
                let result = IfdsSolver::new(Box::new(&problem), icfg).solve(&|| false);
                let findings = problem.findings(&result);
                AnalysisOutput {
                    analysis: AnalysisName::IfdsUninit.as_str().to_string(),
                    results: findings
                        .into_iter()
                        .map(|node_id| NodeResult { node_id, facts: vec!["uninitialized_load".to_string()], edge_values: None })
                        .collect(),
                }
            })))
        }

        AnalysisName::IfdsTaint => {
            let icfg = require_icfg(ctx, "ifds_taint")?;
            let sources = taint_sources(irdb);
            let sinks = taint_sinks(irdb);
            Ok(AnalysisProblem::Ifds(Box::new(move || {
                let problem = IfdsTaintProblem::new(irdb, entry_points, sources, sinks);
                let result = IfdsSolver::new(Box::new(&problem), icfg).solve(&|| false);
                let findings = problem.findings(&result);
                AnalysisOutput {
                    analysis: AnalysisName::IfdsTaint.as_str().to_string(),
                    results: findings
                        .into_iter()
                        .map(|node_id| NodeResult { node_id, facts: vec!["tainted_sink_argument".to_string()], edge_values: None })
                        .collect(),
                }
            })))
        }

        AnalysisName::IfdsType => {
            let icfg = require_icfg(ctx, "ifds_type")?;
            let constructors = type_constructors(irdb);
            let expected = type_expectations(irdb);
            Ok(AnalysisProblem::Ifds(Box::new(move || {
                let problem = IfdsTypeProblem::new(irdb, entry_points, constructors, expected);
                let result = IfdsSolver::new(Box::new(&problem), icfg).solve(&|| false);
                let findings = problem.findings(&result);
                AnalysisOutput {
                    analysis: AnalysisName::IfdsType.as_str().to_string(),
                    results: findings
                        .into_iter()
                        .map(|node_id| NodeResult { node_id, facts: vec!["type_mismatch".to_string()], edge_values: None })
                        .collect(),
                }
            })))
        }

        AnalysisName::IfdsSolverTest => {
            let icfg = require_icfg(ctx, "ifds_solvertest")?;
            Ok(AnalysisProblem::Ifds(Box::new(move || {
                let problem = IfdsSolverTestProblem::new(irdb, entry_points);
                let result = IfdsSolver::new(Box::new(&problem), icfg).solve(&|| false);
                let mut node_ids: Vec<&str> = result.reachable_nodes().into_iter().collect();
                node_ids.sort_unstable();
                AnalysisOutput {
                    analysis: AnalysisName::IfdsSolverTest.as_str().to_string(),
                    results: node_ids
                        .into_iter()
                        .map(|node_id| NodeResult { node_id: node_id.to_string(), facts: vec!["zero".to_string()], edge_values: None })
                        .collect(),
                }
            })))
        }

        AnalysisName::IdeTaint => {
            let icfg = require_icfg(ctx, "ide_taint")?;
            let sources = taint_sources(irdb);
            Ok(AnalysisProblem::Ide(Box::new(move || {
                let problem = IdeTaintProblem::new(irdb, entry_points, sources);
                let result = IdeSolver::new(Box::new(&problem), icfg).solve(&|| false);
                let mut provenance = problem.provenance(&result);
                provenance.sort_by(|a, b| a.0.cmp(&b.0));
                AnalysisOutput {
                    analysis: AnalysisName::IdeTaint.as_str().to_string(),
                    results: provenance
                        .into_iter()
                        .map(|(node_id, value, label)| NodeResult {
                            node_id,
                            facts: vec![format!("{value:?}")],
                            edge_values: Some(vec![format!("{label:?}")]),
                        })
                        .collect(),
                }
            })))
        }

        AnalysisName::IdeSolverTest => {
            let icfg = require_icfg(ctx, "ide_solvertest")?;
            Ok(AnalysisProblem::Ide(Box::new(move || {
                let problem = IdeSolverTestProblem::new(irdb, entry_points);
                let result = IdeSolver::new(Box::new(&problem), icfg).solve(&|| false);
                let mut node_ids: Vec<&str> = result.reachable_nodes().into_iter().collect();
                node_ids.sort_unstable();
                AnalysisOutput {
                    analysis: AnalysisName::IdeSolverTest.as_str().to_string(),
                    results: node_ids
                        .into_iter()
                        .map(|node_id| NodeResult { node_id: node_id.to_string(), facts: vec!["zero".to_string()], edge_values: None })
                        .collect(),
                }
            })))
        }

        AnalysisName::MonoIntraFullConstPropagation => {
            let function_name = entry_points.first().cloned().unwrap_or_else(|| "main".to_string());
            Ok(AnalysisProblem::IntraMonotone(Box::new(move || {
                let Some(function) = irdb.function(&function_name) else {
                    return AnalysisOutput { analysis: AnalysisName::MonoIntraFullConstPropagation.as_str().to_string(), results: vec![] };
                };
                let cfg = Cfg::build(function);
                let problem = FullConstPropagationProblem::new(irdb, function_name.clone());
                let result = IntraMonotoneSolver::new(Box::new(&problem), &cfg).solve();
                let mut node_ids: Vec<&str> = cfg.node_ids().collect();
                node_ids.sort_unstable();
                let results = node_ids
                    .into_iter()
                    .filter_map(|node_id| {
                        let idx = cfg.index_of(node_id)?;
                        let env = result.out_at(idx)?;
                        Some(NodeResult { node_id: node_id.to_string(), facts: vec![format!("{env:?}")], edge_values: None })
                    })
                    .collect();
                AnalysisOutput { analysis: AnalysisName::MonoIntraFullConstPropagation.as_str().to_string(), results }
            })))
        }

        AnalysisName::MonoIntraSolverTest => {
            let function_name = entry_points.first().cloned().unwrap_or_else(|| "main".to_string());
            Ok(AnalysisProblem::IntraMonotone(Box::new(move || {
                let Some(function) = irdb.function(&function_name) else {
                    return AnalysisOutput { analysis: AnalysisName::MonoIntraSolverTest.as_str().to_string(), results: vec![] };
                };
                let cfg = Cfg::build(function);
                let result = IntraMonotoneSolver::new(Box::new(MonoIntraSolverTestProblem), &cfg).solve();
                let mut node_ids: Vec<&str> = cfg.node_ids().collect();
                node_ids.sort_unstable();
                let results = node_ids
                    .into_iter()
                    .filter_map(|node_id| {
                        let idx = cfg.index_of(node_id)?;
                        let reached = result.out_at(idx)?;
                        Some(NodeResult { node_id: node_id.to_string(), facts: vec![format!("{reached:?}")], edge_values: None })
                    })
                    .collect();
                AnalysisOutput { analysis: AnalysisName::MonoIntraSolverTest.as_str().to_string(), results }
            })))
        }

        AnalysisName::MonoInterSolverTest => {
            let icfg = require_icfg(ctx, "mono_inter_solvertest")?;
            Ok(AnalysisProblem::InterMonotone(Box::new(move || {
                let problem = MonoInterSolverTestProblem::new(irdb, entry_points);
                let result = InterMonotoneSolver::new(Box::new(&problem), icfg, 2).solve();
                let mut node_ids: Vec<&str> = icfg.node_ids().collect();
                node_ids.sort_unstable();
                let results = node_ids
                    .into_iter()
                    .filter_map(|node_id| {
                        let reached = result.joined_fact_at(node_id)?;
                        Some(NodeResult { node_id: node_id.to_string(), facts: vec![format!("{reached:?}")], edge_values: None })
                    })
                    .collect();
                AnalysisOutput { analysis: AnalysisName::MonoInterSolverTest.as_str().to_string(), results }
            })))
        }

        AnalysisName::None => {
            let icfg = require_icfg(ctx, "none")?;
            Ok(AnalysisProblem::None(Box::new(move || {
                let report = NoneAnalysis::run(icfg);
                AnalysisOutput {
                    analysis: AnalysisName::None.as_str().to_string(),
                    results: vec![NodeResult {
                        node_id: "<graph>".to_string(),
                        facts: vec![
                            format!("nodes={}", report.node_count),
                            format!("edges={}", report.edge_count),
                            format!("call_sites={}", report.call_site_count),
                            format!("unresolved_calls={}", report.unresolved_call_count),
                        ],
                        edge_values: None,
                    }],
                }
            })))
        }
    }
}
