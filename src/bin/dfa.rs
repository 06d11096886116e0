//! `dfa`: the command-line driver for the data-flow framework.
//!
//! Reads a directory of JSON-encoded `ir::Module` files, runs the
//! configured analyses through `Controller`, and writes one JSON result
//! document per analysis plus any requested Graphviz DOT diagnostics.

use clap::Parser;
use dataflow_framework::controller::DotArtifact;
use dataflow_framework::ir::{Context, Module};
use dataflow_framework::{logging, Controller, RunConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dfa")]
#[command(about = "Interprocedural data-flow analysis over a small IR", long_about = None)]
struct Cli {
    /// Directory of `*.json` input files.
    #[arg(short, long)]
    input: PathBuf,

    /// Directory result documents and DOT artifacts are written to.
    #[arg(short, long, default_value = "target/dfa-output")]
    output: PathBuf,

    /// Analysis names to run, from the registry. Defaults to `none`.
    #[arg(short, long, value_delimiter = ',')]
    analyses: Vec<String>,

    /// Whole-program analysis instead of module-wise composition.
    #[arg(long)]
    wpa: bool,

    /// Promote scalar `Alloca`/`Load`/`Store` triples to direct value flow
    /// before the rest of pre-analysis runs.
    #[arg(long)]
    mem2reg: bool,

    /// Write Graphviz DOT diagnostics for the ICFG(s) built along the way.
    #[arg(long)]
    emit_dot: bool,

    /// Entry-point function names. Defaults to `main`.
    #[arg(short, long, value_delimiter = ',')]
    entry_points: Vec<String>,
}

fn load_modules(dir: &Path) -> Result<Vec<(Module, Context)>, String> {
    let mut modules = Vec::new();
    let mut next_context = 1u64;
    for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
        let module: Module = serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))?;
        modules.push((module, Context::new(next_context)));
        next_context += 1;
    }
    Ok(modules)
}

fn write_artifacts(output_dir: &Path, artifacts: &[DotArtifact]) -> std::io::Result<()> {
    for artifact in artifacts {
        std::fs::write(output_dir.join(&artifact.filename), &artifact.dot)?;
    }
    Ok(())
}

fn sanitize(name: &str) -> String {
    name.chars().map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' }).collect()
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let config = RunConfig::default().wpa(cli.wpa).mem2reg(cli.mem2reg).edge_recorder(cli.emit_dot);
    let config = config.entry_points(cli.entry_points);
    let config = match config.with_analysis_names(cli.analyses.iter()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return logging::to_exit_code(err.exit_code());
        }
    };

    let modules = match load_modules(&cli.input) {
        Ok(modules) => modules,
        Err(err) => {
            eprintln!("failed to read input: {err}");
            return logging::to_exit_code(2);
        }
    };

    let mut controller = Controller::new(config);
    for (module, context) in modules {
        if let Err(err) = controller.add_module(module, context) {
            eprintln!("{err}");
            return logging::to_exit_code(err.exit_code());
        }
    }

    let outcome = match controller.run() {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{err}");
            return logging::to_exit_code(err.exit_code());
        }
    };

    if let Err(err) = std::fs::create_dir_all(&cli.output) {
        eprintln!("failed to create output directory: {err}");
        return logging::to_exit_code(2);
    }

    for output in &outcome.outputs {
        let path = cli.output.join(format!("{}.json", sanitize(&output.analysis)));
        let json = match serde_json::to_string_pretty(output) {
            Ok(json) => json,
            Err(err) => {
                eprintln!("failed to serialize {}: {err}", output.analysis);
                return logging::to_exit_code(2);
            }
        };
        if let Err(err) = std::fs::write(&path, json) {
            eprintln!("failed to write {}: {err}", path.display());
            return logging::to_exit_code(2);
        }
    }

    if !outcome.dot_artifacts.is_empty() {
        if let Err(err) = write_artifacts(&cli.output, &outcome.dot_artifacts) {
            eprintln!("failed to write DOT artifacts: {err}");
            return logging::to_exit_code(2);
        }
    }

    for diagnostic in &outcome.diagnostics {
        tracing::warn!(?diagnostic, "non-fatal diagnostic during run");
    }

    if outcome.required_module_broken {
        return logging::to_exit_code(3);
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataflow_framework::ir::{BasicBlock, Function, Instruction, Linkage, Opcode, ValueId};
    use pretty_assertions::assert_eq;

    fn ret_only_module(id: &str, fname: &str) -> Module {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(Instruction::new(ValueId(0), Opcode::Ret { value: None }));
        Module::new(id).with_function(Function { name: fname.to_string(), linkage: Linkage::Strong, params: vec![], blocks: vec![block] })
    }

    #[test]
    fn load_modules_reads_every_json_file_in_a_directory() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let m1 = ret_only_module("m1", "a");
        let m2 = ret_only_module("m2", "b");
        std::fs::write(dir.path().join("m1.json"), serde_json::to_string(&m1).unwrap()).unwrap();
        std::fs::write(dir.path().join("m2.json"), serde_json::to_string(&m2).unwrap()).unwrap();
        // A non-JSON file in the same directory must be ignored.
        std::fs::write(dir.path().join("notes.txt"), "not a module").unwrap();

        let mut modules = load_modules(dir.path()).expect("load fixture modules");
        modules.sort_by(|(a, _), (b, _)| a.id.cmp(&b.id));

        assert_eq!(modules.len(), 2);
        assert_eq!(modules[0].0.id, "m1");
        assert_eq!(modules[1].0.id, "m2");
    }

    #[test]
    fn sanitize_replaces_non_identifier_characters() {
        assert_eq!(sanitize("ifds_taint@merged(m1,m2)"), "ifds_taint_merged_m1_m2_");
    }
}
