//! The pre-analyzer's fixed pipeline: for every module, in database
//! order, run mem2reg (optional) -> statistics -> annotation -> alias
//! oracle -> PTG construction, then verify. Declared order matters:
//! annotation must precede PTG construction because PTG nodes key on
//! `ValueId`s that only become stable fact keys once annotated.

use crate::features::ir_db::Irdb;
use crate::features::points_to::PointsToGraph;
use crate::features::preanalysis::domain::ModuleStatistics;
use crate::features::preanalysis::infrastructure::{alias_oracle, annotator, mem2reg};
use crate::ir::ValueId;

/// Aggregate statistics and non-fatal diagnostics produced by one
/// pre-analysis run.
#[derive(Debug, Clone, Default)]
pub struct PreanalysisReport {
    pub totals: ModuleStatistics,
    pub broken_modules: Vec<String>,
    pub broken_debug_info: Vec<String>,
}

/// Run the fixed pipeline over every module currently in `irdb`, in
/// database (insertion) order.
pub fn run(irdb: &mut Irdb, mem2reg_mode: bool) -> PreanalysisReport {
    let mut report = PreanalysisReport::default();

    irdb.start_preanalysis();

    let module_ids: Vec<String> = irdb.module_ids().map(|s| s.to_string()).collect();
    for module_id in &module_ids {
        tracing::info!(module = %module_id, "pre-analyzing module");

        if mem2reg_mode {
            if let Some(module) = irdb.modules_mut().find(|m| &m.id == module_id) {
                for function in &mut module.functions {
                    mem2reg::promote(function);
                }
            }
        }

        if let Some(module) = irdb.modules_mut().find(|m| &m.id == module_id) {
            annotator::annotate(module);
        }

        let (stats, partition) = {
            let module = irdb.module(module_id).expect("module just iterated must exist");
            (ModuleStatistics::gather(module), alias_oracle::analyze_module(module))
        };
        report.totals += stats;

        let function_names: Vec<String> = irdb
            .module(module_id)
            .unwrap()
            .functions
            .iter()
            .filter(|f| !f.is_declaration())
            .map(|f| f.name.clone())
            .collect();

        for fname in function_names {
            let function = irdb.module(module_id).unwrap().function(&fname).unwrap();
            let values: Vec<ValueId> = function
                .instructions()
                .flat_map(|i| std::iter::once(i.id).chain(i.opcode.operand_values()))
                .collect();
            let ptg = PointsToGraph::from_partition(&partition, values);
            irdb.insert_ptg(fname, ptg).expect("PTG insertion is valid during pre-analysis");
        }

        let module = irdb.module(module_id).unwrap().clone();
        let (ok, broken_debug_info) = irdb.verify(&module);
        if !ok {
            crate::log_critical!(module = %module_id, "AnalysisController: module is broken!");
            report.broken_modules.push(module_id.clone());
        }
        if broken_debug_info {
            tracing::warn!(module = %module_id, "AnalysisController: debug info is broken.");
            report.broken_debug_info.push(module_id.clone());
        }
    }

    irdb.end_preanalysis();
    tracing::info!("pre-analysis completed");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BasicBlock, Context, Function, Instruction, Linkage, Module, Opcode};

    fn trivial_module(id: &str, fname: &str) -> Module {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(Instruction::new(ValueId(0), Opcode::Ret { value: None }));
        Module::new(id).with_function(Function {
            name: fname.to_string(),
            linkage: Linkage::Strong,
            params: vec![],
            blocks: vec![block],
        })
    }

    #[test]
    fn installs_a_ptg_for_every_definition() {
        let mut irdb = Irdb::new();
        irdb.add_module(trivial_module("m1", "main"), Context::new(1)).unwrap();
        run(&mut irdb, false);
        assert!(irdb.has_ptg_for_every_definition());
    }

    #[test]
    fn idempotent_across_two_runs() {
        let mut irdb = Irdb::new();
        irdb.add_module(trivial_module("m1", "main"), Context::new(1)).unwrap();
        run(&mut irdb, false);
        let first_annotation =
            irdb.module("m1").unwrap().functions[0].blocks[0].instructions[0].annotation.clone();
        run(&mut irdb, false);
        let second_annotation =
            irdb.module("m1").unwrap().functions[0].blocks[0].instructions[0].annotation.clone();
        assert_eq!(first_annotation, second_annotation);
    }
}
