//! Integration tests for the controller's end-to-end scenarios: the unknown
//! analysis name is rejected before any module is added, a duplicate
//! strong symbol is rejected before pre-analysis, a source-sink taint
//! chain is found end to end, and a constant-propagation loop converges
//! to the constant rather than `Top`.

use dataflow_framework::ir::{
    BasicBlock, CallTarget, Context, Function, Instruction, Linkage, Module, Opcode, ValueId,
};
use dataflow_framework::{Controller, FrameworkError, RunConfig};

fn ret_module(id: &str, fname: &str) -> Module {
    let mut block = BasicBlock::new("entry");
    block.instructions.push(Instruction::new(ValueId(0), Opcode::Ret { value: None }));
    Module::new(id).with_function(Function { name: fname.to_string(), linkage: Linkage::Strong, params: vec![], blocks: vec![block] })
}

#[test]
fn unknown_analysis_name_rejected_at_config_time() {
    let err = RunConfig::default().with_analysis_names(["not_a_real_analysis"]).unwrap_err();
    assert_eq!(err, FrameworkError::UnknownAnalysis("not_a_real_analysis".to_string()));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn link_conflict_on_duplicate_strong_symbols_before_preanalysis() {
    let config = RunConfig::default().wpa(true);
    let mut controller = Controller::new(config);
    controller.add_module(ret_module("m1", "dup"), Context::new(1)).unwrap();
    controller.add_module(ret_module("m2", "dup"), Context::new(2)).unwrap();

    // The controller links for WPA as its first pipeline stage, so the
    // conflict surfaces from `run()`, before any solving begins.
    let err = controller.run().unwrap_err();
    assert_eq!(err, FrameworkError::LinkConflict("dup".to_string()));
}

#[test]
fn ifds_taint_finds_the_source_to_sink_chain() {
    let mut block = BasicBlock::new("entry");
    block.instructions.push(Instruction::new(
        ValueId(0),
        Opcode::Call { target: CallTarget::Direct("read_input".to_string()), args: vec![] },
    ));
    block.instructions.push(Instruction::new(ValueId(1), Opcode::Identity { value: ValueId(0) }));
    block.instructions.push(Instruction::new(
        ValueId(2),
        Opcode::Call { target: CallTarget::Direct("run_query".to_string()), args: vec![ValueId(1)] },
    ));
    block.instructions.push(Instruction::new(ValueId(3), Opcode::Ret { value: None }));
    let module = Module::new("m1")
        .with_function(Function { name: "main".to_string(), linkage: Linkage::Strong, params: vec![], blocks: vec![block] })
        .with_function(Function::declaration("read_input", Linkage::External))
        .with_function(Function::declaration("run_query", Linkage::External));

    let config = RunConfig::default().wpa(true).with_analysis_names(["ifds_taint"]).unwrap();
    let mut controller = Controller::new(config);
    controller.add_module(module, Context::new(1)).unwrap();
    let outcome = controller.run().unwrap();

    assert_eq!(outcome.outputs.len(), 1);
    let output = &outcome.outputs[0];
    assert_eq!(output.analysis, "ifds_taint");
    assert_eq!(output.results.len(), 1);
    assert!(output.results[0].facts.contains(&"tainted_sink_argument".to_string()));
}

#[test]
fn const_propagation_converges_to_the_constant_not_top() {
    let mut entry = BasicBlock::new("entry");
    entry.instructions.push(Instruction::new(ValueId(0), Opcode::Other("const:0:2".to_string())));
    entry.instructions.push(Instruction::new(ValueId(1), Opcode::Br { target: "loop".to_string() }));
    let mut loop_block = BasicBlock::new("loop");
    loop_block.instructions.push(Instruction::new(ValueId(2), Opcode::Other("const:0:2".to_string())));
    loop_block.instructions.push(Instruction::new(ValueId(3), Opcode::Br { target: "loop".to_string() }));
    let module = Module::new("m1").with_function(Function {
        name: "main".to_string(),
        linkage: Linkage::Strong,
        params: vec![],
        blocks: vec![entry, loop_block],
    });

    let config = RunConfig::default()
        .wpa(true)
        .with_analysis_names(["mono_intra_fullconstpropagation"])
        .unwrap();
    let mut controller = Controller::new(config);
    controller.add_module(module, Context::new(1)).unwrap();
    let outcome = controller.run().unwrap();

    assert_eq!(outcome.outputs.len(), 1);
    // Pre-analysis annotates every instruction `"<module>::<function>::<value id>"`
    // before WPA linking, so the loop's second store keeps its original
    // module id even after the modules are merged.
    let loop_node =
        outcome.outputs[0].results.iter().find(|r| r.node_id == "m1::main::%3").expect("loop node present");
    assert!(loop_node.facts.iter().any(|f| f.contains("Const(2)")));
    assert!(!loop_node.facts.iter().any(|f| f.contains("Top")));
}
