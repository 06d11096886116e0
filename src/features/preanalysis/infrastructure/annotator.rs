//! Value annotation pass: assigns every instruction a stable,
//! printable identifier used later as a fact key by CFG/ICFG nodes and
//! solver facts. Must run before PTG construction since PTG
//! nodes are keyed on `ValueId`, and CFG/ICFG nodes are keyed on the
//! annotation string produced here.

use crate::ir::Module;

/// Annotate every instruction in every function of `module` with
/// `"<module_id>::<function_name>::<value_id>"`.
///
/// Idempotent: running this twice over the same module produces the same
/// annotation strings.
pub fn annotate(module: &mut Module) {
    let module_id = module.id.clone();
    for function in &mut module.functions {
        let fname = function.name.clone();
        for instruction in function.instructions_mut() {
            instruction.annotation = Some(format!("{module_id}::{fname}::{}", instruction.id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BasicBlock, Function, Instruction, Linkage, Opcode, ValueId};

    #[test]
    fn annotation_is_stable_and_idempotent() {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(Instruction::new(ValueId(0), Opcode::Ret { value: None }));
        let mut module = Module::new("m").with_function(Function {
            name: "f".into(),
            linkage: Linkage::Strong,
            params: vec![],
            blocks: vec![block],
        });

        annotate(&mut module);
        let first = module.functions[0].blocks[0].instructions[0].annotation.clone();
        annotate(&mut module);
        let second = module.functions[0].blocks[0].instructions[0].annotation.clone();
        assert_eq!(first, second);
        assert_eq!(first.unwrap(), "m::f::%0");
    }
}
