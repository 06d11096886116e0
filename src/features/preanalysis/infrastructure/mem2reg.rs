//! mem2reg: promotes
//! stack-allocated scalars into SSA values.
//!
//! Conservative by construction: a local is only promoted when its address
//! never escapes (never passed as a call argument or stored through another
//! pointer) and every `Load` of it is dominated, in program order within the
//! function's single-pass walk, by a prior `Store`. A variable that is ever
//! read before being written is left entirely untouched -- that case is
//! exactly an uninitialized read, the fact `ifds_uninit` looks for, so promoting it away would delete the very bug the
//! downstream analysis exists to find.

use crate::ir::{Function, Opcode, ValueId};
use rustc_hash::{FxHashMap, FxHashSet};

fn escapes(function: &Function, alloca: ValueId) -> bool {
    function.instructions().any(|i| match &i.opcode {
        Opcode::Store { value, .. } => *value == alloca,
        Opcode::Call { args, .. } => args.contains(&alloca),
        _ => false,
    })
}

fn has_uninitialized_read(function: &Function, alloca: ValueId) -> bool {
    let mut stored = false;
    for instruction in function.instructions() {
        match &instruction.opcode {
            Opcode::Store { pointer, .. } if *pointer == alloca => stored = true,
            Opcode::Load { pointer } if *pointer == alloca && !stored => return true,
            _ => {}
        }
    }
    false
}

/// Promote every eligible scalar `Alloca` in `function` to `Identity` loads
/// (see `ir::Opcode::Identity`) and drop the now-dead `Alloca`/`Store`
/// instructions.
pub fn promote(function: &mut Function) {
    let allocas: Vec<ValueId> = function
        .instructions()
        .filter(|i| matches!(i.opcode, Opcode::Alloca))
        .map(|i| i.id)
        .collect();

    let promotable: FxHashSet<ValueId> = allocas
        .into_iter()
        .filter(|&a| !escapes(function, a) && !has_uninitialized_read(function, a))
        .collect();

    if promotable.is_empty() {
        return;
    }

    let mut last_store: FxHashMap<ValueId, ValueId> = FxHashMap::default();
    for block in &mut function.blocks {
        block.instructions.retain_mut(|instruction| {
            match &instruction.opcode {
                Opcode::Store { pointer, value } if promotable.contains(pointer) => {
                    last_store.insert(*pointer, *value);
                    return false; // drop the store, its effect is now implicit
                }
                Opcode::Load { pointer } if promotable.contains(pointer) => {
                    if let Some(&value) = last_store.get(pointer) {
                        instruction.opcode = Opcode::Identity { value };
                    }
                }
                Opcode::Alloca if promotable.contains(&instruction.id) => {
                    return false; // drop the now-dead alloca
                }
                _ => {}
            }
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BasicBlock, CallTarget, Linkage};

    fn leaf(blocks: Vec<BasicBlock>) -> Function {
        Function { name: "f".into(), linkage: Linkage::Strong, params: vec![], blocks }
    }

    #[test]
    fn promotes_non_escaping_initialized_local() {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(crate::ir::Instruction::new(ValueId(0), Opcode::Alloca));
        block.instructions.push(crate::ir::Instruction::new(
            ValueId(1),
            Opcode::Store { pointer: ValueId(0), value: ValueId(42) },
        ));
        block.instructions.push(crate::ir::Instruction::new(
            ValueId(2),
            Opcode::Load { pointer: ValueId(0) },
        ));
        block.instructions.push(crate::ir::Instruction::new(ValueId(3), Opcode::Ret { value: Some(ValueId(2)) }));
        let mut function = leaf(vec![block]);

        promote(&mut function);

        let ops: Vec<&Opcode> = function.instructions().map(|i| &i.opcode).collect();
        assert!(!ops.iter().any(|o| matches!(o, Opcode::Alloca)));
        assert!(!ops.iter().any(|o| matches!(o, Opcode::Store { .. })));
        assert!(matches!(ops[0], Opcode::Identity { value } if *value == ValueId(42)));
    }

    #[test]
    fn leaves_uninitialized_read_untouched() {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(crate::ir::Instruction::new(ValueId(0), Opcode::Alloca));
        block.instructions.push(crate::ir::Instruction::new(
            ValueId(1),
            Opcode::Load { pointer: ValueId(0) },
        ));
        block.instructions.push(crate::ir::Instruction::new(ValueId(2), Opcode::Ret { value: None }));
        let mut function = leaf(vec![block]);

        promote(&mut function);

        let ops: Vec<&Opcode> = function.instructions().map(|i| &i.opcode).collect();
        assert!(matches!(ops[0], Opcode::Alloca));
        assert!(matches!(ops[1], Opcode::Load { .. }));
    }

    #[test]
    fn leaves_escaping_local_untouched() {
        let mut block = BasicBlock::new("entry");
        block.instructions.push(crate::ir::Instruction::new(ValueId(0), Opcode::Alloca));
        block.instructions.push(crate::ir::Instruction::new(
            ValueId(1),
            Opcode::Store { pointer: ValueId(0), value: ValueId(7) },
        ));
        block.instructions.push(crate::ir::Instruction::new(
            ValueId(2),
            Opcode::Call { target: CallTarget::Direct("g".into()), args: vec![ValueId(0)] },
        ));
        block.instructions.push(crate::ir::Instruction::new(ValueId(3), Opcode::Ret { value: None }));
        let mut function = leaf(vec![block]);

        promote(&mut function);

        assert!(function.instructions().any(|i| matches!(i.opcode, Opcode::Alloca)));
    }
}
