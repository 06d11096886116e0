//! The minimal IR surface the framework consumes.
//!
//! No compiler front end ships in this crate — `Module`/`Function` are a
//! small, serializable stand-in for whatever a real SSA producer would hand
//! over. The framework is written against the narrow `IrQuery` interface, so
//! swapping in a real front end means implementing that trait, not touching
//! the solvers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for a value within a function (an instruction result,
/// a parameter, or a global reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Symbol linkage, used by `link_for_wpa` to resolve collisions:
/// weak < strong < external.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Linkage {
    Weak,
    Strong,
    External,
    /// A declaration only — no body, never a link conflict.
    Declaration,
}

/// Resolution target of a call instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallTarget {
    /// Statically known callee name (a direct call).
    Direct(String),
    /// Called through a pointer-typed value (an indirect call).
    Indirect(ValueId),
}

/// The operation a single instruction performs, reduced to what the
/// framework needs to build CFGs/ICFGs/PTGs and drive transfer functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    /// Stack-allocates a scalar; a mem2reg candidate.
    Alloca,
    Load { pointer: ValueId },
    Store { pointer: ValueId, value: ValueId },
    /// `value = lhs op rhs`, no pointer semantics.
    BinOp { lhs: ValueId, rhs: ValueId },
    Call { target: CallTarget, args: Vec<ValueId> },
    /// `value = other_value`, inserted by mem2reg when a
    /// scalar `Load` is promoted to a direct forward of the last stored
    /// value; the defining instruction's `ValueId` is unchanged so every
    /// downstream user still resolves correctly.
    Identity { value: ValueId },
    /// Unconditional fall-through / jump to another block in the same function.
    Br { target: String },
    CondBr { cond: ValueId, then_block: String, else_block: String },
    Ret { value: Option<ValueId> },
    /// Anything not modeled precisely; preserved for round-tripping and stats.
    Other(String),
}

impl Opcode {
    pub fn is_terminator(&self) -> bool {
        matches!(self, Opcode::Br { .. } | Opcode::CondBr { .. } | Opcode::Ret { .. })
    }

    pub fn is_pointer_producing(&self) -> bool {
        matches!(self, Opcode::Alloca)
    }

    /// Every value this instruction *reads*, the callee pointer of an
    /// indirect call included. Used to seed the alias oracle's partition
    /// and the per-function PTG with used-but-not-defined values (e.g. an
    /// indirect call's function pointer), not only defined ones.
    pub fn operand_values(&self) -> Vec<ValueId> {
        match self {
            Opcode::Alloca | Opcode::Br { .. } | Opcode::Ret { value: None } | Opcode::Other(_) => {
                Vec::new()
            }
            Opcode::Load { pointer } => vec![*pointer],
            Opcode::Store { pointer, value } => vec![*pointer, *value],
            Opcode::BinOp { lhs, rhs } => vec![*lhs, *rhs],
            Opcode::Call { target, args } => {
                let mut values = args.clone();
                if let CallTarget::Indirect(pointer) = target {
                    values.push(*pointer);
                }
                values
            }
            Opcode::Identity { value } => vec![*value],
            Opcode::CondBr { cond, .. } => vec![*cond],
            Opcode::Ret { value: Some(value) } => vec![*value],
        }
    }
}

/// A synthetic `ValueId` a front end may use to denote "the address of
/// function `name`" (e.g. as the operand of an `Identity` taking a function
/// pointer). Reserved to the top half of the `u32` space so it can never
/// collide with a real front end's sequentially assigned instruction ids;
/// letting such a marker flow into a pointer's alias class via the ordinary
/// `Store`/`Load`/`Identity` union rules is how the `PointsTo` ICFG
/// resolve strategy narrows an indirect call's candidate set.
pub fn function_value_id(name: &str) -> ValueId {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in name.as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    ValueId(hash | 0x8000_0000)
}

/// A single instruction. `annotation` is filled in by the pre-analyzer
/// and is the stable, printable fact key used by solvers —
/// it is `None` until pre-analysis runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: ValueId,
    pub opcode: Opcode,
    pub annotation: Option<String>,
}

impl Instruction {
    pub fn new(id: ValueId, opcode: Opcode) -> Self {
        Self { id, opcode, annotation: None }
    }

    /// The printable fact key for this instruction: its annotation once
    /// pre-analysis has run, else a fallback derived from its `ValueId`.
    pub fn node_id(&self) -> String {
        self.annotation.clone().unwrap_or_else(|| self.id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), instructions: Vec::new() }
    }

    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|i| i.opcode.is_terminator())
    }
}

/// A function definition or declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub linkage: Linkage,
    pub params: Vec<ValueId>,
    /// Empty for a declaration.
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn declaration(name: impl Into<String>, linkage: Linkage) -> Self {
        Self { name: name.into(), linkage, params: Vec::new(), blocks: Vec::new() }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn entry_block(&self) -> Option<&BasicBlock> {
        self.blocks.first()
    }

    pub fn block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|b| b.instructions.iter())
    }

    pub fn instructions_mut(&mut self) -> impl Iterator<Item = &mut Instruction> {
        self.blocks.iter_mut().flat_map(|b| b.instructions.iter_mut())
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions().count()
    }

    pub fn indirect_call_sites(&self) -> usize {
        self.instructions()
            .filter(|i| matches!(&i.opcode, Opcode::Call { target: CallTarget::Indirect(_), .. }))
            .count()
    }
}

/// A virtual dispatch table: an ordered list of target function names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VTable {
    pub entries: Vec<String>,
}

/// An aggregate (class/struct) type as seen by class-hierarchy
/// reconstruction. `base_candidates` may have more than one entry
/// when the layout is ambiguous — the CH records both with `contested = true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateType {
    pub name: String,
    pub base_candidates: Vec<String>,
    pub vtable: Option<VTable>,
}

/// All aggregate types declared in a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTable {
    pub types: Vec<AggregateType>,
}

/// Opaque owner of type uniqueness for one module (stands in for an
/// `LLVMContext`). Acquired together with its `Module` and released
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub id: u64,
}

impl Context {
    pub fn new(id: u64) -> Self {
        Self { id }
    }
}

/// An immutable (post-pre-analysis) IR translation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub functions: Vec<Function>,
    pub types: TypeTable,
}

impl Module {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), functions: Vec::new(), types: TypeTable::default() }
    }

    pub fn with_function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    pub fn with_type(mut self, ty: AggregateType) -> Self {
        self.types.types.push(ty);
        self
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }
}

/// The narrow query interface the framework is written against.
/// A real front end would implement this directly over its own IR rather
/// than materializing a `Module`.
pub trait IrQuery {
    fn module_id(&self) -> &str;
    fn functions(&self) -> &[Function];
}

impl IrQuery for Module {
    fn module_id(&self) -> &str {
        &self.id
    }

    fn functions(&self) -> &[Function] {
        &self.functions
    }
}
