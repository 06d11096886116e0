//! Shared building blocks the concrete analysis problems are built
//! from: a node-id lookup table, the tracked-value fact used by every IFDS
//! problem, and the constant-propagation lattice used by the monotone ones.

pub mod const_lattice;
pub mod ir_index;
pub mod value_fact;

pub use const_lattice::{ConstEnv, ConstValue};
pub use ir_index::IrIndex;
pub use value_fact::{forward_flow, ForwardTrackFlow, ValueFact};
