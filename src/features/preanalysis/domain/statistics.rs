//! General statistics gathered during pre-analysis.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStatistics {
    pub function_count: usize,
    pub instruction_count: usize,
    pub indirect_call_sites: usize,
}

impl ModuleStatistics {
    pub fn gather(module: &crate::ir::Module) -> Self {
        let mut stats = ModuleStatistics::default();
        stats.function_count = module.functions.len();
        for function in &module.functions {
            stats.instruction_count += function.instruction_count();
            stats.indirect_call_sites += function.indirect_call_sites();
        }
        stats
    }
}

impl std::ops::AddAssign for ModuleStatistics {
    fn add_assign(&mut self, other: Self) {
        self.function_count += other.function_count;
        self.instruction_count += other.instruction_count;
        self.indirect_call_sites += other.indirect_call_sites;
    }
}
