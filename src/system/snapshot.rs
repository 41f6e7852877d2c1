use serde::Serialize;

use super::cpu::SystemCpuInfo;
use super::memory::SystemMemoryInfo;
use super::process::ProcessTree;

/// Everything sampled in one cycle. An aggregate whose query failed this cycle
/// is `None`; consumers skip evaluating it until the next cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostSnapshot {
    pub cycle: u64,
    pub load_average: Option<Vec<f64>>,
    pub memory: Option<SystemMemoryInfo>,
    pub cpu: Option<SystemCpuInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_tree: Option<ProcessTree>,
}

impl HostSnapshot {
    pub fn is_complete(&self) -> bool {
        self.load_average.is_some() && self.memory.is_some() && self.cpu.is_some()
    }
}
