use crate::system::source::{
    CounterSource, CpuCounters, MemoryCounters, ProcessUsage, RawProcess, SourceError,
    SwapListing,
};

/// Counter source for platforms without a kernel counter backend. Every query
/// fails, so bootstrap reports the platform as unavailable.
pub struct UnsupportedSource;

impl UnsupportedSource {
    pub fn new() -> Self {
        UnsupportedSource
    }
}

impl Default for UnsupportedSource {
    fn default() -> Self {
        Self::new()
    }
}

fn unsupported(query: &'static str) -> SourceError {
    SourceError::new(
        query,
        format!("not supported on {}", std::env::consts::OS),
    )
}

impl CounterSource for UnsupportedSource {
    fn page_size(&self) -> Result<u64, SourceError> {
        Err(unsupported("page_size"))
    }

    fn memory_totals(&self) -> Result<MemoryCounters, SourceError> {
        Err(unsupported("memory_totals"))
    }

    fn online_cpus(&self) -> Result<u32, SourceError> {
        Err(unsupported("online_cpus"))
    }

    fn cpu_totals(&self) -> Result<CpuCounters, SourceError> {
        Err(unsupported("cpu_totals"))
    }

    fn process_count(&self) -> Result<usize, SourceError> {
        Err(unsupported("process_count"))
    }

    fn processes(&self, _first_pid: u32, _max: usize) -> Result<Vec<RawProcess>, SourceError> {
        Err(unsupported("processes"))
    }

    fn process_usage(&self, _process: &RawProcess) -> Result<ProcessUsage, SourceError> {
        Err(unsupported("process_usage"))
    }

    fn swap_device_count(&self) -> Result<usize, SourceError> {
        Err(unsupported("swap_device_count"))
    }

    fn swap_devices(&self, _capacity: usize) -> Result<SwapListing, SourceError> {
        Err(unsupported("swap_devices"))
    }
}
