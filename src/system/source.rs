//! Access to the kernel counters every sampler is built on.
//!
//! A [`CounterSource`] is a thin capability over whatever interface the host
//! kernel exposes. Implementations return raw values in kernel units (pages,
//! ticks, fixed-point load averages); all normalization happens in the
//! samplers.

use std::time::Duration;

/// A kernel query failed. `query` names the counter that was being read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{query} failed: {message}")]
pub struct SourceError {
    pub query: &'static str,
    pub message: String,
}

impl SourceError {
    pub fn new(query: &'static str, message: impl Into<String>) -> Self {
        Self {
            query,
            message: message.into(),
        }
    }
}

/// Memory counters in pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryCounters {
    pub total_pages: u64,
    pub free_pages: u64,
    pub cached_pages: u64,
}

/// Aggregate CPU ticks summed over every online core, plus the kernel's
/// fixed-point load averages (scaled by `1 << LOAD_AVERAGE_SHIFT`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuCounters {
    pub user: u64,
    pub system: u64,
    pub wait: u64,
    pub idle: u64,
    pub ncpus: u32,
    pub load_average: [u64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawProcessState {
    Running,
    Sleeping,
    Stopped,
    Zombie,
    Other,
}

/// One entry of the kernel process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProcess {
    pub pid: u32,
    pub ppid: u32,
    /// Seconds since the unix epoch.
    pub start_time: i64,
    pub state: RawProcessState,
}

/// Secondary per-process usage record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessUsage {
    pub data_resident_pages: u64,
    pub text_resident_pages: u64,
    pub user_time: Duration,
    pub system_time: Duration,
}

/// Transitional swap device states. Devices in either state are ignored when
/// summing swap usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapFlags {
    pub deleting: bool,
    pub pending_delete: bool,
}

impl SwapFlags {
    pub fn is_transitional(self) -> bool {
        self.deleting || self.pending_delete
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapEntry {
    pub path: String,
    pub pages: u64,
    pub free_pages: u64,
    pub flags: SwapFlags,
}

/// Result of a swap list call: at most `capacity` entries, plus the number of
/// devices the kernel saw while listing. `reported > entries.len()` means the
/// table was too small.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapListing {
    pub entries: Vec<SwapEntry>,
    pub reported: usize,
}

pub trait CounterSource {
    fn page_size(&self) -> Result<u64, SourceError>;

    fn memory_totals(&self) -> Result<MemoryCounters, SourceError>;

    fn online_cpus(&self) -> Result<u32, SourceError>;

    fn cpu_totals(&self) -> Result<CpuCounters, SourceError>;

    /// Number of entries currently in the process table (discovery phase).
    fn process_count(&self) -> Result<usize, SourceError>;

    /// Fill phase: up to `max` process records starting at `first_pid`, in
    /// whatever order the kernel returns them.
    fn processes(&self, first_pid: u32, max: usize) -> Result<Vec<RawProcess>, SourceError>;

    fn process_usage(&self, process: &RawProcess) -> Result<ProcessUsage, SourceError>;

    fn swap_device_count(&self) -> Result<usize, SourceError>;

    fn swap_devices(&self, capacity: usize) -> Result<SwapListing, SourceError>;
}

impl<S: CounterSource + ?Sized> CounterSource for &S {
    fn page_size(&self) -> Result<u64, SourceError> {
        (**self).page_size()
    }

    fn memory_totals(&self) -> Result<MemoryCounters, SourceError> {
        (**self).memory_totals()
    }

    fn online_cpus(&self) -> Result<u32, SourceError> {
        (**self).online_cpus()
    }

    fn cpu_totals(&self) -> Result<CpuCounters, SourceError> {
        (**self).cpu_totals()
    }

    fn process_count(&self) -> Result<usize, SourceError> {
        (**self).process_count()
    }

    fn processes(&self, first_pid: u32, max: usize) -> Result<Vec<RawProcess>, SourceError> {
        (**self).processes(first_pid, max)
    }

    fn process_usage(&self, process: &RawProcess) -> Result<ProcessUsage, SourceError> {
        (**self).process_usage(process)
    }

    fn swap_device_count(&self) -> Result<usize, SourceError> {
        (**self).swap_device_count()
    }

    fn swap_devices(&self, capacity: usize) -> Result<SwapListing, SourceError> {
        (**self).swap_devices(capacity)
    }
}

/// Converts a page count to kilobytes.
pub fn pages_to_kb(pages: u64, page_size: u64) -> u64 {
    pages.saturating_mul(page_size) / 1024
}
