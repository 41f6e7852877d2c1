use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use super::source::{
    CounterSource, CpuCounters, MemoryCounters, ProcessUsage, RawProcess, RawProcessState,
    SourceError, SwapEntry, SwapFlags, SwapListing,
};

/// Replays scripted answers. The last answer repeats once the script runs dry.
pub struct Script<T: Clone>(RefCell<VecDeque<T>>);

impl<T: Clone> Script<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self(RefCell::new(items.into_iter().collect()))
    }

    pub fn one(item: T) -> Self {
        Self::new([item])
    }

    fn next(&self) -> T {
        let mut queue = self.0.borrow_mut();
        if queue.len() > 1 {
            queue.pop_front().expect("non-empty script")
        } else {
            queue.front().cloned().expect("script has no answers")
        }
    }
}

pub struct ScriptedSource {
    pub page_size: Result<u64, SourceError>,
    pub memory: Result<MemoryCounters, SourceError>,
    pub online_cpus: Result<u32, SourceError>,
    pub cpu: Script<Result<CpuCounters, SourceError>>,
    pub process_count: Result<usize, SourceError>,
    pub processes: Result<Vec<RawProcess>, SourceError>,
    pub usage: HashMap<u32, ProcessUsage>,
    pub swap_count: Script<Result<usize, SourceError>>,
    pub swap_listing: Script<Result<SwapListing, SourceError>>,
    pub usage_queries: RefCell<Vec<u32>>,
    pub fill_requests: RefCell<Vec<usize>>,
    pub swap_list_calls: Cell<usize>,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self {
            page_size: Ok(4096),
            memory: Ok(MemoryCounters {
                total_pages: 262_144,
                free_pages: 65_536,
                cached_pages: 32_768,
            }),
            online_cpus: Ok(4),
            cpu: Script::one(Ok(CpuCounters {
                ncpus: 4,
                ..CpuCounters::default()
            })),
            process_count: Ok(0),
            processes: Ok(Vec::new()),
            usage: HashMap::new(),
            swap_count: Script::one(Ok(0)),
            swap_listing: Script::one(Ok(SwapListing::default())),
            usage_queries: RefCell::new(Vec::new()),
            fill_requests: RefCell::new(Vec::new()),
            swap_list_calls: Cell::new(0),
        }
    }
}

pub fn failure(query: &'static str) -> SourceError {
    SourceError::new(query, "scripted failure")
}

pub fn raw_process(pid: u32, ppid: u32, state: RawProcessState) -> RawProcess {
    RawProcess {
        pid,
        ppid,
        start_time: 1_700_000_000 + i64::from(pid),
        state,
    }
}

pub fn swap_entry(path: &str, pages: u64, free_pages: u64) -> SwapEntry {
    SwapEntry {
        path: path.to_string(),
        pages,
        free_pages,
        flags: SwapFlags::default(),
    }
}

impl CounterSource for ScriptedSource {
    fn page_size(&self) -> Result<u64, SourceError> {
        self.page_size.clone()
    }

    fn memory_totals(&self) -> Result<MemoryCounters, SourceError> {
        self.memory.clone()
    }

    fn online_cpus(&self) -> Result<u32, SourceError> {
        self.online_cpus.clone()
    }

    fn cpu_totals(&self) -> Result<CpuCounters, SourceError> {
        self.cpu.next()
    }

    fn process_count(&self) -> Result<usize, SourceError> {
        self.process_count.clone()
    }

    fn processes(&self, first_pid: u32, max: usize) -> Result<Vec<RawProcess>, SourceError> {
        self.fill_requests.borrow_mut().push(max);
        let processes = self.processes.clone()?;
        Ok(processes
            .into_iter()
            .filter(|p| p.pid >= first_pid)
            .take(max)
            .collect())
    }

    fn process_usage(&self, process: &RawProcess) -> Result<ProcessUsage, SourceError> {
        self.usage_queries.borrow_mut().push(process.pid);
        self.usage
            .get(&process.pid)
            .copied()
            .ok_or_else(|| failure("process_usage"))
    }

    fn swap_device_count(&self) -> Result<usize, SourceError> {
        self.swap_count.next()
    }

    fn swap_devices(&self, capacity: usize) -> Result<SwapListing, SourceError> {
        self.swap_list_calls.set(self.swap_list_calls.get() + 1);
        let mut listing = self.swap_listing.next()?;
        listing.entries.truncate(capacity);
        Ok(listing)
    }
}
