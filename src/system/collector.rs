use super::cpu::{CpuDeltaSampler, SystemCpuInfo};
use super::error::SampleError;
use super::host::HostFacts;
use super::loadavg::{self, LOAD_AVERAGE_SLOTS};
use super::memory::{MemorySampler, SystemMemoryInfo};
use super::process::{self, ProcessTree};
use super::retry::RetryPolicy;
use super::snapshot::HostSnapshot;
use super::source::CounterSource;

/// Samples one host. Owns the host's CPU baseline, so calls through one
/// instance are serialized by `&mut self`.
pub struct HostSampler<S> {
    source: S,
    facts: HostFacts,
    cpu: CpuDeltaSampler,
    memory: MemorySampler,
    load_averages: usize,
    collect_processes: bool,
    cycle: u64,
}

impl<S: CounterSource> HostSampler<S> {
    /// Bootstraps host facts from `source`.
    pub fn new(source: S, swap_retry: RetryPolicy) -> Result<Self, SampleError> {
        let facts = HostFacts::bootstrap(&source)?;
        tracing::debug!(
            page_size = facts.page_size_bytes,
            total_memory_kb = facts.total_memory_kb,
            cpus = facts.cpu_count,
            "host facts captured"
        );
        Ok(HostSampler {
            source,
            facts,
            cpu: CpuDeltaSampler::new(),
            memory: MemorySampler::new(swap_retry),
            load_averages: LOAD_AVERAGE_SLOTS,
            collect_processes: true,
            cycle: 0,
        })
    }

    pub fn with_load_averages(mut self, count: usize) -> Self {
        self.load_averages = count.min(LOAD_AVERAGE_SLOTS);
        self
    }

    pub fn with_processes(mut self, enabled: bool) -> Self {
        self.collect_processes = enabled;
        self
    }

    pub fn facts(&self) -> &HostFacts {
        &self.facts
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn load_average(&self, count: usize) -> Result<Vec<f64>, SampleError> {
        loadavg::sample(&self.source, count)
    }

    pub fn process_tree(&self) -> Result<ProcessTree, SampleError> {
        process::build_snapshot(&self.source, &self.facts)
    }

    pub fn memory(&self) -> Result<SystemMemoryInfo, SampleError> {
        self.memory.sample(&self.source, &self.facts)
    }

    pub fn cpu(&mut self) -> Result<SystemCpuInfo, SampleError> {
        self.cpu.sample(&self.source)
    }

    /// Runs every sampler once. Failures are logged and leave the matching
    /// aggregate empty; they never abort the other samplers.
    ///
    /// Blocks the calling thread while swap sampling backs off after a race.
    pub fn refresh(&mut self) -> HostSnapshot {
        self.cycle += 1;
        let _refresh_span = tracing::debug_span!("collector.refresh", cycle = self.cycle).entered();

        let load_average = log_failure("load average", self.load_average(self.load_averages));
        let memory = log_failure("memory", self.memory());
        let cpu = log_failure("cpu", self.cpu());
        let process_tree = if self.collect_processes {
            log_failure("process tree", self.process_tree())
        } else {
            None
        };

        if let Some(tree) = &process_tree {
            let partial = tree.partial_count();
            if partial > 0 {
                tracing::debug!(partial, total = tree.len(), "processes with unreadable usage");
            }
        }

        HostSnapshot {
            cycle: self.cycle,
            load_average,
            memory,
            cpu,
            process_tree,
        }
    }
}

fn log_failure<T>(what: &'static str, result: Result<T, SampleError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, "{what} sampling failed, skipping this cycle");
            None
        }
    }
}
