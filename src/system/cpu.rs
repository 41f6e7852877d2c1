use serde::Serialize;

use super::error::SampleError;
use super::source::{CounterSource, CpuCounters};

/// Fixed-point scale of CPU percentages: 1000 means 100.0%.
pub const PERCENT_SCALE: u64 = 1000;

/// CPU utilization over the last sampling interval, in tenths of a percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SystemCpuInfo {
    pub user_percent: u32,
    pub system_percent: u32,
    pub wait_percent: u32,
}

/// Per-core tick totals from the previous call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreviousCpuSample {
    pub user: u64,
    pub system: u64,
    pub wait: u64,
    pub total: u64,
    pub initialized: bool,
}

/// Computes CPU percentages as the delta between consecutive calls.
///
/// Keep one instance per monitored host and call it once per cycle; the first
/// call only establishes the baseline and reports zeros.
#[derive(Debug, Default)]
pub struct CpuDeltaSampler {
    previous: PreviousCpuSample,
}

impl CpuDeltaSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> &PreviousCpuSample {
        &self.previous
    }

    pub fn sample(&mut self, source: &impl CounterSource) -> Result<SystemCpuInfo, SampleError> {
        let counters = source.cpu_totals()?;
        self.observe(&counters)
    }

    /// Folds one raw reading into the baseline. A rejected reading leaves the
    /// baseline untouched.
    pub fn observe(&mut self, counters: &CpuCounters) -> Result<SystemCpuInfo, SampleError> {
        if counters.ncpus == 0 {
            return Err(SampleError::counter_unavailable(
                "cpu_totals",
                "kernel reported zero online cpus",
            ));
        }

        // Ticks are summed over all cores; scale back to one core.
        let ncpus = u64::from(counters.ncpus);
        let user = counters.user / ncpus;
        let system = counters.system / ncpus;
        let wait = counters.wait / ncpus;
        let idle = counters.idle / ncpus;
        let total = user + system + wait + idle;

        let previous = self.previous;
        let total_delta = i128::from(total) - i128::from(previous.total);

        let info = if previous.initialized && total_delta > 0 {
            SystemCpuInfo {
                user_percent: share(user, previous.user, total_delta),
                system_percent: share(system, previous.system, total_delta),
                wait_percent: share(wait, previous.wait, total_delta),
            }
        } else {
            SystemCpuInfo::default()
        };

        self.previous = PreviousCpuSample {
            user,
            system,
            wait,
            total,
            initialized: true,
        };

        Ok(info)
    }
}

fn share(now: u64, old: u64, total_delta: i128) -> u32 {
    let delta = i128::from(now.saturating_sub(old));
    let scaled = delta * i128::from(PERCENT_SCALE) / total_delta;
    scaled.clamp(0, i128::from(PERCENT_SCALE)) as u32
}
