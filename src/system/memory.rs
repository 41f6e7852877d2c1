use serde::Serialize;

use super::error::SampleError;
use super::host::HostFacts;
use super::retry::{Attempt, RetryPolicy};
use super::source::{CounterSource, SwapEntry, pages_to_kb};

/// Tenths of a percent per whole.
const PERMILLE: u64 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SystemMemoryInfo {
    pub total_memory_kb: u64,
    pub used_memory_kb: u64,
    pub total_swap_kb: u64,
    pub used_swap_kb: u64,
}

impl SystemMemoryInfo {
    /// Used memory in tenths of a percent of total.
    pub fn memory_percent(&self) -> u32 {
        permille(self.used_memory_kb, self.total_memory_kb)
    }

    /// Used swap in tenths of a percent of total, 0 without swap.
    pub fn swap_percent(&self) -> u32 {
        permille(self.used_swap_kb, self.total_swap_kb)
    }
}

fn permille(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    (u128::from(part) * u128::from(PERMILLE) / u128::from(whole)).min(u128::from(PERMILLE)) as u32
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SwapTotals {
    total_pages: u64,
    used_pages: u64,
}

/// Samples memory and swap usage. Holds no state between calls besides the
/// retry policy for the swap table race.
#[derive(Debug, Clone, Default)]
pub struct MemorySampler {
    retry: RetryPolicy,
}

impl MemorySampler {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }

    pub fn sample(
        &self,
        source: &impl CounterSource,
        facts: &HostFacts,
    ) -> Result<SystemMemoryInfo, SampleError> {
        let page_size = facts.page_size_bytes;

        let memory = source.memory_totals()?;
        let used_pages = memory
            .total_pages
            .saturating_sub(memory.free_pages)
            .saturating_sub(memory.cached_pages);

        let swap = self.swap_totals(source)?;

        Ok(SystemMemoryInfo {
            total_memory_kb: pages_to_kb(memory.total_pages, page_size),
            used_memory_kb: pages_to_kb(used_pages, page_size),
            total_swap_kb: pages_to_kb(swap.total_pages, page_size),
            used_swap_kb: pages_to_kb(swap.used_pages, page_size),
        })
    }

    fn swap_totals(&self, source: &impl CounterSource) -> Result<SwapTotals, SampleError> {
        let outcome = self.retry.run(|attempt| -> Result<_, SampleError> {
            let count = source.swap_device_count()?;
            if count == 0 {
                tracing::debug!("no swap configured");
                return Ok(Attempt::Done(SwapTotals::default()));
            }

            // One spare slot so a device added after the count still fits.
            let listing = source.swap_devices(count + 1)?;
            if listing.reported > count {
                tracing::debug!(
                    attempt,
                    count,
                    reported = listing.reported,
                    "swap device added while listing, retrying"
                );
                return Ok(Attempt::Raced);
            }

            Ok(Attempt::Done(sum_swap(&listing.entries)))
        })?;

        outcome.map_err(|exhausted| SampleError::TransientRaceExceeded {
            attempts: exhausted.attempts,
        })
    }
}

fn sum_swap(entries: &[SwapEntry]) -> SwapTotals {
    entries
        .iter()
        .filter(|entry| !entry.flags.is_transitional())
        .fold(SwapTotals::default(), |acc, entry| SwapTotals {
            total_pages: acc.total_pages + entry.pages,
            used_pages: acc.used_pages + entry.pages.saturating_sub(entry.free_pages),
        })
}
