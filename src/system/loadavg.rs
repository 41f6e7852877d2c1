use super::error::SampleError;
use super::source::CounterSource;

/// Fraction bits of the kernel's fixed-point load averages.
pub const LOAD_AVERAGE_SHIFT: u32 = 16;
/// Divisor turning a fixed-point load average into a float.
pub const LOAD_AVERAGE_SCALE: f64 = (1u64 << LOAD_AVERAGE_SHIFT) as f64;
/// The kernel keeps 1, 5 and 15 minute averages.
pub const LOAD_AVERAGE_SLOTS: usize = 3;

/// Returns up to three load averages, most recent interval first.
///
/// `count` is clamped to [`LOAD_AVERAGE_SLOTS`]; slots past `count` are never
/// read.
pub fn sample(source: &impl CounterSource, count: usize) -> Result<Vec<f64>, SampleError> {
    let cpu = source.cpu_totals()?;
    let count = count.min(LOAD_AVERAGE_SLOTS);
    Ok(cpu.load_average[..count]
        .iter()
        .map(|&raw| raw as f64 / LOAD_AVERAGE_SCALE)
        .collect())
}

/// Like [`sample`], but reports `count` zeros when the query fails.
pub fn sample_or_zeroed(source: &impl CounterSource, count: usize) -> Vec<f64> {
    sample(source, count).unwrap_or_else(|err| {
        tracing::debug!(error = %err, "load average unavailable, reporting zeros");
        vec![0.0; count.min(LOAD_AVERAGE_SLOTS)]
    })
}
