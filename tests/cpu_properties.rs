use proptest::prelude::*;
use sysprobe::system::cpu::{CpuDeltaSampler, PERCENT_SCALE, SystemCpuInfo};
use sysprobe::system::source::CpuCounters;

fn counters(ticks: [u64; 4], ncpus: u32) -> CpuCounters {
    CpuCounters {
        user: ticks[0],
        system: ticks[1],
        wait: ticks[2],
        idle: ticks[3],
        ncpus,
        load_average: [0; 3],
    }
}

fn scaled(ticks: [u64; 4], ncpus: u32) -> [u64; 4] {
    ticks.map(|t| t * u64::from(ncpus))
}

fn advance(base: [u64; 4], step: [u64; 4]) -> [u64; 4] {
    [
        base[0] + step[0],
        base[1] + step[1],
        base[2] + step[2],
        base[3] + step[3],
    ]
}

fn run(samples: &[CpuCounters]) -> Vec<SystemCpuInfo> {
    let mut sampler = CpuDeltaSampler::new();
    samples
        .iter()
        .map(|c| sampler.observe(c).expect("non-zero core count"))
        .collect()
}

fn ticks() -> impl Strategy<Value = [u64; 4]> {
    prop::array::uniform4(0u64..10_000_000)
}

fn steps() -> impl Strategy<Value = [u64; 4]> {
    prop::array::uniform4(0u64..100_000)
}

proptest! {
    #[test]
    fn per_core_normalization_is_scale_invariant(
        base in ticks(),
        step in steps(),
        ncpus in 1u32..256,
    ) {
        let next = advance(base, step);
        let single = run(&[counters(base, 1), counters(next, 1)]);
        let multi = run(&[
            counters(scaled(base, ncpus), ncpus),
            counters(scaled(next, ncpus), ncpus),
        ]);
        prop_assert_eq!(single, multi);
    }

    #[test]
    fn first_call_is_always_zero(raw in ticks(), ncpus in 1u32..256) {
        let mut sampler = CpuDeltaSampler::new();
        let info = sampler.observe(&counters(raw, ncpus)).unwrap();
        prop_assert_eq!(info, SystemCpuInfo::default());
        prop_assert!(sampler.previous().initialized);
    }

    #[test]
    fn percentages_stay_in_range(
        readings in prop::collection::vec((ticks(), 1u32..16), 2..12),
    ) {
        let samples: Vec<CpuCounters> = readings
            .iter()
            .map(|&(raw, ncpus)| counters(raw, ncpus))
            .collect();
        for info in run(&samples) {
            for value in [info.user_percent, info.system_percent, info.wait_percent] {
                prop_assert!(u64::from(value) <= PERCENT_SCALE);
            }
        }
    }

    #[test]
    fn non_positive_interval_reports_exact_zero(
        later in ticks(),
        rewind in steps(),
        ncpus in 1u32..16,
    ) {
        // The second reading never moves the per-core total forward.
        let earlier = advance(later, rewind);
        let infos = run(&[counters(scaled(earlier, ncpus), ncpus), counters(scaled(later, ncpus), ncpus)]);
        prop_assert_eq!(infos[1], SystemCpuInfo::default());
    }

    #[test]
    fn monotonic_shares_sum_to_at_most_full(
        base in ticks(),
        step in steps(),
    ) {
        let infos = run(&[counters(base, 1), counters(advance(base, step), 1)]);
        let info = infos[1];
        let busy = u64::from(info.user_percent) + u64::from(info.system_percent) + u64::from(info.wait_percent);
        prop_assert!(busy <= PERCENT_SCALE);
    }
}
