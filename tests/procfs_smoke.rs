#![cfg(target_os = "linux")]

use std::thread;
use std::time::Duration;

use sysprobe::system::collector::HostSampler;
use sysprobe::system::platform::native_source;
use sysprobe::system::retry::RetryPolicy;

fn sampler() -> HostSampler<sysprobe::system::platform::NativeSource> {
    HostSampler::new(native_source(), RetryPolicy::default()).expect("bootstrap from /proc")
}

#[test]
fn bootstrap_reads_live_host_facts() {
    let sampler = sampler();
    let facts = sampler.facts();
    assert!(facts.page_size_bytes >= 1024);
    assert!(facts.total_memory_kb > 0);
    assert!(facts.cpu_count >= 1);
}

#[test]
fn live_process_tree_contains_this_process() {
    let sampler = sampler();
    let tree = sampler.process_tree().expect("process tree");
    let me = std::process::id();
    let entry = tree
        .iter()
        .find(|e| e.pid == me)
        .expect("own pid missing from snapshot");
    assert!(!entry.is_zombie());
    assert!(entry.memory_kb > 0 || entry.is_partial());
}

#[test]
fn live_cycle_produces_bounded_values() {
    let mut sampler = sampler().with_processes(false);
    let first = sampler.refresh();
    assert_eq!(first.cpu.map(|c| c.user_percent), Some(0));

    thread::sleep(Duration::from_millis(50));
    let second = sampler.refresh();
    let cpu = second.cpu.expect("cpu sample");
    assert!(cpu.user_percent <= 1000);
    assert!(cpu.system_percent <= 1000);
    assert!(cpu.wait_percent <= 1000);

    let memory = second.memory.expect("memory sample");
    assert!(memory.used_memory_kb <= memory.total_memory_kb);
    assert!(memory.used_swap_kb <= memory.total_swap_kb);

    let load = second.load_average.expect("load average");
    assert_eq!(load.len(), 3);
    assert!(load.iter().all(|v| *v >= 0.0));
}
