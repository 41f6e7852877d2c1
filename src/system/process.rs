use std::collections::HashMap;
use std::ops::BitOr;

use serde::Serialize;

use super::error::SampleError;
use super::host::HostFacts;
use super::source::{CounterSource, ProcessUsage, RawProcessState, pages_to_kb};

/// Per-process status bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StatusFlags(u8);

impl StatusFlags {
    pub const ZOMBIE: StatusFlags = StatusFlags(0b01);
    /// The usage query failed; memory and cpu time are reported as zero.
    pub const PARTIAL: StatusFlags = StatusFlags(0b10);

    pub fn empty() -> Self {
        StatusFlags(0)
    }

    pub fn contains(self, other: StatusFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: StatusFlags) {
        self.0 |= other.0;
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for StatusFlags {
    type Output = StatusFlags;

    fn bitor(self, rhs: StatusFlags) -> StatusFlags {
        StatusFlags(self.0 | rhs.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessSnapshotEntry {
    pub pid: u32,
    pub parent_pid: u32,
    /// Seconds since the unix epoch.
    pub start_time: i64,
    /// Cumulative user + system time since the process started, ten units
    /// per second.
    pub cpu_time_centiseconds: u64,
    /// Resident memory.
    pub memory_kb: u64,
    pub status_flags: StatusFlags,
}

impl ProcessSnapshotEntry {
    pub fn is_zombie(&self) -> bool {
        self.status_flags.contains(StatusFlags::ZOMBIE)
    }

    pub fn is_partial(&self) -> bool {
        self.status_flags.contains(StatusFlags::PARTIAL)
    }
}

/// One pass over the process table, in kernel order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProcessTree {
    pub entries: Vec<ProcessSnapshotEntry>,
}

/// Enumerates every process with a discover-then-fill pair of queries.
///
/// Processes started between the two queries may be missing from the result;
/// a process whose usage cannot be read is kept with zeroed usage and the
/// [`StatusFlags::PARTIAL`] bit.
pub fn build_snapshot(
    source: &impl CounterSource,
    facts: &HostFacts,
) -> Result<ProcessTree, SampleError> {
    let treesize = source.process_count()?;
    if treesize == 0 {
        return Ok(ProcessTree::default());
    }

    let records = source.processes(0, treesize)?;

    let mut entries = Vec::with_capacity(records.len());
    for record in records.iter().take(treesize) {
        let mut entry = ProcessSnapshotEntry {
            pid: record.pid,
            parent_pid: record.ppid,
            start_time: record.start_time,
            cpu_time_centiseconds: 0,
            memory_kb: 0,
            status_flags: StatusFlags::empty(),
        };

        if record.state == RawProcessState::Zombie {
            entry.status_flags.insert(StatusFlags::ZOMBIE);
        } else {
            match source.process_usage(record) {
                Ok(usage) => {
                    entry.memory_kb = resident_kb(&usage, facts.page_size_bytes);
                    entry.cpu_time_centiseconds = cpu_time_centiseconds(&usage);
                }
                Err(err) => {
                    tracing::debug!(pid = record.pid, error = %err, "process usage unavailable");
                    entry.status_flags.insert(StatusFlags::PARTIAL);
                }
            }
        }

        entries.push(entry);
    }

    Ok(ProcessTree { entries })
}

fn resident_kb(usage: &ProcessUsage, page_size: u64) -> u64 {
    pages_to_kb(
        usage.data_resident_pages + usage.text_resident_pages,
        page_size,
    )
}

fn cpu_time_centiseconds(usage: &ProcessUsage) -> u64 {
    ((usage.user_time + usage.system_time).as_secs_f64() * 10.0) as u64
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SubtreeTotals {
    pub memory_kb: u64,
    pub cpu_time_centiseconds: u64,
    pub descendants: usize,
}

/// Parent/child links and per-subtree totals derived from one snapshot.
#[derive(Clone, Debug, Default)]
pub struct ProcessHierarchy {
    pub children: HashMap<u32, Vec<u32>>,
    pub totals: HashMap<u32, SubtreeTotals>,
}

impl ProcessHierarchy {
    pub fn children_of(&self, pid: u32) -> &[u32] {
        self.children.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn totals_of(&self, pid: u32) -> Option<SubtreeTotals> {
        self.totals.get(&pid).copied()
    }
}

impl ProcessTree {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessSnapshotEntry> {
        self.entries.iter()
    }

    pub fn partial_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_partial()).count()
    }

    /// Links children to parents by pid and sums usage over each subtree.
    /// Entries whose parent is absent from the snapshot become roots.
    pub fn hierarchy(&self) -> ProcessHierarchy {
        let by_pid: HashMap<u32, &ProcessSnapshotEntry> =
            self.entries.iter().map(|e| (e.pid, e)).collect();

        let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
        for entry in by_pid.values() {
            if entry.parent_pid != entry.pid && by_pid.contains_key(&entry.parent_pid) {
                children
                    .entry(entry.parent_pid)
                    .or_default()
                    .push(entry.pid);
            }
        }
        for kids in children.values_mut() {
            kids.sort_unstable();
        }

        let mut totals = HashMap::with_capacity(by_pid.len());
        for &pid in by_pid.keys() {
            subtree_totals_cached(pid, &by_pid, &children, &mut totals);
        }

        ProcessHierarchy { children, totals }
    }
}

fn subtree_totals_cached(
    pid: u32,
    by_pid: &HashMap<u32, &ProcessSnapshotEntry>,
    children: &HashMap<u32, Vec<u32>>,
    cache: &mut HashMap<u32, SubtreeTotals>,
) -> SubtreeTotals {
    if let Some(&cached) = cache.get(&pid) {
        return cached;
    }
    let Some(entry) = by_pid.get(&pid) else {
        return SubtreeTotals::default();
    };
    // Placeholder so a parent loop from pid reuse terminates.
    cache.insert(pid, SubtreeTotals::default());

    let mut total = SubtreeTotals {
        memory_kb: entry.memory_kb,
        cpu_time_centiseconds: entry.cpu_time_centiseconds,
        descendants: 0,
    };
    for &child in children.get(&pid).map(Vec::as_slice).unwrap_or(&[]) {
        let sub = subtree_totals_cached(child, by_pid, children, cache);
        total.memory_kb += sub.memory_kb;
        total.cpu_time_centiseconds += sub.cpu_time_centiseconds;
        total.descendants += sub.descendants + 1;
    }
    cache.insert(pid, total);
    total
}
