use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::system::loadavg::LOAD_AVERAGE_SCALE;
use crate::system::source::{
    CounterSource, CpuCounters, MemoryCounters, ProcessUsage, RawProcess, RawProcessState,
    SourceError, SwapEntry, SwapFlags, SwapListing,
};

const FALLBACK_PAGE_SIZE: u64 = 4096;
const FALLBACK_CLOCK_TICKS: u64 = 100;

/// Reads kernel counters from procfs.
pub struct ProcfsSource {
    root: PathBuf,
    page_size: u64,
    clock_ticks: u64,
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcfsSource {
    pub fn new() -> Self {
        Self::with_root("/proc", sysconf_page_size(), sysconf_clock_ticks())
    }

    /// A source over an alternate procfs tree, e.g. a container's host mount.
    pub fn with_root(root: impl Into<PathBuf>, page_size: u64, clock_ticks: u64) -> Self {
        ProcfsSource {
            root: root.into(),
            page_size: page_size.max(1),
            clock_ticks: clock_ticks.max(1),
        }
    }

    fn read(&self, query: &'static str, rel: impl AsRef<Path>) -> Result<String, SourceError> {
        let path = self.root.join(rel);
        fs::read_to_string(&path)
            .map_err(|e| SourceError::new(query, format!("{}: {e}", path.display())))
    }

    fn kb_to_pages(&self, kb: u64) -> u64 {
        kb.saturating_mul(1024) / self.page_size
    }

    fn ticks_to_duration(&self, ticks: u64) -> Duration {
        let secs = ticks / self.clock_ticks;
        let rem = ticks % self.clock_ticks;
        Duration::from_secs(secs) + Duration::from_nanos(rem * 1_000_000_000 / self.clock_ticks)
    }

    fn pids(&self, query: &'static str) -> Result<Vec<u32>, SourceError> {
        let entries = fs::read_dir(&self.root)
            .map_err(|e| SourceError::new(query, format!("{}: {e}", self.root.display())))?;
        let mut pids: Vec<u32> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .collect();
        pids.sort_unstable();
        Ok(pids)
    }

    fn boot_time(&self) -> Result<i64, SourceError> {
        let stat = self.read("boot_time", "stat")?;
        stat.lines()
            .find_map(|line| line.strip_prefix("btime ")?.trim().parse().ok())
            .ok_or_else(|| SourceError::new("boot_time", "no btime line in stat"))
    }
}

fn sysconf_page_size() -> u64 {
    let value = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if value > 0 {
        value as u64
    } else {
        FALLBACK_PAGE_SIZE
    }
}

fn sysconf_clock_ticks() -> u64 {
    let value = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if value > 0 {
        value as u64
    } else {
        FALLBACK_CLOCK_TICKS
    }
}

/// Fields of `/proc/<pid>/stat` we need.
#[derive(Debug, PartialEq, Eq)]
struct PidStat {
    state: RawProcessState,
    ppid: u32,
    utime: u64,
    stime: u64,
    starttime: u64,
}

fn parse_pid_stat(contents: &str) -> Option<PidStat> {
    // comm field may contain spaces and parens, so find the closing )
    let after_comm = contents.rfind(')')? + 1;
    let fields: Vec<&str> = contents[after_comm..].split_whitespace().collect();
    // Fields after comm: state(0) ppid(1) pgrp(2) session(3) tty_nr(4)
    // tpgid(5) flags(6) minflt(7) cminflt(8) majflt(9) cmajflt(10)
    // utime(11) stime(12) cutime(13) cstime(14) priority(15) nice(16)
    // num_threads(17) itrealvalue(18) starttime(19)
    let state = match fields.first()?.chars().next()? {
        'R' => RawProcessState::Running,
        'S' | 'D' | 'I' => RawProcessState::Sleeping,
        'T' | 't' => RawProcessState::Stopped,
        'Z' => RawProcessState::Zombie,
        _ => RawProcessState::Other,
    };
    Some(PidStat {
        state,
        ppid: fields.get(1)?.parse().ok()?,
        utime: fields.get(11)?.parse().ok()?,
        stime: fields.get(12)?.parse().ok()?,
        starttime: fields.get(19)?.parse().ok()?,
    })
}

fn parse_meminfo_kb(contents: &str, key: &str) -> Option<u64> {
    contents.lines().find_map(|line| {
        let rest = line.strip_prefix(key)?.strip_prefix(':')?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

fn parse_cpu_line(contents: &str) -> Option<[u64; 4]> {
    let line = contents
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))?;
    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse().unwrap_or(0))
        .collect();
    // user nice system idle iowait irq softirq ...
    let at = |i: usize| values.get(i).copied().unwrap_or(0);
    Some([
        at(0) + at(1),
        at(2) + at(5) + at(6),
        at(4),
        at(3),
    ])
}

fn count_cpu_lines(contents: &str) -> u32 {
    contents
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|tag| {
            tag.strip_prefix("cpu")
                .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
        })
        .count() as u32
}

fn parse_loadavg(contents: &str) -> Option<[u64; 3]> {
    let mut fields = contents.split_whitespace();
    let mut out = [0u64; 3];
    for slot in &mut out {
        let value: f64 = fields.next()?.parse().ok()?;
        *slot = (value * LOAD_AVERAGE_SCALE).round() as u64;
    }
    Some(out)
}

fn parse_swap_line(line: &str) -> Option<(String, u64, u64)> {
    // Filename Type Size Used Priority
    let fields: Vec<&str> = line.split_whitespace().collect();
    let size_kb = fields.get(2)?.parse().ok()?;
    let used_kb = fields.get(3)?.parse().ok()?;
    Some((fields.first()?.to_string(), size_kb, used_kb))
}

fn swap_lines(contents: &str) -> impl Iterator<Item = &str> {
    contents.lines().skip(1).filter(|line| !line.trim().is_empty())
}

impl CounterSource for ProcfsSource {
    fn page_size(&self) -> Result<u64, SourceError> {
        Ok(self.page_size)
    }

    fn memory_totals(&self) -> Result<MemoryCounters, SourceError> {
        let meminfo = self.read("memory_totals", "meminfo")?;
        let field = |key: &str| {
            parse_meminfo_kb(&meminfo, key)
                .ok_or_else(|| SourceError::new("memory_totals", format!("missing {key}")))
        };
        Ok(MemoryCounters {
            total_pages: self.kb_to_pages(field("MemTotal")?),
            free_pages: self.kb_to_pages(field("MemFree")?),
            cached_pages: self.kb_to_pages(parse_meminfo_kb(&meminfo, "Cached").unwrap_or(0)),
        })
    }

    fn online_cpus(&self) -> Result<u32, SourceError> {
        let stat = self.read("online_cpus", "stat")?;
        match count_cpu_lines(&stat) {
            0 => Err(SourceError::new("online_cpus", "no per-cpu lines in stat")),
            n => Ok(n),
        }
    }

    fn cpu_totals(&self) -> Result<CpuCounters, SourceError> {
        let stat = self.read("cpu_totals", "stat")?;
        let [user, system, wait, idle] = parse_cpu_line(&stat)
            .ok_or_else(|| SourceError::new("cpu_totals", "no aggregate cpu line in stat"))?;
        let loadavg = self.read("cpu_totals", "loadavg")?;
        let load_average = parse_loadavg(&loadavg)
            .ok_or_else(|| SourceError::new("cpu_totals", "malformed loadavg"))?;
        Ok(CpuCounters {
            user,
            system,
            wait,
            idle,
            ncpus: count_cpu_lines(&stat),
            load_average,
        })
    }

    fn process_count(&self) -> Result<usize, SourceError> {
        Ok(self.pids("process_count")?.len())
    }

    fn processes(&self, first_pid: u32, max: usize) -> Result<Vec<RawProcess>, SourceError> {
        let boot_time = self.boot_time()?;
        let pids = self.pids("processes")?;
        let mut out = Vec::with_capacity(max.min(pids.len()));
        for pid in pids.into_iter().filter(|&pid| pid >= first_pid) {
            if out.len() == max {
                break;
            }
            // Exited since the directory listing.
            let Ok(contents) = fs::read_to_string(self.root.join(pid.to_string()).join("stat"))
            else {
                continue;
            };
            let Some(stat) = parse_pid_stat(&contents) else {
                continue;
            };
            out.push(RawProcess {
                pid,
                ppid: stat.ppid,
                start_time: boot_time + (stat.starttime / self.clock_ticks) as i64,
                state: stat.state,
            });
        }
        Ok(out)
    }

    fn process_usage(&self, process: &RawProcess) -> Result<ProcessUsage, SourceError> {
        let dir = PathBuf::from(process.pid.to_string());
        let stat = self.read("process_usage", dir.join("stat"))?;
        let stat = parse_pid_stat(&stat)
            .ok_or_else(|| SourceError::new("process_usage", "malformed stat"))?;
        let statm = self.read("process_usage", dir.join("statm"))?;
        // size resident shared text lib data dt
        let fields: Vec<u64> = statm
            .split_whitespace()
            .map(|v| v.parse().unwrap_or(0))
            .collect();
        let resident = fields.get(1).copied().unwrap_or(0);
        let shared = fields.get(2).copied().unwrap_or(0).min(resident);
        Ok(ProcessUsage {
            data_resident_pages: resident - shared,
            text_resident_pages: shared,
            user_time: self.ticks_to_duration(stat.utime),
            system_time: self.ticks_to_duration(stat.stime),
        })
    }

    fn swap_device_count(&self) -> Result<usize, SourceError> {
        let swaps = self.read("swap_device_count", "swaps")?;
        Ok(swap_lines(&swaps).count())
    }

    fn swap_devices(&self, capacity: usize) -> Result<SwapListing, SourceError> {
        let swaps = self.read("swap_devices", "swaps")?;
        let mut listing = SwapListing::default();
        for line in swap_lines(&swaps) {
            listing.reported += 1;
            if listing.entries.len() == capacity {
                continue;
            }
            let (path, size_kb, used_kb) = parse_swap_line(line)
                .ok_or_else(|| SourceError::new("swap_devices", format!("malformed line {line:?}")))?;
            let pages = self.kb_to_pages(size_kb);
            listing.entries.push(SwapEntry {
                path,
                pages,
                free_pages: pages.saturating_sub(self.kb_to_pages(used_kb)),
                // procfs exposes no deletion states.
                flags: SwapFlags::default(),
            });
        }
        Ok(listing)
    }
}
