use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use sysprobe::config::{self, load_config, load_config_from_path};
use sysprobe::format::{format_cpu_time, format_kb, format_load, format_tenths};
use sysprobe::system::collector::HostSampler;
use sysprobe::system::host::HostFacts;
use sysprobe::system::platform::native_source;
use sysprobe::system::snapshot::HostSnapshot;
use sysprobe::system::source::CounterSource;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sysprobe",
    about = "Sample host and process metrics on a fixed interval"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sampling interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stop after this many cycles.
    #[arg(long)]
    cycles: Option<u64>,

    /// Emit one JSON object per cycle instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Number of load averages to report (1-3)
    #[arg(long)]
    load_averages: Option<usize>,

    /// Log filter, overridden by RUST_LOG.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);
    init_tracing(&cli.log_level, &config.general.log_format)?;

    config.validate()?;
    if cli.cycles == Some(0) {
        return Err(eyre!("--cycles must be greater than 0"));
    }

    let sampler = HostSampler::new(native_source(), config.swap_retry)?
        .with_load_averages(config.general.load_averages)
        .with_processes(config.processes.enabled);

    run(sampler, &config, cli.cycles).await
}

async fn run<S: CounterSource + Send + 'static>(
    mut sampler: HostSampler<S>,
    config: &config::Config,
    cycles: Option<u64>,
) -> Result<()> {
    let json = config.general.output == "json";
    let mut interval = tokio::time::interval(Duration::from_millis(config.general.interval_ms));

    if json {
        println!("{}", serde_json::to_string(sampler.facts())?);
    } else {
        print_banner(sampler.facts());
    }

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Swap retries back off with a blocking sleep.
                let refresh = tokio::task::spawn_blocking(move || {
                    let snapshot = sampler.refresh();
                    (sampler, snapshot)
                });
                let (returned, snapshot) = tokio::select! {
                    joined = refresh => joined?,
                    _ = tokio::signal::ctrl_c() => break,
                };
                sampler = returned;
                if json {
                    println!("{}", serde_json::to_string(&snapshot)?);
                } else {
                    print_snapshot(&snapshot, config.processes.top);
                }
                if cycles.is_some_and(|limit| snapshot.cycle >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> config::Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(interval) = cli.interval_ms {
        config.general.interval_ms = interval;
    }
    if let Some(count) = cli.load_averages {
        config.general.load_averages = count;
    }
    if cli.json {
        config.general.output = "json".to_string();
    }

    config
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| eyre!("failed to set tracing subscriber: {e}"))
}

fn print_banner(facts: &HostFacts) {
    let unknown = || "unknown".to_string();
    println!(
        "{} ({}, kernel {})",
        facts.identity.hostname.clone().unwrap_or_else(unknown),
        facts.identity.os.clone().unwrap_or_else(unknown),
        facts.identity.kernel.clone().unwrap_or_else(unknown),
    );
    println!(
        "{} cpus, {} memory, {} byte pages",
        facts.cpu_count,
        format_kb(facts.total_memory_kb),
        facts.page_size_bytes
    );
}

fn print_snapshot(snapshot: &HostSnapshot, top: usize) {
    let mut line = format!("#{}", snapshot.cycle);

    match &snapshot.load_average {
        Some(load) => line.push_str(&format!("  load {}", format_load(load))),
        None => line.push_str("  load -"),
    }
    match &snapshot.cpu {
        Some(cpu) => line.push_str(&format!(
            "  cpu usr {} sys {} wait {}",
            format_tenths(cpu.user_percent),
            format_tenths(cpu.system_percent),
            format_tenths(cpu.wait_percent)
        )),
        None => line.push_str("  cpu -"),
    }
    match &snapshot.memory {
        Some(mem) => line.push_str(&format!(
            "  mem {}/{} ({})  swap {}/{} ({})",
            format_kb(mem.used_memory_kb),
            format_kb(mem.total_memory_kb),
            format_tenths(mem.memory_percent()),
            format_kb(mem.used_swap_kb),
            format_kb(mem.total_swap_kb),
            format_tenths(mem.swap_percent())
        )),
        None => line.push_str("  mem -"),
    }
    if let Some(tree) = &snapshot.process_tree {
        let zombies = tree.iter().filter(|p| p.is_zombie()).count();
        line.push_str(&format!("  procs {} ({} zombie)", tree.len(), zombies));
    }
    println!("{line}");

    let Some(tree) = &snapshot.process_tree else {
        return;
    };
    if top == 0 {
        return;
    }

    let hierarchy = tree.hierarchy();
    let mut largest: Vec<_> = tree.iter().collect();
    largest.sort_by(|a, b| b.memory_kb.cmp(&a.memory_kb));
    println!(
        "  {:>7} {:>7} {:>10} {:>12} {:>10} {:>5}",
        "PID", "PPID", "RSS", "CPU TIME", "TREE RSS", "KIDS"
    );
    for entry in largest.into_iter().take(top) {
        let totals = hierarchy.totals_of(entry.pid).unwrap_or_default();
        println!(
            "  {:>7} {:>7} {:>10} {:>12} {:>10} {:>5}",
            entry.pid,
            entry.parent_pid,
            format_kb(entry.memory_kb),
            format_cpu_time(entry.cpu_time_centiseconds),
            format_kb(totals.memory_kb),
            hierarchy.children_of(entry.pid).len()
        );
    }
}
