pub fn format_kb(kb: u64) -> String {
    const MB: u64 = 1024;
    const GB: u64 = 1024 * 1024;

    if kb >= GB {
        format!("{:.1} GB", kb as f64 / GB as f64)
    } else if kb >= MB {
        format!("{:.1} MB", kb as f64 / MB as f64)
    } else {
        format!("{kb} KB")
    }
}

/// Renders a tenths-of-a-percent value, e.g. 505 as "50.5%".
pub fn format_tenths(value: u32) -> String {
    format!("{}.{}%", value / 10, value % 10)
}

/// Renders a `cpu_time_centiseconds` value (ten units per second) as
/// `h:mm:ss.t`.
pub fn format_cpu_time(units: u64) -> String {
    let tenths = units % 10;
    let secs = units / 10;
    format!(
        "{}:{:02}:{:02}.{}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        tenths
    )
}

pub fn format_load(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}
