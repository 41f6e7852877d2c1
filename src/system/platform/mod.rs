use serde::Serialize;
use sysinfo::System;

/// Descriptive host facts. Every field is best-effort.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HostIdentity {
    pub hostname: Option<String>,
    pub os: Option<String>,
    pub kernel: Option<String>,
}

pub fn host_identity() -> HostIdentity {
    HostIdentity {
        hostname: System::host_name(),
        os: System::long_os_version(),
        kernel: System::kernel_version(),
    }
}

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod unsupported;

#[cfg(target_os = "linux")]
pub use linux::ProcfsSource as NativeSource;
#[cfg(not(target_os = "linux"))]
pub use unsupported::UnsupportedSource as NativeSource;

/// The counter source for the platform this binary was built for.
pub fn native_source() -> NativeSource {
    NativeSource::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::source::CounterSource;

    #[test]
    fn identity_does_not_panic() {
        let _ = host_identity();
    }

    #[test]
    fn native_source_does_not_panic() {
        let source = native_source();
        let _ = source.page_size();
        let _ = source.cpu_totals();
        let _ = source.swap_device_count();
    }
}
