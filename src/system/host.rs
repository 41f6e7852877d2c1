use serde::Serialize;

use super::error::SampleError;
use super::platform::{self, HostIdentity};
use super::source::{CounterSource, pages_to_kb};

/// Static facts about the host, captured once before any sampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostFacts {
    pub page_size_bytes: u64,
    pub total_memory_kb: u64,
    pub cpu_count: u32,
    pub identity: HostIdentity,
}

impl HostFacts {
    /// Reads page size, physical memory and the online CPU count.
    ///
    /// Must run once before the samplers; they all take the result by
    /// reference.
    pub fn bootstrap(source: &impl CounterSource) -> Result<Self, SampleError> {
        let memory = source.memory_totals()?;
        let page_size_bytes = source.page_size()?;
        let cpu_count = source.online_cpus()?;

        Ok(HostFacts {
            page_size_bytes,
            total_memory_kb: pages_to_kb(memory.total_pages, page_size_bytes),
            cpu_count,
            identity: platform::host_identity(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::testing::{ScriptedSource, failure};

    #[test]
    fn bootstrap_captures_static_facts() {
        let source = ScriptedSource::default();
        let facts = HostFacts::bootstrap(&source).unwrap();
        assert_eq!(facts.page_size_bytes, 4096);
        assert_eq!(facts.total_memory_kb, 262_144 * 4);
        assert_eq!(facts.cpu_count, 4);
    }

    #[test]
    fn bootstrap_fails_when_memory_query_fails() {
        let source = ScriptedSource {
            memory: Err(failure("memory_totals")),
            ..ScriptedSource::default()
        };
        let err = HostFacts::bootstrap(&source).unwrap_err();
        assert!(matches!(
            err,
            SampleError::CounterUnavailable {
                query: "memory_totals",
                ..
            }
        ));
    }

    #[test]
    fn bootstrap_fails_when_page_size_query_fails() {
        let source = ScriptedSource {
            page_size: Err(failure("page_size")),
            ..ScriptedSource::default()
        };
        let err = HostFacts::bootstrap(&source).unwrap_err();
        assert!(matches!(
            err,
            SampleError::CounterUnavailable {
                query: "page_size",
                ..
            }
        ));
    }

    #[test]
    fn bootstrap_fails_when_cpu_count_query_fails() {
        let source = ScriptedSource {
            online_cpus: Err(failure("online_cpus")),
            ..ScriptedSource::default()
        };
        let err = HostFacts::bootstrap(&source).unwrap_err();
        assert!(matches!(
            err,
            SampleError::CounterUnavailable {
                query: "online_cpus",
                ..
            }
        ));
    }
}
