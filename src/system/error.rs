use super::source::SourceError;

/// Errors returned by the sampling operations.
///
/// Every variant describes a failure of one sampling call only; the next
/// cycle may succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    /// A whole-aggregate kernel query failed.
    #[error("counter unavailable: {query} failed: {message}")]
    CounterUnavailable {
        query: &'static str,
        message: String,
    },

    /// The swap device table kept changing underneath the sampler.
    #[error("swap configuration changed during sampling {attempts} times in a row")]
    TransientRaceExceeded { attempts: u32 },
}

impl SampleError {
    pub fn counter_unavailable(query: &'static str, message: impl Into<String>) -> Self {
        SampleError::CounterUnavailable {
            query,
            message: message.into(),
        }
    }
}

impl From<SourceError> for SampleError {
    fn from(err: SourceError) -> Self {
        SampleError::CounterUnavailable {
            query: err.query,
            message: err.message,
        }
    }
}
