//! Backend Polling
//!
//! Retrieves per-camera people counts from the aggregation backend and
//! turns each poll into a [`PollOutcome`].
//!
//! ## Data Flow
//!
//! 1. [`BackendClient`] fetches `/all_data` (one request per tick)
//! 2. Success: [`CrowdSample::from_snapshot`] sums the counts
//! 3. Failure: a [`FallbackStrategy`] may substitute a synthetic count

mod client;
pub mod fallback;
mod sample;

pub use client::{BackendClient, CrowdSource, PollError};
pub use fallback::{FallbackStrategy, NoFallback, RandomFallback};
pub use sample::{CameraReading, CameraSnapshot, CrowdSample, Location};

/// What one poll produced
#[derive(Debug)]
pub enum PollOutcome {
    Sample(CrowdSample),
    Failed {
        error: PollError,
        fallback: Option<CrowdSample>,
    },
}

impl PollOutcome {
    /// Resolve a fetch result, consulting the fallback on failure
    pub fn resolve(
        result: Result<CameraSnapshot, PollError>,
        fallback: &mut dyn FallbackStrategy,
    ) -> Self {
        match result {
            Ok(snapshot) => PollOutcome::Sample(CrowdSample::from_snapshot(&snapshot)),
            Err(error) => PollOutcome::Failed {
                error,
                fallback: fallback.synthesize().map(CrowdSample::synthetic),
            },
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, PollOutcome::Sample(_))
    }

    /// The sample to feed the monitor, if any
    pub fn sample(&self) -> Option<&CrowdSample> {
        match self {
            PollOutcome::Sample(sample) => Some(sample),
            PollOutcome::Failed { fallback, .. } => fallback.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<u32>);

    impl FallbackStrategy for Fixed {
        fn synthesize(&mut self) -> Option<u32> {
            self.0
        }
    }

    #[test]
    fn test_success_ignores_fallback() {
        let snapshot = vec![(
            "cam1".to_string(),
            CameraReading {
                people_count: 3,
                latitude: 0.0,
                longitude: 0.0,
            },
        )];

        let outcome = PollOutcome::resolve(Ok(snapshot), &mut Fixed(Some(99)));
        assert!(outcome.is_connected());
        assert_eq!(outcome.sample().map(|s| s.total_count), Some(3));
    }

    #[test]
    fn test_failure_without_fallback() {
        let outcome = PollOutcome::resolve(Err(PollError::Unavailable), &mut NoFallback);
        assert!(!outcome.is_connected());
        assert!(outcome.sample().is_none());
    }

    #[test]
    fn test_failure_with_fallback() {
        let outcome = PollOutcome::resolve(Err(PollError::Timeout), &mut Fixed(Some(11)));
        assert!(!outcome.is_connected());

        let sample = outcome.sample().unwrap();
        assert_eq!(sample.total_count, 11);
        assert!(sample.synthetic);
        assert!(sample.location.is_none());
    }
}
