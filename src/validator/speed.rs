//! Speed Plausibility Check
//!
//! Rejects paths that move further between two consecutive samples than
//! the configured bound allows.

use serde::{Serialize, Deserialize};

use crate::core::path::{Path, SampleLayout};

/// Default maximum step between consecutive samples.
pub const DEFAULT_MAX_STEP: u32 = 1;

/// Speed bound and sample decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedPolicy {
    /// Largest allowed step magnitude (inclusive).
    pub max_step: u32,
    /// How byte pairs decode into samples.
    pub layout: SampleLayout,
}

impl Default for SpeedPolicy {
    fn default() -> Self {
        Self {
            max_step: DEFAULT_MAX_STEP,
            layout: SampleLayout::default(),
        }
    }
}

/// Result of evaluating one path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedReport {
    /// Largest step magnitude seen (0 for single-sample paths).
    pub max_speed: u32,
    /// Number of adjacent sample pairs inspected.
    pub steps: usize,
    /// Index of the first step over the bound, if any.
    pub first_violation: Option<usize>,
}

impl SpeedReport {
    /// No step exceeded the bound.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.first_violation.is_none()
    }
}

impl SpeedPolicy {
    /// Create a policy.
    pub const fn new(max_step: u32, layout: SampleLayout) -> Self {
        Self { max_step, layout }
    }

    /// Inspect every adjacent pair of samples.
    ///
    /// The whole path is always walked so `max_speed` is exact even after a violation.
    pub fn evaluate(&self, path: &Path<'_>) -> SpeedReport {
        let mut report = SpeedReport::default();
        let mut samples = path.samples();

        let Some(mut prev) = samples.next() else {
            return report;
        };

        for (index, sample) in samples.enumerate() {
            let speed = prev.step_to(sample, self.layout);

            #[cfg(feature = "debug-tracing")]
            tracing::trace!(index, speed, "path step");

            report.max_speed = report.max_speed.max(speed);
            if speed > self.max_step && report.first_violation.is_none() {
                report.first_violation = Some(index);
            }
            report.steps += 1;
            prev = sample;
        }

        report
    }

    /// True if no step exceeds the bound. Fewer than two samples is always valid.
    pub fn speed_valid(&self, path: &Path<'_>) -> bool {
        self.evaluate(path).is_valid()
    }
}
