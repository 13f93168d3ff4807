//! Turn and tool metrics
//!
//! Recorded through the `metrics` facade; without an installed recorder every
//! macro is a no-op, so nothing here needs configuration.
//!
//! # Metrics
//!
//! - `aizen_turns_total`: Counter of completed turns, labelled by branch
//! - `aizen_turn_duration_seconds`: Histogram of turn duration, labelled by branch
//! - `aizen_tool_calls_total`: Counter of tool invocations by tool and outcome
//! - `aizen_assessor_fallbacks_total`: Counter of assessments that fell back to needs-lookup
//!
//! # Examples
//!
//! ```
//! use aizen::agent::metrics::TurnMetrics;
//!
//! let metrics = TurnMetrics::start();
//! metrics.finish("composed");
//! ```

use metrics::{histogram, increment_counter};
use std::time::{Duration, Instant};

/// Timing for a single turn
///
/// Consumed by `finish`, so a turn cannot be recorded twice.
#[derive(Debug)]
pub struct TurnMetrics {
    start: Instant,
}

impl TurnMetrics {
    /// Start timing a turn
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Time elapsed since the turn started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record the finished turn under its branch label
    ///
    /// # Arguments
    ///
    /// * `branch` - One of "time", "lookup", "composed" or "fallback"
    pub fn finish(self, branch: &str) {
        let duration = self.start.elapsed();

        increment_counter!("aizen_turns_total", "branch" => branch.to_string());
        histogram!(
            "aizen_turn_duration_seconds",
            duration.as_secs_f64(),
            "branch" => branch.to_string()
        );
    }
}

/// Record one tool invocation
///
/// `outcome` is "found", "no_information" or "error".
pub fn record_tool_call(tool: &str, outcome: &str) {
    increment_counter!(
        "aizen_tool_calls_total",
        "tool" => tool.to_string(),
        "outcome" => outcome.to_string()
    );
}

/// Record an assessment that fell back to the conservative default
pub fn record_assessor_fallback() {
    increment_counter!("aizen_assessor_fallbacks_total");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_metrics_elapsed_monotonic() {
        let metrics = TurnMetrics::start();
        let first = metrics.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert!(metrics.elapsed() > first);
        metrics.finish("composed");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_tool_call("calculate", "found");
        record_assessor_fallback();
    }
}
