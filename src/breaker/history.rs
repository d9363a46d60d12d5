//! Bounded, time-windowed call and failure history owned by one circuit
//!
//! The history feeds two consumers: the circuit's own failure-probability
//! scoring and the read-only status/audit reporting. It is only ever mutated
//! under the owning circuit's lock.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Trailing window of call records kept for scoring and reporting
pub(crate) const CALL_RETENTION: Duration = Duration::from_secs(3600);

/// Maximum number of failure patterns retained
pub(crate) const PATTERN_CAPACITY: usize = 100;

/// Number of most recent failure patterns kept after a trim
pub(crate) const PATTERN_TRIM_TO: usize = 50;

/// Outcome of one guarded call
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// Monotonic stamp used for window pruning
    pub recorded_at: Instant,

    /// Wall-clock stamp surfaced in reports
    pub timestamp: DateTime<Utc>,

    /// Whether the call completed successfully
    pub succeeded: bool,

    /// Description of the failure, when the call failed
    pub error: Option<String>,

    /// In-flight call count at the time of the record, including this call
    pub concurrent_calls: u32,

    /// Observed duration of the call
    pub duration: Duration,
}

impl CallRecord {
    /// Record a successful call
    pub fn success(concurrent_calls: u32, duration: Duration) -> Self {
        Self {
            recorded_at: Instant::now(),
            timestamp: Utc::now(),
            succeeded: true,
            error: None,
            concurrent_calls,
            duration,
        }
    }

    /// Record a failed call
    pub fn failure(error: impl Into<String>, concurrent_calls: u32, duration: Duration) -> Self {
        Self {
            recorded_at: Instant::now(),
            timestamp: Utc::now(),
            succeeded: false,
            error: Some(error.into()),
            concurrent_calls,
            duration,
        }
    }
}

/// One observed failure, bucketed by error kind
#[derive(Debug, Clone)]
pub struct FailurePattern {
    /// Wall-clock stamp of the failure
    pub timestamp: DateTime<Utc>,

    /// Stable identifier of the error kind (see `ResilienceError::kind`)
    pub error_kind: &'static str,

    /// Failure message, truncated to a reasonable length
    pub error_message: String,

    /// In-flight call count at the time of the failure
    pub concurrent_calls: u32,

    /// Lifetime failure count of the circuit when this failure occurred
    pub cumulative_failures: u64,
}

/// Bounded record store for one circuit
#[derive(Debug, Default)]
pub struct FailureHistory {
    calls: VecDeque<CallRecord>,
    patterns: VecDeque<FailurePattern>,
}

impl FailureHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful call and prune records older than the retention
    /// window
    pub fn record_success(&mut self, record: CallRecord) {
        let now = record.recorded_at;
        self.calls.push_back(record);
        if let Some(cutoff) = now.checked_sub(CALL_RETENTION) {
            self.prune_calls_before(cutoff);
        }
    }

    /// Record a failed call together with its failure pattern
    pub fn record_failure(&mut self, record: CallRecord, pattern: FailurePattern) {
        self.calls.push_back(record);
        self.patterns.push_back(pattern);
        if self.patterns.len() > PATTERN_CAPACITY {
            let excess = self.patterns.len() - PATTERN_TRIM_TO;
            self.patterns.drain(..excess);
        }
    }

    /// Drop call records older than the given cutoff
    pub(crate) fn prune_calls_before(&mut self, cutoff: Instant) {
        while let Some(front) = self.calls.front() {
            if front.recorded_at < cutoff {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// The `n` most recent call records, oldest first
    pub fn recent_calls(&self, n: usize) -> impl Iterator<Item = &CallRecord> {
        let skip = self.calls.len().saturating_sub(n);
        self.calls.iter().skip(skip)
    }

    /// The `n` most recent failure patterns, oldest first
    pub fn recent_patterns(&self, n: usize) -> impl Iterator<Item = &FailurePattern> {
        let skip = self.patterns.len().saturating_sub(n);
        self.patterns.iter().skip(skip)
    }

    /// Number of call records currently retained
    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    /// Number of failure patterns currently retained
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no calls are recorded
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Clear all records
    pub fn clear(&mut self) {
        self.calls.clear();
        self.patterns.clear();
    }
}
