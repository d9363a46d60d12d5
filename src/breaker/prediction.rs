//! Failure-probability scoring strategies
//!
//! The probability estimate is advisory only: it is surfaced through circuit
//! status but never drives a state transition. The strategy sits behind a
//! small trait so it can be swapped or tuned without touching the state
//! machine.

#[cfg(test)]
use mockall::automock;

use super::history::FailureHistory;

/// Strategy interface for estimating near-term failure risk from a
/// circuit's history
#[cfg_attr(test, automock)]
pub trait FailurePredictor: Send + Sync {
    /// Estimate the probability that the next call fails, in `[0, 1]`
    fn failure_probability(&self, history: &FailureHistory) -> f64;
}

/// Default heuristic predictor
///
/// Scores the failure rate over the most recent calls, with a fixed bonus
/// when the recent failure patterns show a monotonically non-decreasing
/// cumulative failure count. With the lifetime failure total feeding the
/// patterns, the monotone check holds whenever at least two patterns are
/// recorded, so in practice the bonus reads as "failures have recurred";
/// a predictor fed resets or per-window counts can be more selective.
#[derive(Debug, Clone)]
pub struct HeuristicPredictor {
    /// Number of most recent call records scored
    call_window: usize,

    /// Number of most recent failure patterns inspected for monotonicity
    pattern_window: usize,

    /// Bonus added when the pattern window is non-decreasing
    pattern_bonus: f64,
}

impl Default for HeuristicPredictor {
    fn default() -> Self {
        Self {
            call_window: 10,
            pattern_window: 5,
            pattern_bonus: 0.3,
        }
    }
}

impl HeuristicPredictor {
    /// Create a predictor with the default windows and bonus
    pub fn new() -> Self {
        Self::default()
    }

    fn recent_failure_rate(&self, history: &FailureHistory) -> f64 {
        let window = self.call_window.min(history.call_count());
        if window == 0 {
            return 0.0;
        }

        let failures = history
            .recent_calls(self.call_window)
            .filter(|record| !record.succeeded)
            .count();
        failures as f64 / window as f64
    }

    fn pattern_is_escalating(&self, history: &FailureHistory) -> bool {
        // A monotone check over fewer than two entries is vacuous and would
        // award the bonus to a near-empty history.
        if history.pattern_count() < 2 {
            return false;
        }

        let mut previous: Option<u64> = None;
        for pattern in history.recent_patterns(self.pattern_window) {
            if let Some(prev) = previous {
                if pattern.cumulative_failures < prev {
                    return false;
                }
            }
            previous = Some(pattern.cumulative_failures);
        }
        true
    }
}

impl FailurePredictor for HeuristicPredictor {
    fn failure_probability(&self, history: &FailureHistory) -> f64 {
        let mut probability = self.recent_failure_rate(history);

        if self.pattern_is_escalating(history) {
            probability += self.pattern_bonus;
        }

        probability.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::history::{CallRecord, FailurePattern};
    use super::*;
    use chrono::Utc;

    fn push_success(history: &mut FailureHistory) {
        history.record_success(CallRecord::success(1, Duration::from_millis(1)));
    }

    fn push_failure(history: &mut FailureHistory, cumulative: u64) {
        history.record_failure(
            CallRecord::failure("boom", 1, Duration::from_millis(1)),
            FailurePattern {
                timestamp: Utc::now(),
                error_kind: "service",
                error_message: "boom".to_string(),
                concurrent_calls: 1,
                cumulative_failures: cumulative,
            },
        );
    }

    #[test]
    fn test_empty_history_scores_zero() {
        let predictor = HeuristicPredictor::new();
        assert_eq!(predictor.failure_probability(&FailureHistory::new()), 0.0);
    }

    #[test]
    fn test_all_successes_score_zero() {
        let predictor = HeuristicPredictor::new();
        let mut history = FailureHistory::new();
        for _ in 0..20 {
            push_success(&mut history);
        }
        assert_eq!(predictor.failure_probability(&history), 0.0);
    }

    #[test]
    fn test_rate_uses_recent_window_only() {
        let predictor = HeuristicPredictor::new();
        let mut history = FailureHistory::new();
        // Old failures pushed out of the 10-call window by later successes.
        push_failure(&mut history, 1);
        for _ in 0..10 {
            push_success(&mut history);
        }
        // The single pattern entry is not enough for the escalation bonus.
        assert_eq!(predictor.failure_probability(&history), 0.0);
    }

    #[test]
    fn test_escalating_failures_earn_bonus() {
        let predictor = HeuristicPredictor::new();
        let mut history = FailureHistory::new();
        for i in 0..5 {
            push_success(&mut history);
            push_failure(&mut history, i + 1);
        }
        // 5 of the last 10 calls failed, plus the 0.3 escalation bonus.
        let probability = predictor.failure_probability(&history);
        assert!((probability - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_bonus_applies_once_two_patterns_exist() {
        let predictor = HeuristicPredictor::new();
        let mut history = FailureHistory::new();
        // Two failures separated by a run of successes: the cumulative count
        // never decreases, so the bonus applies even without a streak.
        push_failure(&mut history, 1);
        for _ in 0..7 {
            push_success(&mut history);
        }
        push_failure(&mut history, 2);
        // 2 of the last 9 calls failed, plus the 0.3 bonus.
        let probability = predictor.failure_probability(&history);
        assert!((probability - (2.0 / 9.0 + 0.3)).abs() < 1e-9);
    }

    #[test]
    fn test_probability_is_clamped_to_one() {
        let predictor = HeuristicPredictor::new();
        let mut history = FailureHistory::new();
        for i in 0..15 {
            push_failure(&mut history, i + 1);
        }
        assert_eq!(predictor.failure_probability(&history), 1.0);
    }
}
