//! Per-dependency circuit breaker
//!
//! Wraps a single external dependency; gates, time-boxes, and
//! concurrency-limits calls to it; tracks outcomes in a bounded history; and
//! estimates near-term failure probability.
//!
//! All state, counters, and history live behind one mutex per circuit.
//! Critical sections are kept short: the guarded operation itself always runs
//! outside the lock, so a slow dependency never blocks status reads or the
//! admission decisions of other callers.

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::CircuitConfig;
use crate::error::{ResilienceError, Result};
use crate::util;

use super::history::{CallRecord, FailureHistory, FailurePattern};
use super::prediction::{FailurePredictor, HeuristicPredictor};
use super::CircuitState;

/// Stored failure messages are truncated to this length
const MAX_STORED_ERROR_LEN: usize = 200;

/// Mutable circuit state, guarded by the circuit's lock
#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    concurrent_calls: u32,
    total_successes: u64,
    total_failures: u64,
    last_failure_at: Option<(Instant, DateTime<Utc>)>,
    last_success_at: Option<(Instant, DateTime<Utc>)>,
    history: FailureHistory,
}

impl CircuitInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            concurrent_calls: 0,
            total_successes: 0,
            total_failures: 0,
            last_failure_at: None,
            last_success_at: None,
            history: FailureHistory::new(),
        }
    }
}

/// Point-in-time snapshot of one circuit
///
/// Best effort: a snapshot may be one update stale relative to concurrent
/// callers, but every field within it comes from a single locked read.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitStatus {
    /// Circuit name
    pub name: String,

    /// Current state
    pub state: CircuitState,

    /// Failure count driving the open transition
    pub failure_count: u32,

    /// Successes since the circuit last entered half-open (or was created)
    pub success_count: u32,

    /// Calls currently in flight
    pub concurrent_calls: u32,

    /// Wall-clock time of the most recent failure
    pub last_failure_at: Option<DateTime<Utc>>,

    /// Wall-clock time of the most recent success
    pub last_success_at: Option<DateTime<Utc>>,

    /// Advisory near-term failure probability in `[0, 1]`
    pub failure_probability: f64,

    /// Call records currently retained in the trailing window
    pub recorded_calls: usize,

    /// Lifetime successful calls
    pub total_successes: u64,

    /// Lifetime failed calls (including timeouts)
    pub total_failures: u64,
}

/// A thread-safe circuit breaker guarding one external dependency
///
/// The breaker knows nothing about what the guarded operation does; it only
/// observes success, failure, and duration.
pub struct CircuitBreaker {
    name: String,
    config: CircuitConfig,
    predictor: Box<dyn FailurePredictor>,
    inner: Mutex<CircuitInner>,
}

/// Decrements the in-flight counter when an admitted call leaves the
/// breaker, on every exit path including cancellation of the call future.
struct InFlightGuard<'a> {
    breaker: &'a CircuitBreaker,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.breaker.inner.lock().unwrap();
        inner.concurrent_calls = inner.concurrent_calls.saturating_sub(1);
    }
}

impl CircuitBreaker {
    /// Create a circuit breaker with the default prediction heuristic
    ///
    /// The configuration is validated once here; an invalid configuration is
    /// a configuration error.
    pub fn new(name: impl Into<String>, config: CircuitConfig) -> Result<Self> {
        Self::with_predictor(name, config, Box::new(HeuristicPredictor::new()))
    }

    /// Create a circuit breaker with a custom prediction strategy
    pub fn with_predictor(
        name: impl Into<String>,
        config: CircuitConfig,
        predictor: Box<dyn FailurePredictor>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            predictor,
            inner: Mutex::new(CircuitInner::new()),
        })
    }

    /// Circuit name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Circuit configuration
    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    /// Current state
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    /// Execute a guarded operation through this circuit
    ///
    /// Admission, bookkeeping, and state transitions are serialized by the
    /// circuit's lock; the operation itself runs outside it under a deadline
    /// of `call_timeout`. When the deadline elapses the operation is
    /// abandoned and the call is bookkept as a timeout failure; side effects
    /// of the abandoned operation are not guaranteed to be rolled back, so
    /// guarded operations should be idempotent or safely retryable.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.admit()?;
        let _guard = InFlightGuard { breaker: self };

        let (outcome, elapsed) = util::measure_time_async(|| async move {
            tokio::time::timeout(self.config.call_timeout, operation()).await
        })
        .await;

        match outcome {
            Ok(Ok(value)) => {
                self.record_success(elapsed);
                Ok(value)
            }
            Ok(Err(err)) => {
                self.record_failure(err.kind(), &err.to_string(), elapsed);
                Err(err)
            }
            Err(_) => {
                let err = ResilienceError::timeout(&self.name, self.config.call_timeout);
                self.record_failure(err.kind(), &err.to_string(), elapsed);
                Err(err)
            }
        }
    }

    /// Advisory estimate of near-term failure probability, in `[0, 1]`
    pub fn failure_probability(&self) -> f64 {
        let inner = self.inner.lock().unwrap();
        self.predictor.failure_probability(&inner.history)
    }

    /// Snapshot the circuit's status
    pub fn status(&self) -> CircuitStatus {
        let inner = self.inner.lock().unwrap();
        CircuitStatus {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            concurrent_calls: inner.concurrent_calls,
            last_failure_at: inner.last_failure_at.map(|(_, wall)| wall),
            last_success_at: inner.last_success_at.map(|(_, wall)| wall),
            failure_probability: self.predictor.failure_probability(&inner.history),
            recorded_calls: inner.history.call_count(),
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
        }
    }

    /// Reset the circuit to its pristine closed state
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        let in_flight = inner.concurrent_calls;
        *inner = CircuitInner::new();
        // In-flight calls keep their admission; only bookkeeping resets.
        inner.concurrent_calls = in_flight;
        log::info!("Circuit '{}' reset to Closed", self.name);
    }

    /// Force the circuit into a given state, for tests that need to simulate
    /// inconsistent or aged breakers without replaying call traffic
    #[cfg(test)]
    pub(crate) fn force_state(&self, state: CircuitState) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = state;
        if state == CircuitState::Open && inner.last_failure_at.is_none() {
            inner.last_failure_at = Some((Instant::now(), Utc::now()));
        }
    }

    /// Admission check: state gate first, then the concurrency cap.
    /// Increments the in-flight counter when the call is admitted.
    fn admit(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();

        if inner.state == CircuitState::Open {
            let cooled_down = match inner.last_failure_at {
                Some((at, _)) => at.elapsed() >= self.config.recovery_timeout,
                // No failure stamp recorded; allow the recovery probe.
                None => true,
            };

            if cooled_down {
                inner.state = CircuitState::HalfOpen;
                inner.success_count = 0;
                log::info!(
                    "Circuit '{}' transitioning to HalfOpen after cooldown",
                    self.name
                );
            } else {
                let elapsed = inner
                    .last_failure_at
                    .map(|(at, _)| at.elapsed())
                    .unwrap_or_default();
                let remaining = self.config.recovery_timeout.saturating_sub(elapsed);
                log::debug!(
                    "Circuit '{}' is Open, rejecting call ({}ms cooldown left)",
                    self.name,
                    remaining.as_millis()
                );
                return Err(ResilienceError::circuit_open(&self.name, remaining));
            }
        }

        if inner.concurrent_calls >= self.config.max_concurrent_calls {
            log::debug!(
                "Circuit '{}' at concurrency limit ({} in flight)",
                self.name,
                inner.concurrent_calls
            );
            return Err(ResilienceError::overloaded(
                &self.name,
                self.config.max_concurrent_calls,
            ));
        }

        inner.concurrent_calls += 1;
        Ok(())
    }

    fn record_success(&self, duration: Duration) {
        let mut inner = self.inner.lock().unwrap();
        let concurrent = inner.concurrent_calls;

        inner.history.record_success(CallRecord::success(concurrent, duration));
        inner.success_count += 1;
        inner.total_successes += 1;
        inner.failure_count = 0;
        inner.last_success_at = Some((Instant::now(), Utc::now()));

        if inner.state == CircuitState::HalfOpen
            && inner.success_count >= self.config.success_threshold
        {
            inner.state = CircuitState::Closed;
            log::info!(
                "Circuit '{}' closed after {} half-open successes",
                self.name,
                inner.success_count
            );
        }
    }

    fn record_failure(&self, kind: &'static str, message: &str, duration: Duration) {
        let mut inner = self.inner.lock().unwrap();
        let concurrent = inner.concurrent_calls;

        inner.failure_count += 1;
        inner.total_failures += 1;
        inner.last_failure_at = Some((Instant::now(), Utc::now()));

        let stored = util::truncate_string(message, MAX_STORED_ERROR_LEN);
        let cumulative = inner.total_failures;
        inner.history.record_failure(
            CallRecord::failure(stored.clone(), concurrent, duration),
            FailurePattern {
                timestamp: Utc::now(),
                error_kind: kind,
                error_message: stored,
                concurrent_calls: concurrent,
                cumulative_failures: cumulative,
            },
        );

        let should_open = match inner.state {
            CircuitState::Closed => inner.failure_count >= self.config.failure_threshold,
            CircuitState::HalfOpen => {
                if self.config.cumulative_half_open_reopen {
                    inner.failure_count >= self.config.failure_threshold
                } else {
                    // Classic semantics: any half-open failure reopens.
                    true
                }
            }
            CircuitState::Open => false,
        };

        if should_open {
            inner.state = CircuitState::Open;
            inner.success_count = 0;
            log::warn!(
                "Circuit '{}' opened after {} failures (last: {})",
                self.name,
                inner.failure_count,
                kind
            );
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::super::prediction::MockFailurePredictor;
    use super::*;

    fn test_config() -> CircuitConfig {
        CircuitConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_millis(100),
            success_threshold: 2,
            call_timeout: Duration::from_millis(250),
            max_concurrent_calls: 4,
            cumulative_half_open_reopen: false,
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = CircuitConfig {
            failure_threshold: 0,
            ..CircuitConfig::default()
        };
        assert!(CircuitBreaker::new("bad", config).is_err());
    }

    #[tokio::test]
    async fn test_successful_call_passes_through() {
        let breaker = CircuitBreaker::new("ok", test_config()).unwrap();
        let result = breaker.call(|| async { Ok::<_, ResilienceError>(42) }).await;
        assert_eq!(result.unwrap(), 42);

        let status = breaker.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.total_successes, 1);
        assert_eq!(status.concurrent_calls, 0);
    }

    #[tokio::test]
    async fn test_operation_error_passes_through_unchanged() {
        let breaker = CircuitBreaker::new("passthrough", test_config()).unwrap();
        let result = breaker
            .call(|| async { Err::<(), _>(ResilienceError::service("upstream 503")) })
            .await;

        match result {
            Err(ResilienceError::Service(msg)) => assert_eq!(msg, "upstream 503"),
            other => panic!("expected the operation's own error, got {:?}", other),
        }
        assert_eq!(breaker.status().total_failures, 1);
    }

    #[tokio::test]
    async fn test_long_multibyte_error_message_is_recorded_safely() {
        // Stored error text is truncated to a byte budget; a message made of
        // 3-byte code points forces the cut inside a character if the slice
        // is taken at the raw byte index.
        let breaker = CircuitBreaker::new("unicode", test_config()).unwrap();
        let message = "日".repeat(100);
        let result = breaker
            .call(|| async { Err::<(), _>(ResilienceError::service(message.clone())) })
            .await;

        match result {
            Err(ResilienceError::Service(msg)) => assert_eq!(msg, message),
            other => panic!("expected the operation's own error, got {:?}", other),
        }
        let status = breaker.status();
        assert_eq!(status.total_failures, 1);
        assert_eq!(status.concurrent_calls, 0);
    }

    #[tokio::test]
    async fn test_opens_after_failure_threshold() {
        let breaker = CircuitBreaker::new("trip", test_config()).unwrap();
        for _ in 0..3 {
            let _ = breaker
                .call(|| async { Err::<(), _>(ResilienceError::network("down")) })
                .await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_open_circuit_rejects_without_invoking_operation() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let breaker = CircuitBreaker::new("gate", test_config()).unwrap();
        breaker.force_state(CircuitState::Open);

        let invocations = AtomicUsize::new(0);
        let result = breaker
            .call(|| async {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ResilienceError>(())
            })
            .await;

        assert!(matches!(result, Err(ResilienceError::CircuitOpen { .. })));
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_bookkept_as_failure() {
        let breaker = CircuitBreaker::new("slow", test_config()).unwrap();
        let result = breaker
            .call(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ResilienceError>(())
            })
            .await;

        assert!(matches!(result, Err(ResilienceError::Timeout { .. })));
        let status = breaker.status();
        assert_eq!(status.total_failures, 1);
        assert_eq!(status.failure_count, 1);
        assert_eq!(status.concurrent_calls, 0);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens_immediately() {
        let breaker = CircuitBreaker::new("probe", test_config()).unwrap();
        breaker.force_state(CircuitState::HalfOpen);

        let _ = breaker
            .call(|| async { Err::<(), _>(ResilienceError::network("still down")) })
            .await;
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_cumulative_half_open_reopen_waits_for_threshold() {
        let config = CircuitConfig {
            cumulative_half_open_reopen: true,
            ..test_config()
        };
        let breaker = CircuitBreaker::new("legacy", config).unwrap();
        breaker.force_state(CircuitState::HalfOpen);

        // One half-open failure is below the threshold of 3.
        let _ = breaker
            .call(|| async { Err::<(), _>(ResilienceError::network("flaky")) })
            .await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let breaker = CircuitBreaker::new("recover", test_config()).unwrap();
        for _ in 0..2 {
            let _ = breaker
                .call(|| async { Err::<(), _>(ResilienceError::network("blip")) })
                .await;
        }
        assert_eq!(breaker.status().failure_count, 2);

        breaker
            .call(|| async { Ok::<_, ResilienceError>(()) })
            .await
            .unwrap();
        assert_eq!(breaker.status().failure_count, 0);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_reset_returns_to_pristine_state() {
        let breaker = CircuitBreaker::new("fresh", test_config()).unwrap();
        for _ in 0..3 {
            let _ = breaker
                .call(|| async { Err::<(), _>(ResilienceError::network("down")) })
                .await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        breaker.reset();
        let status = breaker.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.failure_count, 0);
        assert_eq!(status.recorded_calls, 0);
    }

    #[tokio::test]
    async fn test_status_reports_predictor_estimate() {
        let mut predictor = MockFailurePredictor::new();
        predictor
            .expect_failure_probability()
            .return_const(0.42f64);

        let breaker =
            CircuitBreaker::with_predictor("scored", test_config(), Box::new(predictor)).unwrap();
        assert!((breaker.status().failure_probability - 0.42).abs() < 1e-9);
    }
}
