//! Advisory audit of circuit breaker configurations
//!
//! The auditor reads a manager's circuits and scores how well each breaker's
//! configuration matches its observed behavior. It is strictly read-only and
//! never mutates breaker state or configuration; its output is a static
//! report, not a control signal.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::manager::CircuitBreakerManager;
use super::CircuitState;

/// Failure thresholds above this are flagged as slow to protect
const MAX_REASONABLE_FAILURE_THRESHOLD: u32 = 10;

/// Recovery timeouts above this are flagged as slow to recover
const MAX_REASONABLE_RECOVERY_TIMEOUT: Duration = Duration::from_secs(300);

/// Call timeouts below this are flagged as prone to false positives
const MIN_REASONABLE_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Verdict for one circuit
#[derive(Debug, Clone, Serialize)]
pub struct CircuitFinding {
    /// Circuit name
    pub circuit: String,

    /// Whether the circuit's configuration is behaving as intended
    pub effective: bool,

    /// Specific issues found when the circuit is not effective
    pub issues: Vec<String>,
}

/// Result of one audit pass
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    /// Percentage of circuits classified as effective (0–100)
    pub effectiveness_score: f64,

    /// Per-circuit verdicts
    pub findings: Vec<CircuitFinding>,

    /// General recommendations, independent of individual findings
    pub recommendations: Vec<String>,
}

/// Periodic, read-only analyzer of a manager's circuits
pub struct CircuitAuditor {
    manager: Arc<CircuitBreakerManager>,
}

impl CircuitAuditor {
    /// Create an auditor over the given manager
    pub fn new(manager: Arc<CircuitBreakerManager>) -> Self {
        Self { manager }
    }

    /// Evaluate every registered circuit's configuration effectiveness
    ///
    /// A circuit is effective when it is Open with a failure count that
    /// reached its configured threshold (it tripped for a reason), or Closed
    /// with zero lifetime failures (nothing to trip on). Anything else is
    /// flagged against fixed heuristics; these are not adaptive.
    pub fn audit_effectiveness(&self) -> AuditReport {
        let circuits = self.manager.circuits();
        let mut findings = Vec::with_capacity(circuits.len());
        let mut effective_count = 0usize;

        for breaker in &circuits {
            let status = breaker.status();
            let config = breaker.config();

            let effective = match status.state {
                CircuitState::Open => status.failure_count >= config.failure_threshold,
                CircuitState::Closed => status.total_failures == 0,
                CircuitState::HalfOpen => false,
            };

            let mut issues = Vec::new();
            if !effective {
                if config.failure_threshold > MAX_REASONABLE_FAILURE_THRESHOLD {
                    issues.push(format!(
                        "failure_threshold {} is high; the circuit may trip too slowly",
                        config.failure_threshold
                    ));
                }
                if config.recovery_timeout > MAX_REASONABLE_RECOVERY_TIMEOUT {
                    issues.push(format!(
                        "recovery_timeout {}s is long; recovery probes will be rare",
                        config.recovery_timeout.as_secs()
                    ));
                }
                if config.call_timeout < MIN_REASONABLE_CALL_TIMEOUT {
                    issues.push(format!(
                        "call_timeout {}ms is short; slow-but-healthy calls may count as failures",
                        config.call_timeout.as_millis()
                    ));
                }
                if issues.is_empty() {
                    issues.push(format!(
                        "state {} with failure_count {} does not match threshold {}",
                        status.state, status.failure_count, config.failure_threshold
                    ));
                }
            } else {
                effective_count += 1;
            }

            findings.push(CircuitFinding {
                circuit: status.name,
                effective,
                issues,
            });
        }

        let effectiveness_score = if circuits.is_empty() {
            100.0
        } else {
            effective_count as f64 / circuits.len() as f64 * 100.0
        };

        AuditReport {
            effectiveness_score,
            findings,
            recommendations: Self::general_recommendations(),
        }
    }

    fn general_recommendations() -> Vec<String> {
        vec![
            "Consider adaptive failure thresholds driven by rolling error rates".to_string(),
            "Layer cascading circuit breakers for chained dependencies".to_string(),
            "Export breaker state transitions to the telemetry pipeline".to_string(),
        ]
    }
}

impl std::fmt::Debug for CircuitAuditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitAuditor")
            .field("manager", &self.manager)
            .finish()
    }
}
