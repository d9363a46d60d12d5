//! Circuit breaker resilience subsystem
//!
//! This module provides the resilience primitives of the SDK:
//! - A per-dependency circuit breaker with predictive failure scoring
//! - A manager that aggregates many breakers into a global health signal
//! - An auditor that evaluates whether breaker configurations behave as
//!   intended

mod auditor;
mod circuit_breaker;
mod history;
mod manager;
mod prediction;

pub use auditor::{AuditReport, CircuitAuditor, CircuitFinding};
pub use circuit_breaker::{CircuitBreaker, CircuitStatus};
pub use history::{CallRecord, FailureHistory, FailurePattern};
pub use manager::{CircuitBreakerManager, GlobalStatus};
pub use prediction::{FailurePredictor, HeuristicPredictor};

use serde::{Deserialize, Serialize};

/// State of a circuit breaker
///
/// A circuit is in exactly one state at any instant; transitions happen only
/// under the circuit's own lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Circuit is closed, allowing calls
    Closed,

    /// Circuit is open, rejecting calls until the recovery timeout elapses
    Open,

    /// Circuit is half-open, probing recovery with a limited success streak
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}
