//! Named registry of circuit breakers with a global health signal
//!
//! A manager is constructed explicitly and passed to the collaborators that
//! need it; there is deliberately no process-wide singleton, so tests can
//! instantiate independent managers in isolation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::config::CircuitConfig;
use crate::error::{ResilienceError, Result};

use super::circuit_breaker::{CircuitBreaker, CircuitStatus};
use super::CircuitState;

/// Default fraction of open circuits at which the global signal turns
/// unhealthy
pub(crate) const DEFAULT_GLOBAL_FAILURE_THRESHOLD: f64 = 0.8;

/// Aggregate status across every registered circuit
#[derive(Debug, Clone, Serialize)]
pub struct GlobalStatus {
    /// Per-circuit status snapshots
    pub circuits: Vec<CircuitStatus>,

    /// Number of closed circuits
    pub closed: usize,

    /// Number of open circuits
    pub open: usize,

    /// Number of half-open circuits
    pub half_open: usize,

    /// Total registered circuits
    pub total: usize,
}

/// Owner of a named set of circuit breakers
pub struct CircuitBreakerManager {
    circuits: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
    global_failure_threshold: f64,
}

impl Default for CircuitBreakerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerManager {
    /// Create a manager with the default global failure threshold (0.8)
    pub fn new() -> Self {
        Self::with_global_threshold(DEFAULT_GLOBAL_FAILURE_THRESHOLD)
    }

    /// Create a manager with a custom global failure threshold
    ///
    /// The threshold is the fraction of open circuits (0.0–1.0] at which
    /// `check_global_health` reports unhealthy.
    pub fn with_global_threshold(global_failure_threshold: f64) -> Self {
        Self {
            circuits: RwLock::new(HashMap::new()),
            global_failure_threshold: global_failure_threshold.clamp(0.0, 1.0),
        }
    }

    /// Create and register a new circuit
    ///
    /// The configuration is validated here. Name collisions are a caller
    /// error and rejected explicitly; an existing circuit is never silently
    /// overwritten.
    pub fn create_circuit(
        &self,
        name: impl Into<String>,
        config: CircuitConfig,
    ) -> Result<Arc<CircuitBreaker>> {
        let name = name.into();
        let mut circuits = self.circuits.write().unwrap();

        if circuits.contains_key(&name) {
            return Err(ResilienceError::configuration(format!(
                "Circuit '{}' is already registered",
                name
            )));
        }

        let breaker = Arc::new(CircuitBreaker::new(name.clone(), config)?);
        circuits.insert(name.clone(), Arc::clone(&breaker));
        log::info!("Registered circuit '{}'", name);
        Ok(breaker)
    }

    /// Look up a circuit by name
    pub fn get_circuit(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.circuits.read().unwrap().get(name).cloned()
    }

    /// Remove a circuit from the registry, returning it if present
    ///
    /// In-flight calls on the removed circuit complete against the detached
    /// handle.
    pub fn remove_circuit(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        let removed = self.circuits.write().unwrap().remove(name);
        if removed.is_some() {
            log::info!("Removed circuit '{}'", name);
        }
        removed
    }

    /// Names of all registered circuits
    pub fn circuit_names(&self) -> Vec<String> {
        self.circuits.read().unwrap().keys().cloned().collect()
    }

    /// All registered circuits
    pub fn circuits(&self) -> Vec<Arc<CircuitBreaker>> {
        self.circuits.read().unwrap().values().cloned().collect()
    }

    /// Execute a guarded operation through a named circuit
    ///
    /// Referencing an unregistered name is a configuration error; the
    /// operation is never invoked in that case.
    pub async fn call_with_circuit<F, Fut, T>(&self, name: &str, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // Clone the handle out of the read lock; the lock is never held
        // across the await.
        let breaker = self.get_circuit(name).ok_or_else(|| {
            ResilienceError::configuration(format!("No circuit registered under '{}'", name))
        })?;
        breaker.call(operation).await
    }

    /// Snapshot every circuit plus aggregate per-state counts
    pub fn global_status(&self) -> GlobalStatus {
        let statuses: Vec<CircuitStatus> = self
            .circuits()
            .iter()
            .map(|breaker| breaker.status())
            .collect();

        let mut closed = 0;
        let mut open = 0;
        let mut half_open = 0;
        for status in &statuses {
            match status.state {
                CircuitState::Closed => closed += 1,
                CircuitState::Open => open += 1,
                CircuitState::HalfOpen => half_open += 1,
            }
        }

        GlobalStatus {
            total: statuses.len(),
            circuits: statuses,
            closed,
            open,
            half_open,
        }
    }

    /// Global health signal
    ///
    /// Healthy unless the fraction of open circuits reaches the global
    /// failure threshold. With zero circuits registered the system is
    /// healthy by definition.
    pub fn check_global_health(&self) -> bool {
        let status = self.global_status();
        if status.total == 0 {
            return true;
        }

        let open_ratio = status.open as f64 / status.total as f64;
        let healthy = open_ratio < self.global_failure_threshold;
        if !healthy {
            log::warn!(
                "Global health degraded: {}/{} circuits open",
                status.open,
                status.total
            );
        }
        healthy
    }
}

impl std::fmt::Debug for CircuitBreakerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerManager")
            .field("circuits", &self.circuit_names())
            .field("global_failure_threshold", &self.global_failure_threshold)
            .finish()
    }
}
