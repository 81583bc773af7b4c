//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: a single probe is testing whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//! Open → Half-Open: first call after the cooldown (that call is the probe)
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails (regardless of threshold)
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, injected as `Arc<CircuitBreaker>`; no globals
//! - The lock guards bookkeeping only; the guarded call runs outside it
//! - Single probe in Half-Open; everyone else is rejected without calling out

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a guarded call that did not succeed.
#[derive(Debug)]
pub enum BreakerError<E> {
    /// Rejected: breaker is open and still cooling down.
    Open { breaker: String },
    /// Rejected: another caller is running the recovery probe.
    ProbeInFlight { breaker: String },
    /// The guarded call ran and failed.
    Inner(E),
}

impl<E> BreakerError<E> {
    /// True when the guarded call was never invoked.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, BreakerError::Inner(_))
    }
}

impl<E: fmt::Display> fmt::Display for BreakerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerError::Open { breaker } => write!(f, "circuit breaker '{}' is open", breaker),
            BreakerError::ProbeInFlight { breaker } => write!(
                f,
                "circuit breaker '{}' is half-open, probe in progress",
                breaker
            ),
            BreakerError::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for BreakerError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BreakerError::Inner(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Per-dependency circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, threshold: u32, cooldown: Duration) -> Self {
        Self {
            name: name.into(),
            threshold,
            cooldown,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                failure_count: 0,
                last_failure: None,
            }),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &BreakerConfig) -> Self {
        Self::new(name, config.failure_threshold, config.cooldown())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Run `action` through the breaker.
    ///
    /// `action` is only constructed and awaited when the breaker admits the call.
    pub async fn call<F, Fut, T, E>(&self, action: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let is_probe = self.admit::<E>()?;
        let mut guard = ProbeGuard {
            breaker: self,
            armed: is_probe,
        };

        let result = action().await;
        guard.armed = false;

        match result {
            Ok(value) => {
                self.on_success(is_probe);
                Ok(value)
            }
            Err(e) => {
                self.on_failure(is_probe);
                Err(BreakerError::Inner(e))
            }
        }
    }

    /// Decide whether a call may proceed. `Ok(true)` marks the recovery probe.
    fn admit<E>(&self) -> Result<bool, BreakerError<E>> {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => Ok(false),
            BreakerState::Open => {
                let cooled = inner
                    .last_failure
                    .map(|at| at.elapsed() > self.cooldown)
                    .unwrap_or(true);
                if cooled {
                    inner.state = BreakerState::HalfOpen;
                    metrics::record_breaker_transition(&self.name, BreakerState::HalfOpen.as_str());
                    tracing::info!(breaker = %self.name, "Circuit breaker half-open, probing");
                    Ok(true)
                } else {
                    Err(BreakerError::Open {
                        breaker: self.name.clone(),
                    })
                }
            }
            BreakerState::HalfOpen => Err(BreakerError::ProbeInFlight {
                breaker: self.name.clone(),
            }),
        }
    }

    fn on_success(&self, is_probe: bool) {
        let mut inner = self.lock();
        if is_probe {
            inner.failure_count = 0;
            inner.state = BreakerState::Closed;
            metrics::record_breaker_transition(&self.name, BreakerState::Closed.as_str());
            tracing::info!(breaker = %self.name, "Circuit breaker recovered");
        } else if inner.state == BreakerState::Closed {
            inner.failure_count = 0;
        }
        // A call admitted while closed that finishes after the breaker opened
        // does not get to close it; only the probe can.
    }

    fn on_failure(&self, is_probe: bool) {
        let mut inner = self.lock();
        if is_probe {
            inner.failure_count += 1;
            self.trip(&mut inner);
            return;
        }

        if inner.state != BreakerState::Closed {
            tracing::debug!(breaker = %self.name, state = %inner.state, "Ignoring late failure");
            return;
        }

        inner.failure_count += 1;
        inner.last_failure = Some(Instant::now());
        if inner.failure_count >= self.threshold {
            self.trip(&mut inner);
        }
    }

    /// Move to Open and restart the cooldown.
    fn trip(&self, inner: &mut Inner) {
        inner.state = BreakerState::Open;
        inner.last_failure = Some(Instant::now());
        metrics::record_breaker_transition(&self.name, BreakerState::Open.as_str());
        tracing::warn!(
            breaker = %self.name,
            failures = inner.failure_count,
            "Circuit breaker opened"
        );
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // No write leaves Inner half-updated, so poisoning is ignored.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Reopens the breaker if a probe is dropped before it reports an outcome.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(breaker = %self.breaker.name, "Probe abandoned");
            let mut inner = self.breaker.lock();
            self.breaker.trip(&mut inner);
        }
    }
}
