//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: testing if backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= threshold
//! Open → Half-Open: first call after the cooldown deadline
//! Half-Open → Closed: 3 consecutive successful calls
//! Half-Open → Open: any single failure (partial progress discarded)
//! ```
//!
//! # Design Decisions
//! - Per-service circuit breaker (not global)
//! - Fail fast in Open state: the wrapped operation is never invoked
//! - Plain consecutive counters; no decay, weighting, or sliding window
//! - Open state always carries a next-attempt deadline

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

/// Consecutive successes required in Half-Open before closing the circuit.
const RECOVERY_QUOTA: u32 = 3;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Tuning knobs for a single breaker.
#[derive(Debug, Clone, Copy)]
pub struct BreakerOptions {
    /// Consecutive failures before the circuit opens.
    pub threshold: u32,
    /// How long an open circuit rejects before admitting a trial call.
    pub cooldown: Duration,
}

impl Default for BreakerOptions {
    fn default() -> Self {
        Self {
            threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit is open; the operation was not invoked.
    #[error("circuit breaker open")]
    Open,

    /// The operation ran and failed; the failure has been recorded.
    #[error("{0}")]
    Inner(E),
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
    next_attempt_time: Option<Instant>,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
            next_attempt_time: None,
        }
    }
}

/// Per-service failure-isolation state machine.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    options: BreakerOptions,
    inner: Mutex<BreakerInner>,
}

/// Observability snapshot of a breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStats {
    pub name: String,
    pub state: BreakerState,
    pub failure_count: u32,
    pub success_count: u32,
    pub threshold: u32,
    pub cooldown_ms: u64,
    /// True when the state is Closed.
    pub healthy: bool,
}

impl CircuitBreaker {
    /// Create a breaker in the Closed state.
    pub fn new(name: impl Into<String>, options: BreakerOptions) -> Self {
        Self {
            name: name.into(),
            options,
            inner: Mutex::new(BreakerInner::new()),
        }
    }

    /// Run `operation` under the breaker.
    ///
    /// In Open state before the cooldown deadline this rejects with
    /// [`BreakerError::Open`] without invoking the operation. Once the
    /// deadline has passed the breaker moves to Half-Open and the call
    /// proceeds as a trial. The outcome of every invoked operation is
    /// recorded as exactly one success or one failure.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.try_acquire() {
            return Err(BreakerError::Open);
        }

        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(e) => {
                self.on_failure();
                Err(BreakerError::Inner(e))
            }
        }
    }

    /// Admission check; transitions Open → Half-Open when the deadline passed.
    /// Returns false when the call must be rejected fast.
    fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == BreakerState::Open {
            let deadline = inner
                .next_attempt_time
                .expect("open breaker always has a next attempt deadline");
            if Instant::now() < deadline {
                return false;
            }
            inner.state = BreakerState::HalfOpen;
            inner.success_count = 0;
            tracing::info!(service = %self.name, "Circuit breaker half-open, admitting trial call");
        }
        true
    }

    fn on_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= RECOVERY_QUOTA {
                    *inner = BreakerInner::new();
                    tracing::info!(service = %self.name, "Circuit breaker closed after recovery");
                }
            }
            // Consecutive-failure counting: any success clears the streak.
            _ => inner.failure_count = 0,
        }
    }

    fn on_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        inner.last_failure_time = Some(now);
        match inner.state {
            BreakerState::HalfOpen => {
                // A single trial failure discards all recovery progress.
                inner.state = BreakerState::Open;
                inner.success_count = 0;
                inner.failure_count += 1;
                inner.next_attempt_time = Some(now + self.options.cooldown);
                tracing::warn!(service = %self.name, "Circuit breaker re-opened after failed trial");
            }
            _ => {
                inner.failure_count += 1;
                if inner.state == BreakerState::Closed
                    && inner.failure_count >= self.options.threshold
                {
                    inner.state = BreakerState::Open;
                    inner.next_attempt_time = Some(now + self.options.cooldown);
                    tracing::warn!(
                        service = %self.name,
                        failures = inner.failure_count,
                        cooldown_ms = self.options.cooldown.as_millis() as u64,
                        "Circuit breaker opened"
                    );
                }
            }
        }
    }

    /// Unconditionally return to Closed with zeroed counters and cleared
    /// timestamps, regardless of current state.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = BreakerInner::new();
        tracing::info!(service = %self.name, "Circuit breaker reset");
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().unwrap().state
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().unwrap().failure_count
    }

    pub fn success_count(&self) -> u32 {
        self.inner.lock().unwrap().success_count
    }

    pub fn is_open(&self) -> bool {
        self.state() == BreakerState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.state() == BreakerState::Closed
    }

    pub fn is_half_open(&self) -> bool {
        self.state() == BreakerState::HalfOpen
    }

    /// Structured snapshot for the health and metrics endpoints.
    pub fn stats(&self) -> BreakerStats {
        let inner = self.inner.lock().unwrap();
        BreakerStats {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            threshold: self.options.threshold,
            cooldown_ms: self.options.cooldown.as_millis() as u64,
            healthy: inner.state == BreakerState::Closed,
        }
    }
}
