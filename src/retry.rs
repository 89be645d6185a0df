// Copyright (c) 2025 Daniel Michaels
// SPDX-License-Identifier: MIT

//! Optimistic-concurrency retry for Kubernetes read-modify-write cycles.
//!
//! Updates read the current object, apply the desired mutation and submit it
//! with the `resourceVersion` that was read. When another writer got there
//! first, the API server answers `409 Conflict` and the whole cycle is retried
//! against a fresh read. Every other error fails immediately and is returned
//! unchanged.
//!
//! The retry budget is fixed: [`CONFLICT_RETRY_ATTEMPTS`] attempts at a
//! constant interval with jitter. Exhausting it surfaces the last conflict.
//!
//! Every call takes a [`CancellationToken`]. When it fires, the in-flight call
//! (or backoff sleep) is dropped and [`ProvisionError::Cancelled`] is returned
//! without further retries.

use crate::constants::{
    CONFLICT_RETRY_ATTEMPTS, CONFLICT_RETRY_FACTOR, CONFLICT_RETRY_INTERVAL_MILLIS,
    CONFLICT_RETRY_JITTER,
};
use crate::errors::{is_conflict, ProvisionError};
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Bounded backoff between conflict retries.
///
/// Unlike a time-bounded backoff, this one is bounded by attempt count: it hands
/// out `max_attempts - 1` intervals and then reports exhaustion.
#[derive(Debug)]
pub struct ConflictBackoff {
    /// Current interval duration
    pub current_interval: Duration,
    /// Total attempts allowed, including the first
    pub max_attempts: u32,
    /// Backoff multiplier (1.0 keeps the interval constant)
    pub multiplier: f64,
    /// Randomization factor (e.g., 0.1 for ±10%)
    pub randomization_factor: f64,
    retries: u32,
}

impl ConflictBackoff {
    fn new(
        initial_interval: Duration,
        max_attempts: u32,
        multiplier: f64,
        randomization_factor: f64,
    ) -> Self {
        Self {
            current_interval: initial_interval,
            max_attempts,
            multiplier,
            randomization_factor,
            retries: 0,
        }
    }

    /// Get the next backoff interval, or None once the attempt budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.retries + 1 >= self.max_attempts {
            return None;
        }
        self.retries += 1;

        let interval = self.current_interval;
        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next);

        Some(self.apply_jitter(interval))
    }

    fn apply_jitter(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 {
            return interval;
        }

        let secs = interval.as_secs_f64();
        let delta = secs * self.randomization_factor;

        let mut rng = rand::thread_rng();
        let jittered = rng.gen_range((secs - delta)..=(secs + delta));

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Default conflict retry budget.
///
/// # Configuration
///
/// - **Attempts**: 5 in total
/// - **Interval**: 10ms
/// - **Multiplier**: 1.0 (constant interval)
/// - **Randomization**: ±10%
#[must_use]
pub fn conflict_backoff() -> ConflictBackoff {
    ConflictBackoff::new(
        Duration::from_millis(CONFLICT_RETRY_INTERVAL_MILLIS),
        CONFLICT_RETRY_ATTEMPTS,
        CONFLICT_RETRY_FACTOR,
        CONFLICT_RETRY_JITTER,
    )
}

/// Run a single API call, aborting it when `cancel` fires.
///
/// # Errors
///
/// Returns [`ProvisionError::Cancelled`] if the token fires first, otherwise the
/// call's own error.
pub async fn cancellable<T, Fut>(
    cancel: &CancellationToken,
    operation_name: &str,
    operation: Fut,
) -> Result<T, ProvisionError>
where
    Fut: Future<Output = Result<T, kube::Error>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!(operation = operation_name, "Kubernetes API call cancelled");
            Err(ProvisionError::Cancelled { operation: operation_name.to_string() })
        }
        result = operation => result.map_err(ProvisionError::from),
    }
}

/// Retry a read-modify-write cycle on optimistic-lock conflicts.
///
/// `operation` must perform the complete cycle (fetch, mutate, submit) so each
/// retry works against the latest stored version.
///
/// # Arguments
///
/// * `operation` - Async function performing one full fetch-mutate-submit cycle
/// * `operation_name` - Human-readable name for logging (e.g., "update Certificate app")
/// * `cancel` - Aborts the in-flight attempt and stops retrying
///
/// # Errors
///
/// Returns an error if:
/// - A non-conflict error occurs (returned as-is, not retried)
/// - The attempt budget is exhausted (the last conflict is returned)
/// - `cancel` fires
///
/// # Example
///
/// ```no_run
/// use kube::{Api, Client, api::PostParams};
/// use tawny::crd::Certificate;
/// use tawny::retry::retry_on_conflict;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = Client::try_default().await?;
/// let api: Api<Certificate> = Api::namespaced(client, "tenant");
/// let cancel = CancellationToken::new();
///
/// let cert = retry_on_conflict(
///     || async {
///         let mut cert = api.get("app").await?;
///         cert.spec.dns_names.push("www.example.com".to_string());
///         api.replace("app", &PostParams::default(), &cert).await
///     },
///     "add SAN to Certificate app",
///     &cancel,
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_on_conflict<T, F, Fut>(
    mut operation: F,
    operation_name: &str,
    cancel: &CancellationToken,
) -> Result<T, ProvisionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = conflict_backoff();
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let err = match cancellable(cancel, operation_name, operation()).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt = attempt,
                        elapsed = ?start_time.elapsed(),
                        "Kubernetes update succeeded after conflict retries"
                    );
                } else {
                    debug!(operation = operation_name, "Kubernetes update succeeded");
                }
                return Ok(value);
            }
            Err(ProvisionError::Kube(e)) => e,
            Err(other) => return Err(other),
        };

        if !is_conflict(&err) {
            debug!(
                operation = operation_name,
                error = %err,
                "Non-conflict Kubernetes API error, failing immediately"
            );
            return Err(err.into());
        }

        let Some(duration) = backoff.next_backoff() else {
            error!(
                operation = operation_name,
                attempt = attempt,
                elapsed = ?start_time.elapsed(),
                error = %err,
                "Conflict retries exhausted, giving up"
            );
            return Err(err.into());
        };

        warn!(
            operation = operation_name,
            attempt = attempt,
            retry_after = ?duration,
            error = %err,
            "Optimistic-lock conflict, retrying with a fresh read"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(ProvisionError::Cancelled { operation: operation_name.to_string() });
            }
            () = tokio::time::sleep(duration) => {}
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
