//! Bounded retry with pluggable backoff.
//!
//! [`compute_delay`] turns a zero-based attempt index into a sleep duration
//! according to a [`Backoff`] strategy, and [`RetryStrategy::execute`] drives an
//! async operation until it succeeds or the policy's attempt budget runs out.
//!
//! Only the wrapped operation is retried. Nothing here retries on its own
//! initiative, and the sleep after the final attempt is skipped.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Jitter band as a fraction of the computed delay.
const JITTER_FRACTION: f64 = 0.25;

/// Backoff parameters shared by every strategy.
///
/// Invariants: `base_delay <= max_delay`, `max_attempts >= 1`,
/// `multiplier >= 1.0`. Checked by [`validate`](Self::validate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
	/// Delay before the first retry.
	#[serde(rename = "baseDelayMs", with = "crate::duration_ms")]
	pub base_delay: Duration,
	/// Upper bound for exponential delays.
	#[serde(rename = "maxDelayMs", with = "crate::duration_ms")]
	pub max_delay: Duration,
	/// Growth factor per attempt for exponential backoff.
	pub multiplier: f64,
	/// Perturb exponential delays by up to ±25%.
	pub jitter: bool,
	/// Total attempts including the first one.
	pub max_attempts: u32,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			base_delay: Duration::from_millis(100),
			max_delay: Duration::from_millis(5000),
			multiplier: 1.5,
			jitter: true,
			max_attempts: 10,
		}
	}
}

impl RetryPolicy {
	/// Creates a validated policy.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidPolicy`] if an invariant does not hold.
	pub fn new(base_delay: Duration, max_delay: Duration, multiplier: f64, jitter: bool, max_attempts: u32) -> Result<Self> {
		let policy = Self {
			base_delay,
			max_delay,
			multiplier,
			jitter,
			max_attempts,
		};
		policy.validate()?;
		Ok(policy)
	}

	/// Constant delay between a fixed number of attempts.
	pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
		Self {
			base_delay: delay,
			max_delay: delay,
			multiplier: 1.0,
			jitter: false,
			max_attempts: max_attempts.max(1),
		}
	}

	/// Returns a copy with jitter disabled.
	pub fn without_jitter(self) -> Self {
		Self { jitter: false, ..self }
	}

	/// Checks the policy invariants.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidPolicy`] naming the first violated invariant.
	pub fn validate(&self) -> Result<()> {
		if self.max_attempts == 0 {
			return Err(Error::InvalidPolicy("maxAttempts must be at least 1".to_string()));
		}
		if self.base_delay > self.max_delay {
			return Err(Error::InvalidPolicy(format!(
				"baseDelay ({}ms) exceeds maxDelay ({}ms)",
				self.base_delay.as_millis(),
				self.max_delay.as_millis()
			)));
		}
		if !self.multiplier.is_finite() || self.multiplier < 1.0 {
			return Err(Error::InvalidPolicy(format!("multiplier must be a finite value >= 1.0, got {}", self.multiplier)));
		}
		Ok(())
	}
}

/// Caller-supplied delay function for [`Backoff::Custom`].
pub type DelayFn = dyn Fn(u32, &RetryPolicy) -> Duration + Send + Sync;

/// How the delay grows between attempts.
#[derive(Clone, Default)]
pub enum Backoff {
	/// `min(max_delay, base_delay * multiplier^attempt)`, optionally jittered.
	#[default]
	Exponential,
	/// `attempt * increment`.
	Linear { increment: Duration },
	/// Delay computed directly by the caller.
	Custom(Arc<DelayFn>),
}

impl Backoff {
	pub fn custom<F>(f: F) -> Self
	where
		F: Fn(u32, &RetryPolicy) -> Duration + Send + Sync + 'static,
	{
		Self::Custom(Arc::new(f))
	}
}

impl fmt::Debug for Backoff {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Exponential => f.write_str("Exponential"),
			Self::Linear { increment } => f.debug_struct("Linear").field("increment", increment).finish(),
			Self::Custom(_) => f.write_str("Custom(..)"),
		}
	}
}

/// Computes the delay to sleep after the zero-based `attempt` failed.
pub fn compute_delay(attempt: u32, policy: &RetryPolicy, backoff: &Backoff) -> Duration {
	match backoff {
		Backoff::Exponential => exponential_delay(attempt, policy),
		Backoff::Linear { increment } => increment.saturating_mul(attempt),
		Backoff::Custom(delay_fn) => delay_fn(attempt, policy),
	}
}

fn exponential_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
	let base_ms = policy.base_delay.as_millis() as f64;
	let max_ms = policy.max_delay.as_millis() as f64;

	// powi overflows to infinity for large exponents, which the cap absorbs
	let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
	let mut delay_ms = (base_ms * policy.multiplier.powi(exp)).min(max_ms);

	if policy.jitter && delay_ms > 0.0 {
		let range = delay_ms * JITTER_FRACTION;
		delay_ms += rand::rng().random_range(-range..=range);
	}

	Duration::from_millis(delay_ms.max(0.0).floor() as u64)
}

/// One failed attempt, handed to the `on_retry` observer before sleeping.
#[derive(Debug)]
pub struct Attempt<'a, E> {
	/// Zero-based index of the attempt that failed.
	pub index: u32,
	/// Delay about to be slept before the next attempt.
	pub delay: Duration,
	/// Error the attempt failed with.
	pub error: &'a E,
}

/// A retried operation exhausted its attempt budget.
#[derive(Debug, Error)]
#[error("operation failed after {attempts} attempts: {last}")]
pub struct AggregateFailure<E> {
	/// Number of attempts made (equals the policy's `max_attempts`).
	pub attempts: u32,
	/// Error returned by the final attempt.
	#[source]
	pub last: E,
}

impl<E> AggregateFailure<E> {
	/// Drops the attempt count, keeping the final error.
	pub fn into_last(self) -> E {
		self.last
	}
}

/// A [`RetryPolicy`] paired with the [`Backoff`] that spaces its attempts.
#[derive(Debug, Clone, Default)]
pub struct RetryStrategy {
	policy: RetryPolicy,
	backoff: Backoff,
}

impl RetryStrategy {
	/// Exponential backoff under `policy`.
	pub fn new(policy: RetryPolicy) -> Self {
		Self {
			policy,
			backoff: Backoff::Exponential,
		}
	}

	pub fn linear(policy: RetryPolicy, increment: Duration) -> Self {
		Self::new(policy).with_backoff(Backoff::Linear { increment })
	}

	pub fn custom<F>(policy: RetryPolicy, delay_fn: F) -> Self
	where
		F: Fn(u32, &RetryPolicy) -> Duration + Send + Sync + 'static,
	{
		Self::new(policy).with_backoff(Backoff::custom(delay_fn))
	}

	pub fn with_backoff(mut self, backoff: Backoff) -> Self {
		self.backoff = backoff;
		self
	}

	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	pub fn backoff(&self) -> &Backoff {
		&self.backoff
	}

	/// Delay slept after the zero-based `attempt` failed.
	pub fn delay_for(&self, attempt: u32) -> Duration {
		compute_delay(attempt, &self.policy, &self.backoff)
	}

	/// Runs `operation` until it succeeds or `max_attempts` attempts failed.
	///
	/// # Errors
	///
	/// Returns [`AggregateFailure`] carrying the attempt count and the last
	/// error once the budget is exhausted.
	pub async fn execute<T, E, F, Fut>(&self, operation: F) -> std::result::Result<T, AggregateFailure<E>>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = std::result::Result<T, E>>,
		E: fmt::Display,
	{
		self.execute_with(operation, |_| {}).await
	}

	/// Like [`execute`](Self::execute), calling `on_retry` after each failed
	/// attempt that will be retried, before the backoff sleep.
	///
	/// `on_retry` is never called for the final failed attempt nor after a
	/// success.
	pub async fn execute_with<T, E, F, Fut, R>(&self, mut operation: F, mut on_retry: R) -> std::result::Result<T, AggregateFailure<E>>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = std::result::Result<T, E>>,
		E: fmt::Display,
		R: FnMut(&Attempt<'_, E>),
	{
		let max_attempts = self.policy.max_attempts.max(1);
		let mut index = 0u32;

		loop {
			match operation().await {
				Ok(value) => {
					if index > 0 {
						debug!(target = "testkit", attempts = index + 1, "operation succeeded after retrying");
					}
					return Ok(value);
				}
				Err(error) => {
					let attempts = index + 1;
					if attempts >= max_attempts {
						warn!(target = "testkit", attempts, error = %error, "retry budget exhausted");
						return Err(AggregateFailure { attempts, last: error });
					}

					let delay = self.delay_for(index);
					debug!(
						target = "testkit",
						attempt = index,
						delay_ms = delay.as_millis() as u64,
						error = %error,
						"operation failed, retrying"
					);
					on_retry(&Attempt {
						index,
						delay,
						error: &error,
					});

					tokio::time::sleep(delay).await;
					index += 1;
				}
			}
		}
	}
}

/// Free-function form of [`RetryStrategy::execute_with`]. Pass `|_| {}` when
/// no retry callback is wanted.
pub async fn execute_with_retry<T, E, F, Fut, R>(
	operation: F,
	strategy: &RetryStrategy,
	on_retry: R,
) -> std::result::Result<T, AggregateFailure<E>>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = std::result::Result<T, E>>,
	E: fmt::Display,
	R: FnMut(&Attempt<'_, E>),
{
	strategy.execute_with(operation, on_retry).await
}
