// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Retry logic with exponential backoff for transient failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Configuration for retrying transient HTTP failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
	/// Maximum number of attempts, including the first.
	pub max_attempts: u32,
	/// Base delay before the first retry.
	pub base_delay: Duration,
	/// Upper bound on the backoff delay.
	pub max_delay: Duration,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(250),
			max_delay: Duration::from_secs(10),
		}
	}
}

/// Errors that can classify themselves as transient.
pub trait RetryableError {
	/// True when a retry could plausibly succeed.
	fn is_retryable(&self) -> bool;
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}
		self
			.status()
			.map(|s| matches!(s.as_u16(), 429 | 408 | 500 | 502 | 503 | 504))
			.unwrap_or(false)
	}
}

/// Runs `op` until it succeeds, the error is not retryable, or attempts are
/// exhausted. The delay doubles per attempt with jitter, capped at
/// `max_delay`.
pub async fn retry<T, E, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Display,
{
	let mut attempt: u32 = 0;
	loop {
		attempt += 1;
		match op().await {
			Ok(value) => return Ok(value),
			Err(e) if attempt < config.max_attempts && e.is_retryable() => {
				let delay = backoff_delay(config, attempt);
				warn!(
					error = %e,
					attempt,
					delay_ms = delay.as_millis() as u64,
					"retrying transient failure"
				);
				tokio::time::sleep(delay).await;
			}
			Err(e) => return Err(e),
		}
	}
}

/// Delay before the retry following `attempt`, with half jitter so that
/// concurrent clients do not retry in lock step.
fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
	let factor = 2u64.saturating_pow(attempt.saturating_sub(1).min(16));
	let base_ms = config.base_delay.as_millis() as u64;
	let max_ms = config.max_delay.as_millis() as u64;
	let exp = base_ms.saturating_mul(factor).min(max_ms).max(1);
	Duration::from_millis(fastrand::u64((exp / 2)..=exp))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	#[derive(Debug)]
	struct TestError {
		retryable: bool,
	}

	impl std::fmt::Display for TestError {
		fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
			write!(f, "test error (retryable: {})", self.retryable)
		}
	}

	impl RetryableError for TestError {
		fn is_retryable(&self) -> bool {
			self.retryable
		}
	}

	fn fast_config() -> RetryConfig {
		RetryConfig {
			max_attempts: 3,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(4),
		}
	}

	#[tokio::test]
	async fn succeeds_without_retry() {
		let calls = AtomicU32::new(0);
		let result: Result<u32, TestError> = retry(&fast_config(), || async {
			calls.fetch_add(1, Ordering::SeqCst);
			Ok(7)
		})
		.await;

		assert_eq!(result.unwrap(), 7);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn retries_transient_failures_until_success() {
		let calls = AtomicU32::new(0);
		let result: Result<u32, TestError> = retry(&fast_config(), || async {
			let n = calls.fetch_add(1, Ordering::SeqCst);
			if n < 2 {
				Err(TestError { retryable: true })
			} else {
				Ok(42)
			}
		})
		.await;

		assert_eq!(result.unwrap(), 42);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn gives_up_after_max_attempts() {
		let calls = AtomicU32::new(0);
		let result: Result<u32, TestError> = retry(&fast_config(), || async {
			calls.fetch_add(1, Ordering::SeqCst);
			Err(TestError { retryable: true })
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn non_retryable_error_fails_immediately() {
		let calls = AtomicU32::new(0);
		let result: Result<u32, TestError> = retry(&fast_config(), || async {
			calls.fetch_add(1, Ordering::SeqCst);
			Err(TestError { retryable: false })
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn backoff_delay_is_bounded() {
		let config = RetryConfig {
			max_attempts: 10,
			base_delay: Duration::from_millis(100),
			max_delay: Duration::from_secs(1),
		};
		for attempt in 1..10 {
			let delay = backoff_delay(&config, attempt);
			assert!(delay <= config.max_delay);
			assert!(delay >= Duration::from_millis(0));
		}
	}

	#[test]
	fn retry_config_defaults() {
		let config = RetryConfig::default();
		assert_eq!(config.max_attempts, 3);
		assert!(config.base_delay < config.max_delay);
	}
}
