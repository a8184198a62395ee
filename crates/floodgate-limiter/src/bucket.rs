// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persisted token bucket state.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Current wall-clock time in unix milliseconds.
///
/// Bucket state is shared across processes, so refill math has to use wall
/// time rather than a process-local monotonic clock.
pub fn now_unix_ms() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or(0)
}

/// Serialized per-(client, endpoint) bucket state.
///
/// Capacity and refill rate are stored for observability, but checks always
/// compute with the *configured* values so an operator change takes effect
/// on the next check rather than when the bucket happens to expire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketState {
	/// Available tokens. Invariant: `0 <= tokens <= bucket_size`.
	pub tokens: f64,
	/// Unix-ms timestamp of the last refill. Never moves backward.
	pub last_refill_ms: u64,
	/// Capacity at the time of the last write.
	pub bucket_size: u64,
	/// Refill rate (tokens/second) at the time of the last write.
	pub refill_rate: f64,
	/// Consecutive denials inside the current backoff window.
	#[serde(default)]
	pub denial_streak: u32,
	/// Unix-ms timestamp of the most recent denial.
	#[serde(default)]
	pub last_denial_ms: u64,
}

impl BucketState {
	/// A full bucket created lazily on first check.
	pub fn full(bucket_size: u64, refill_rate: f64, now_ms: u64) -> Self {
		Self {
			tokens: bucket_size as f64,
			last_refill_ms: now_ms,
			bucket_size,
			refill_rate,
			denial_streak: 0,
			last_denial_ms: 0,
		}
	}

	/// Refill tokens for the elapsed interval, capped at `bucket_size`.
	///
	/// Elapsed time saturates at zero, so a clock rollback (skewed replica,
	/// NTP step) never reduces available tokens; `last_refill_ms` likewise
	/// never moves backward.
	pub fn refill(&mut self, now_ms: u64, bucket_size: u64, refill_rate: f64) {
		let elapsed_ms = now_ms.saturating_sub(self.last_refill_ms);
		let replenished = elapsed_ms as f64 / 1000.0 * refill_rate;

		self.tokens = (self.tokens + replenished).min(bucket_size as f64).max(0.0);
		self.last_refill_ms = self.last_refill_ms.max(now_ms);
		self.bucket_size = bucket_size;
		self.refill_rate = refill_rate;
	}

	/// Consume one token if available. Returns whether the check is admitted.
	pub fn try_consume(&mut self) -> bool {
		if self.tokens >= 1.0 {
			self.tokens -= 1.0;
			true
		} else {
			false
		}
	}

	/// Milliseconds until one full token will be available at `refill_rate`.
	pub fn retry_after_ms(&self, refill_rate: f64) -> u64 {
		if refill_rate <= 0.0 {
			return u64::MAX;
		}
		let deficit = (1.0 - self.tokens).max(0.0);
		(deficit / refill_rate * 1000.0).ceil() as u64
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn refill_caps_at_capacity() {
		let mut state = BucketState::full(10, 5.0, 1_000);
		state.tokens = 2.0;
		// 100 seconds elapsed would replenish 500 tokens
		state.refill(101_000, 10, 5.0);
		assert_eq!(state.tokens, 10.0);
	}

	#[test]
	fn refill_is_proportional_to_elapsed_time() {
		let mut state = BucketState::full(10, 5.0, 1_000);
		state.tokens = 0.0;
		state.refill(1_400, 10, 5.0); // 400ms at 5/s = 2 tokens
		assert!((state.tokens - 2.0).abs() < 1e-9);
	}

	#[test]
	fn clock_rollback_never_reduces_tokens() {
		let mut state = BucketState::full(10, 5.0, 10_000);
		state.tokens = 3.0;
		state.refill(5_000, 10, 5.0); // clock went backwards
		assert_eq!(state.tokens, 3.0);
		assert_eq!(state.last_refill_ms, 10_000);
	}

	#[test]
	fn consume_denies_below_one_token() {
		let mut state = BucketState::full(1, 1.0, 0);
		assert!(state.try_consume());
		assert!(!state.try_consume());
		assert!(state.tokens >= 0.0);
	}

	#[test]
	fn retry_after_reflects_deficit() {
		let mut state = BucketState::full(10, 5.0, 0);
		state.tokens = 0.5;
		// Needs 0.5 tokens at 5/s = 100ms
		assert_eq!(state.retry_after_ms(5.0), 100);
	}

	#[test]
	fn config_values_override_stored_values_on_refill() {
		let mut state = BucketState::full(10, 5.0, 1_000);
		state.refill(1_000, 20, 2.0);
		assert_eq!(state.bucket_size, 20);
		assert_eq!(state.refill_rate, 2.0);
	}

	#[test]
	fn state_round_trips_and_tolerates_missing_backoff_fields() {
		let state = BucketState::full(10, 5.0, 1_000);
		let json = serde_json::to_string(&state).unwrap();
		let parsed: BucketState = serde_json::from_str(&json).unwrap();
		assert_eq!(parsed, state);

		// Payloads written before backoff fields existed still parse
		let legacy = r#"{"tokens":4.0,"last_refill_ms":1,"bucket_size":10,"refill_rate":5.0}"#;
		let parsed: BucketState = serde_json::from_str(legacy).unwrap();
		assert_eq!(parsed.denial_streak, 0);
	}
}
