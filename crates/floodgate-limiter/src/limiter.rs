// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The rate limiter itself.

use std::collections::BTreeMap;
use std::time::Duration;

use floodgate_core::{GovernanceConfig, Level, RateLimitDecision};
use floodgate_metrics::MetricsRecorder;
use floodgate_storage::CheckedStorage;
use tracing::{debug, warn};

use crate::bucket::{now_unix_ms, BucketState};

/// Endpoint-specific bucket override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointLimit {
	pub bucket_size: u64,
	pub refill_rate: f64,
}

impl EndpointLimit {
	/// An override expressed as requests/minute with a burst capacity.
	pub fn per_minute(rate_per_minute: u32, burst: u64) -> Self {
		Self {
			bucket_size: burst,
			refill_rate: rate_per_minute as f64 / 60.0,
		}
	}
}

/// Static limiter settings resolved at startup.
#[derive(Debug, Clone)]
pub struct RateLimiterSettings {
	/// Bucket capacity when neither an endpoint override nor a per-level
	/// budget applies.
	pub default_bucket_size: u64,
	/// Refill rate (tokens/second) when no endpoint override applies.
	pub default_refill_rate: f64,
	/// Per-level sampling probability in [0, 1]. Absent levels sample at 1.0.
	pub sampling: BTreeMap<Level, f64>,
	/// Per-endpoint bucket overrides, keyed by endpoint name.
	pub endpoint_overrides: BTreeMap<String, EndpointLimit>,
	/// Progressively shrink the effective refill rate on repeated denials.
	pub adaptive_backoff: bool,
	/// How long after the last denial the backoff streak is retained.
	pub backoff_cooldown: Duration,
	/// TTL applied to bucket keys; idle buckets expire via storage.
	pub bucket_ttl: Duration,
}

impl Default for RateLimiterSettings {
	fn default() -> Self {
		Self {
			default_bucket_size: 100,
			default_refill_rate: 10.0,
			sampling: BTreeMap::new(),
			endpoint_overrides: BTreeMap::new(),
			adaptive_backoff: false,
			backoff_cooldown: Duration::from_secs(30),
			bucket_ttl: Duration::from_secs(3600),
		}
	}
}

/// Token-bucket admission control over externalized bucket state.
#[derive(Clone)]
pub struct RateLimiter {
	storage: CheckedStorage,
	settings: RateLimiterSettings,
	metrics: MetricsRecorder,
}

/// Deepest backoff step: refill at 1/8th of the configured rate.
const MAX_BACKOFF_STEPS: u32 = 3;

impl RateLimiter {
	pub fn new(
		storage: CheckedStorage,
		settings: RateLimiterSettings,
		metrics: MetricsRecorder,
	) -> Self {
		Self {
			storage,
			settings,
			metrics,
		}
	}

	fn bucket_key(client_id: &str, endpoint: &str) -> String {
		format!("floodgate:bucket:{client_id}:{endpoint}")
	}

	/// Effective (capacity, refill rate) for this check.
	///
	/// Endpoint overrides win over the document's per-level budget, which
	/// wins over the defaults. Configured values always beat whatever the
	/// stored bucket carries, so operator changes apply immediately.
	fn effective_limits(
		&self,
		config: &GovernanceConfig,
		endpoint: &str,
		level: Level,
	) -> (u64, f64) {
		if let Some(limit) = self.settings.endpoint_overrides.get(endpoint) {
			return (limit.bucket_size, limit.refill_rate);
		}
		let size = config
			.rate_limits
			.get(&level)
			.copied()
			.unwrap_or(self.settings.default_bucket_size);
		(size, self.settings.default_refill_rate)
	}

	/// Sampling pre-filter. `Some(decision)` short-circuits the bucket check.
	fn sample(&self, level: Level) -> Option<RateLimitDecision> {
		let rate = self.settings.sampling.get(&level).copied().unwrap_or(1.0);
		if rate >= 1.0 {
			return None;
		}
		if rate <= 0.0 || fastrand::f64() >= rate {
			return Some(RateLimitDecision::sampled_out());
		}
		None
	}

	/// Decide whether one log record from `client_id` at `level` on
	/// `endpoint` is admitted.
	///
	/// Always returns a well-formed decision: storage failures fail open
	/// against a conservative default bucket and are visible only through
	/// the storage error counters.
	pub async fn check(
		&self,
		config: &GovernanceConfig,
		client_id: &str,
		endpoint: &str,
		level: Level,
	) -> RateLimitDecision {
		let (bucket_size, refill_rate) = self.effective_limits(config, endpoint, level);

		if !config.enabled {
			return RateLimitDecision::allowed(bucket_size as f64);
		}

		if let Some(decision) = self.sample(level) {
			self.metrics.record_rate_limit_hit();
			return decision;
		}

		let key = Self::bucket_key(client_id, endpoint);
		let now_ms = now_unix_ms();

		let read = self.storage.get(&key).await;
		if !read.success {
			// Fail open: a well-formed decision beats denial-of-service of
			// the logging path.
			warn!(client_id, endpoint, "storage read failed, admitting fail-open");
			return RateLimitDecision::allowed((bucket_size as f64 - 1.0).max(0.0));
		}

		let mut state = read
			.data
			.flatten()
			.and_then(|raw| match serde_json::from_str::<BucketState>(&raw) {
				Ok(state) => Some(state),
				Err(e) => {
					warn!(client_id, endpoint, error = %e, "malformed bucket payload, rebuilding");
					None
				}
			})
			.unwrap_or_else(|| BucketState::full(bucket_size, refill_rate, now_ms));

		let effective_rate = self.backoff_rate(&state, refill_rate, now_ms);
		state.refill(now_ms, bucket_size, effective_rate);

		let decision = if state.try_consume() {
			if self.settings.adaptive_backoff {
				state.denial_streak = 0;
			}
			RateLimitDecision::allowed(state.tokens)
		} else {
			self.metrics.record_rate_limit_hit();
			if self.settings.adaptive_backoff {
				state.denial_streak = state.denial_streak.saturating_add(1);
				state.last_denial_ms = now_ms;
			}
			let retry_rate = self.backoff_rate(&state, refill_rate, now_ms);
			RateLimitDecision::denied(state.tokens, state.retry_after_ms(retry_rate))
		};

		// Last-write-wins persistence; a failed write only widens admission
		// for the next check.
		let write = self
			.storage
			.set(
				&key,
				&serde_json::to_string(&state).unwrap_or_default(),
				Some(self.settings.bucket_ttl),
			)
			.await;
		if !write.success {
			warn!(client_id, endpoint, "bucket write failed, decision stands");
		}

		debug!(
			client_id,
			endpoint,
			level = %level,
			allowed = decision.allowed,
			tokens_remaining = decision.tokens_remaining,
			"rate limit check"
		);
		decision
	}

	/// Refill rate with the adaptive backoff penalty applied.
	///
	/// Each consecutive denial halves the rate, floored at 1/2^MAX steps.
	/// Once `backoff_cooldown` passes without a denial the penalty clears.
	fn backoff_rate(&self, state: &BucketState, configured_rate: f64, now_ms: u64) -> f64 {
		if !self.settings.adaptive_backoff || state.denial_streak == 0 {
			return configured_rate;
		}
		let cooldown_ms = self.settings.backoff_cooldown.as_millis() as u64;
		if now_ms.saturating_sub(state.last_denial_ms) > cooldown_ms {
			return configured_rate;
		}
		let steps = state.denial_streak.min(MAX_BACKOFF_STEPS);
		configured_rate / f64::from(1u32 << steps)
	}

	/// Drop the bucket for `(client_id, endpoint)`, restoring a full budget
	/// on the next check.
	pub async fn reset(&self, client_id: &str, endpoint: &str) -> bool {
		let key = Self::bucket_key(client_id, endpoint);
		let result = self.storage.delete(&key).await;
		if result.success {
			self.metrics.record_rate_limit_reset();
		}
		result.success
	}

	pub fn settings(&self) -> &RateLimiterSettings {
		&self.settings
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::time::Duration;

	use async_trait::async_trait;
	use floodgate_storage::{MemoryBackend, StorageBackend, StorageError};

	fn limiter_with(settings: RateLimiterSettings) -> (RateLimiter, MetricsRecorder) {
		let metrics = MetricsRecorder::initialized();
		let storage = CheckedStorage::new(Arc::new(MemoryBackend::new()), metrics.clone(), 0);
		(RateLimiter::new(storage, settings, metrics.clone()), metrics)
	}

	fn config_with_error_budget(budget: u64) -> GovernanceConfig {
		let mut config = GovernanceConfig::default();
		config.rate_limits.insert(Level::Error, budget);
		config
	}

	#[tokio::test]
	async fn admits_until_bucket_exhausts_then_denies_with_retry_hint() {
		let settings = RateLimiterSettings {
			default_refill_rate: 5.0,
			sampling: [(Level::Error, 1.0), (Level::Debug, 0.0)].into_iter().collect(),
			..Default::default()
		};
		let (limiter, _metrics) = limiter_with(settings);
		let config = config_with_error_budget(10);

		for i in 0..10 {
			let decision = limiter.check(&config, "client-a", "ingest", Level::Error).await;
			assert!(decision.allowed, "check {i} should be admitted");
			assert!(decision.tokens_remaining >= 0.0);
			assert!(decision.tokens_remaining <= 10.0);
		}

		let denied = limiter.check(&config, "client-a", "ingest", Level::Error).await;
		assert!(!denied.allowed);
		assert!(denied.retry_after_ms.unwrap() > 0);
	}

	#[tokio::test]
	async fn sampled_out_levels_never_touch_the_bucket() {
		let settings = RateLimiterSettings {
			sampling: [(Level::Debug, 0.0)].into_iter().collect(),
			..Default::default()
		};
		let (limiter, metrics) = limiter_with(settings);
		let config = config_with_error_budget(10);

		for _ in 0..25 {
			let decision = limiter.check(&config, "client-a", "ingest", Level::Debug).await;
			assert!(!decision.allowed);
			assert!(decision.retry_after_ms.is_none());
		}
		// No bucket reads or writes happened
		assert_eq!(metrics.storage_operations_total(), 0);
		assert_eq!(metrics.rate_limit_hits_total(), 25);
	}

	#[tokio::test]
	async fn clients_are_isolated() {
		let (limiter, _metrics) = limiter_with(RateLimiterSettings::default());
		let config = config_with_error_budget(3);

		for _ in 0..3 {
			assert!(
				limiter
					.check(&config, "client-a", "ingest", Level::Error)
					.await
					.allowed
			);
		}
		assert!(
			!limiter
				.check(&config, "client-a", "ingest", Level::Error)
				.await
				.allowed
		);

		// Client B is unaffected by A's exhausted bucket
		let decision = limiter.check(&config, "client-b", "ingest", Level::Error).await;
		assert!(decision.allowed);
	}

	#[tokio::test]
	async fn endpoints_have_independent_budgets() {
		let (limiter, _metrics) = limiter_with(RateLimiterSettings::default());
		let config = config_with_error_budget(1);

		assert!(
			limiter
				.check(&config, "client-a", "ingest", Level::Error)
				.await
				.allowed
		);
		assert!(
			!limiter
				.check(&config, "client-a", "ingest", Level::Error)
				.await
				.allowed
		);

		// Same client, different endpoint: fresh bucket
		assert!(
			limiter
				.check(&config, "client-a", "export", Level::Error)
				.await
				.allowed
		);
	}

	#[tokio::test]
	async fn endpoint_override_beats_level_budget() {
		let settings = RateLimiterSettings {
			endpoint_overrides: [(
				"admin:log-level".to_string(),
				EndpointLimit::per_minute(30, 2),
			)]
			.into_iter()
			.collect(),
			..Default::default()
		};
		let (limiter, _metrics) = limiter_with(settings);
		let config = config_with_error_budget(1000);

		assert!(
			limiter
				.check(&config, "op", "admin:log-level", Level::Error)
				.await
				.allowed
		);
		assert!(
			limiter
				.check(&config, "op", "admin:log-level", Level::Error)
				.await
				.allowed
		);
		let denied = limiter
			.check(&config, "op", "admin:log-level", Level::Error)
			.await;
		assert!(!denied.allowed);
	}

	#[tokio::test]
	async fn disabled_document_admits_without_storage_traffic() {
		let (limiter, metrics) = limiter_with(RateLimiterSettings::default());
		let mut config = GovernanceConfig::default();
		config.enabled = false;

		let decision = limiter.check(&config, "client-a", "ingest", Level::Trace).await;
		assert!(decision.allowed);
		assert_eq!(metrics.storage_operations_total(), 0);
	}

	#[tokio::test]
	async fn adaptive_backoff_stretches_retry_hint() {
		let settings = RateLimiterSettings {
			adaptive_backoff: true,
			backoff_cooldown: Duration::from_secs(60),
			..Default::default()
		};
		let (limiter, _metrics) = limiter_with(settings);
		let config = config_with_error_budget(1);

		assert!(
			limiter
				.check(&config, "client-a", "ingest", Level::Error)
				.await
				.allowed
		);

		let first = limiter
			.check(&config, "client-a", "ingest", Level::Error)
			.await
			.retry_after_ms
			.unwrap();
		let second = limiter
			.check(&config, "client-a", "ingest", Level::Error)
			.await
			.retry_after_ms
			.unwrap();
		assert!(second > first, "repeated denials should stretch the hint");
	}

	#[tokio::test]
	async fn reset_restores_a_full_bucket() {
		let (limiter, metrics) = limiter_with(RateLimiterSettings::default());
		let config = config_with_error_budget(1);

		assert!(
			limiter
				.check(&config, "client-a", "ingest", Level::Error)
				.await
				.allowed
		);
		assert!(
			!limiter
				.check(&config, "client-a", "ingest", Level::Error)
				.await
				.allowed
		);

		assert!(limiter.reset("client-a", "ingest").await);
		assert_eq!(metrics.rate_limit_resets_total(), 1);

		assert!(
			limiter
				.check(&config, "client-a", "ingest", Level::Error)
				.await
				.allowed
		);
	}

	/// Backend that rejects every call.
	struct RejectAll;

	#[async_trait]
	impl StorageBackend for RejectAll {
		async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
			Err(StorageError::Connection("down".to_string()))
		}
		async fn set(
			&self,
			_key: &str,
			_value: &str,
			_ttl: Option<Duration>,
		) -> Result<(), StorageError> {
			Err(StorageError::Connection("down".to_string()))
		}
		async fn delete(&self, _key: &str) -> Result<(), StorageError> {
			Err(StorageError::Connection("down".to_string()))
		}
		async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
			Err(StorageError::Connection("down".to_string()))
		}
		async fn health_check(&self) -> Result<bool, StorageError> {
			Err(StorageError::Connection("down".to_string()))
		}
		fn name(&self) -> &'static str {
			"reject-all"
		}
	}

	#[tokio::test]
	async fn storage_outage_fails_open() {
		let metrics = MetricsRecorder::initialized();
		let storage = CheckedStorage::new(Arc::new(RejectAll), metrics.clone(), 0);
		let limiter = RateLimiter::new(storage, RateLimiterSettings::default(), metrics.clone());
		let config = GovernanceConfig::default();

		let decision = limiter.check(&config, "client-a", "ingest", Level::Error).await;
		assert!(decision.allowed);
		assert!(decision.tokens_remaining >= 0.0);
		assert!(metrics.storage_errors_total() > 0);
	}

	#[tokio::test]
	async fn malformed_stored_payload_rebuilds_the_bucket() {
		let metrics = MetricsRecorder::initialized();
		let backend = Arc::new(MemoryBackend::new());
		backend
			.set("floodgate:bucket:client-a:ingest", "not json", None)
			.await
			.unwrap();
		let storage = CheckedStorage::new(backend, metrics.clone(), 0);
		let limiter = RateLimiter::new(storage, RateLimiterSettings::default(), metrics);

		let decision = limiter
			.check(&GovernanceConfig::default(), "client-a", "ingest", Level::Error)
			.await;
		assert!(decision.allowed);
	}
}
