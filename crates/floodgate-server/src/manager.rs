// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Governance document lifecycle: fetch, create, patch, reset.
//!
//! The document lives under one well-known storage key. Reads are
//! remote-first with a short in-process cache (a memoization convenience,
//! never a source of truth; every write invalidates it) and degrade to the
//! last-known-good document, then the compiled-in default, when storage is
//! unavailable or the stored payload is malformed. Writes assign the
//! monotonic `version` and `last_updated`; a write that cannot be confirmed
//! is the one storage failure that propagates to the caller.

use std::time::Duration;

use chrono::Utc;
use floodgate_core::{
	diff_changes, validate_document, validate_patch, GovernanceConfig, GovernanceConfigPatch,
};
use floodgate_metrics::MetricsRecorder;
use floodgate_storage::CheckedStorage;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Storage key of the governance document.
pub const GOVERNANCE_KEY: &str = "floodgate:governance";

struct CachedDoc {
	config: GovernanceConfig,
	fetched_at: Instant,
}

/// Owns the typed governance document and its persistence.
pub struct ConfigManager {
	storage: CheckedStorage,
	metrics: MetricsRecorder,
	cache_ttl: Duration,
	cache: RwLock<Option<CachedDoc>>,
	last_known_good: RwLock<Option<GovernanceConfig>>,
}

impl ConfigManager {
	pub fn new(storage: CheckedStorage, metrics: MetricsRecorder, cache_ttl: Duration) -> Self {
		Self {
			storage,
			metrics,
			cache_ttl,
			cache: RwLock::new(None),
			last_known_good: RwLock::new(None),
		}
	}

	/// Current document: cache, then storage, then last-known-good, then
	/// the compiled-in default. Never fails.
	pub async fn fetch(&self) -> GovernanceConfig {
		self.metrics.record_config_fetch();

		{
			let cache = self.cache.read().await;
			if let Some(cached) = cache.as_ref() {
				if cached.fetched_at.elapsed() < self.cache_ttl {
					return cached.config.clone();
				}
			}
		}

		match self.read_stored().await {
			Ok(Some(config)) => {
				self.remember(config.clone()).await;
				config
			}
			Ok(None) => {
				debug!("no governance document persisted, serving default");
				GovernanceConfig::default()
			}
			Err(()) => self.fallback().await,
		}
	}

	/// Full replace. `version` becomes stored+1, or 1 for the first write.
	pub async fn create(&self, body: &Value) -> Result<GovernanceConfig, ApiError> {
		let errors = validate_document(body);
		if !errors.is_empty() {
			self.metrics.record_config_error();
			return Err(ApiError::Validation(errors));
		}

		// POST semantics: unspecified fields take their defaults.
		let patch: GovernanceConfigPatch =
			serde_json::from_value(body.clone()).map_err(|_| ApiError::InvalidJson)?;
		let mut document = patch.apply(&GovernanceConfig::default());
		document.version = self.prior_version().await + 1;
		document.last_updated = Utc::now();

		self.persist(document).await
	}

	/// Partial update. Map fields merge key-by-key; scalars overwrite.
	/// Returns the new document and the fields that changed.
	pub async fn patch(
		&self,
		body: &Value,
	) -> Result<(GovernanceConfig, serde_json::Map<String, Value>), ApiError> {
		let errors = validate_patch(body);
		if !errors.is_empty() {
			self.metrics.record_config_error();
			return Err(ApiError::Validation(errors));
		}

		let patch: GovernanceConfigPatch =
			serde_json::from_value(body.clone()).map_err(|_| ApiError::InvalidJson)?;

		let base = self.fetch().await;
		let mut merged = patch.apply(&base);
		merged.version = base.version.max(self.prior_version().await) + 1;
		merged.last_updated = Utc::now();

		let changes = diff_changes(&base, &merged);
		let written = self.persist(merged).await?;
		Ok((written, changes))
	}

	/// Reset to a fresh default document. The version keeps counting
	/// upward from the prior value rather than restarting at 1.
	pub async fn reset(&self) -> Result<GovernanceConfig, ApiError> {
		let mut document = GovernanceConfig::default();
		document.version = self.prior_version().await + 1;
		document.last_updated = Utc::now();
		self.persist(document).await
	}

	/// The version to increment from: the stored document's when readable,
	/// otherwise the last-known-good's, otherwise 0 (so a first write is
	/// version 1).
	async fn prior_version(&self) -> u64 {
		match self.read_stored().await {
			Ok(Some(config)) => config.version,
			Ok(None) => 0,
			Err(()) => self
				.last_known_good
				.read()
				.await
				.as_ref()
				.map(|c| c.version)
				.unwrap_or(0),
		}
	}

	/// `Ok(None)` means confirmed-absent; `Err(())` means storage failed or
	/// the payload was malformed, and a fallback should be used.
	async fn read_stored(&self) -> Result<Option<GovernanceConfig>, ()> {
		let result = self.storage.get(GOVERNANCE_KEY).await;
		if !result.success {
			self.metrics.record_config_error();
			return Err(());
		}
		match result.data.flatten() {
			None => Ok(None),
			Some(raw) => match serde_json::from_str(&raw) {
				Ok(config) => Ok(Some(config)),
				Err(e) => {
					warn!(error = %e, "malformed governance payload in storage");
					self.metrics.record_config_error();
					Err(())
				}
			},
		}
	}

	async fn fallback(&self) -> GovernanceConfig {
		if let Some(config) = self.last_known_good.read().await.as_ref() {
			warn!("storage unavailable, serving last-known-good governance document");
			return config.clone();
		}
		warn!("storage unavailable, serving default governance document");
		GovernanceConfig::default()
	}

	/// Write through storage. The document persists without TTL; it is the
	/// singleton source of truth, not an expiring cache entry.
	async fn persist(&self, document: GovernanceConfig) -> Result<GovernanceConfig, ApiError> {
		let payload = serde_json::to_string(&document).map_err(|_| ApiError::Internal)?;
		let write = self.storage.set(GOVERNANCE_KEY, &payload, None).await;
		if !write.success {
			self.metrics.record_config_error();
			let detail = write
				.error
				.map(|e| e.to_string())
				.unwrap_or_else(|| "unknown storage failure".to_string());
			return Err(ApiError::Storage(detail));
		}

		self.metrics.record_config_update();
		self.remember(document.clone()).await;
		debug!(version = document.version, "governance document written");
		Ok(document)
	}

	async fn remember(&self, config: GovernanceConfig) {
		*self.last_known_good.write().await = Some(config.clone());
		*self.cache.write().await = Some(CachedDoc {
			config,
			fetched_at: Instant::now(),
		});
	}
}
