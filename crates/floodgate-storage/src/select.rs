// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backend selection and startup fallback.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::backend::StorageBackend;
use crate::edge_kv::{EdgeKvSettings, EdgeKvStore};
use crate::error::StorageError;
use crate::memory::MemoryBackend;
use crate::redis_store::RedisStore;

/// Storage settings resolved from the environment at startup.
#[derive(Debug, Clone)]
pub struct StorageConfig {
	/// Redis connection URL. Takes precedence when present.
	pub redis_url: Option<String>,
	/// Edge KV credentials. Used when no Redis URL is configured.
	pub edge_kv: Option<EdgeKvSettings>,
	/// Per-operation timeout budget.
	pub timeout: Duration,
	/// Default TTL applied to bucket keys.
	pub default_ttl: Duration,
	/// Transient-error retry count for checked operations.
	pub retries: u32,
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			redis_url: None,
			edge_kv: None,
			timeout: Duration::from_secs(2),
			default_ttl: Duration::from_secs(3600),
			retries: 1,
		}
	}
}

impl StorageConfig {
	/// Structural validation. Violations degrade to the memory backend with
	/// defaults instead of failing startup.
	pub fn validate(&self) -> Result<(), StorageError> {
		if self.timeout.is_zero() {
			return Err(StorageError::InvalidConfig(
				"storage timeout must be positive".to_string(),
			));
		}
		if self.default_ttl.is_zero() {
			return Err(StorageError::InvalidConfig(
				"default TTL must be positive".to_string(),
			));
		}
		if let Some(edge) = &self.edge_kv {
			if edge.base_url.is_empty() || edge.account_id.is_empty() || edge.namespace_id.is_empty()
			{
				return Err(StorageError::InvalidConfig(
					"edge kv settings are incomplete".to_string(),
				));
			}
		}
		Ok(())
	}
}

/// Choose a backend once at startup.
///
/// Precedence: Redis URL, then edge-KV credentials, then memory. Invalid
/// settings or an unreachable remote degrade to memory so the governance
/// plane never blocks application startup.
pub async fn select_backend(config: &StorageConfig) -> Arc<dyn StorageBackend> {
	if let Err(e) = config.validate() {
		warn!(error = %e, "storage configuration invalid, falling back to memory backend");
		return Arc::new(MemoryBackend::new());
	}

	if let Some(url) = &config.redis_url {
		match RedisStore::connect(url, config.timeout).await {
			Ok(store) => {
				info!(backend = "redis", "selected storage backend");
				return Arc::new(store);
			}
			Err(e) => {
				warn!(error = %e, "redis unreachable, falling back to memory backend");
				return Arc::new(MemoryBackend::new());
			}
		}
	}

	if let Some(edge) = &config.edge_kv {
		match EdgeKvStore::new(edge.clone(), config.timeout) {
			Ok(store) => {
				info!(backend = "edge-kv", "selected storage backend");
				return Arc::new(store);
			}
			Err(e) => {
				warn!(error = %e, "edge kv misconfigured, falling back to memory backend");
				return Arc::new(MemoryBackend::new());
			}
		}
	}

	info!(backend = "memory", "selected storage backend");
	Arc::new(MemoryBackend::new())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_config_is_valid() {
		assert!(StorageConfig::default().validate().is_ok());
	}

	#[test]
	fn zero_timeout_is_invalid() {
		let config = StorageConfig {
			timeout: Duration::ZERO,
			..Default::default()
		};
		assert!(matches!(
			config.validate(),
			Err(StorageError::InvalidConfig(_))
		));
	}

	#[test]
	fn incomplete_edge_settings_are_invalid() {
		let config = StorageConfig {
			edge_kv: Some(EdgeKvSettings {
				base_url: String::new(),
				account_id: "acct".to_string(),
				namespace_id: "ns".to_string(),
				api_token: "token".to_string(),
			}),
			..Default::default()
		};
		assert!(config.validate().is_err());
	}

	#[tokio::test]
	async fn defaults_select_memory() {
		let backend = select_backend(&StorageConfig::default()).await;
		assert_eq!(backend.name(), "memory");
	}

	#[tokio::test]
	async fn invalid_config_falls_back_to_memory() {
		let config = StorageConfig {
			redis_url: Some("redis://127.0.0.1/".to_string()),
			default_ttl: Duration::ZERO,
			..Default::default()
		};
		let backend = select_backend(&config).await;
		assert_eq!(backend.name(), "memory");
	}

	#[tokio::test]
	async fn unreachable_redis_falls_back_to_memory() {
		// Nothing listens on this port; connect should fail fast.
		let config = StorageConfig {
			redis_url: Some("redis://127.0.0.1:1/".to_string()),
			timeout: Duration::from_millis(200),
			..Default::default()
		};
		let backend = select_backend(&config).await;
		assert_eq!(backend.name(), "memory");
	}
}
