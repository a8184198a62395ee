// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server configuration from environment variables.
//!
//! Precedence is built-in defaults overlaid by `FLOODGATE_*` environment
//! variables. Unparseable values are ignored with a warning rather than
//! failing startup; structurally invalid *storage* settings additionally
//! degrade to the memory backend (see `floodgate_storage::select_backend`).

use std::collections::BTreeMap;
use std::time::Duration;

use floodgate_core::Level;
use floodgate_limiter::{EndpointLimit, RateLimiterSettings};
use floodgate_storage::{EdgeKvSettings, StorageConfig};
use tracing::warn;

/// Route key used when rate limiting the admin API itself.
pub const ADMIN_ENDPOINT: &str = "admin:log-level";

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub host: String,
	pub port: u16,
	pub storage: StorageConfig,
	/// Bearer keys accepted by the admin API.
	pub api_keys: Vec<String>,
	/// Origins accepted when an `Origin` header is present.
	pub allowed_origins: Vec<String>,
	/// Admin API sustained rate (requests/minute) per client.
	pub admin_rate_per_minute: u32,
	/// Admin API burst capacity per client.
	pub admin_burst: u64,
	pub limiter: RateLimiterSettings,
	/// How long `ConfigManager::fetch` may serve its in-process cache.
	pub config_cache_ttl: Duration,
	/// Default tracing filter when `RUST_LOG` is unset.
	pub log_filter: String,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: "0.0.0.0".to_string(),
			port: 8787,
			storage: StorageConfig::default(),
			api_keys: Vec::new(),
			allowed_origins: Vec::new(),
			admin_rate_per_minute: 30,
			admin_burst: 10,
			limiter: RateLimiterSettings::default(),
			config_cache_ttl: Duration::from_secs(5),
			log_filter: "floodgate_server=info,floodgate_limiter=info,floodgate_storage=info"
				.to_string(),
		}
	}
}

impl ServerConfig {
	/// Socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	/// Load defaults overlaid by `FLOODGATE_*` environment variables.
	pub fn load_from_env() -> Self {
		let mut config = Self::default();

		if let Ok(host) = std::env::var("FLOODGATE_HOST") {
			config.host = host;
		}
		set_parsed(&mut config.port, "FLOODGATE_PORT");

		if let Ok(url) = std::env::var("FLOODGATE_REDIS_URL") {
			if !url.is_empty() {
				config.storage.redis_url = Some(url);
			}
		}
		config.storage.edge_kv = edge_kv_from_env();
		set_duration_secs(&mut config.storage.timeout, "FLOODGATE_STORAGE_TIMEOUT_SECS");
		set_duration_secs(&mut config.storage.default_ttl, "FLOODGATE_STORAGE_TTL_SECS");
		set_parsed(&mut config.storage.retries, "FLOODGATE_STORAGE_RETRIES");

		config.api_keys = list_from_env("FLOODGATE_API_KEYS");
		config.allowed_origins = list_from_env("FLOODGATE_ALLOWED_ORIGINS");

		set_parsed(
			&mut config.admin_rate_per_minute,
			"FLOODGATE_ADMIN_RATE_PER_MINUTE",
		);
		set_parsed(&mut config.admin_burst, "FLOODGATE_ADMIN_BURST");

		set_parsed(
			&mut config.limiter.default_bucket_size,
			"FLOODGATE_BUCKET_SIZE",
		);
		set_parsed(
			&mut config.limiter.default_refill_rate,
			"FLOODGATE_REFILL_RATE",
		);
		config.limiter.sampling = sampling_from_env();
		config.limiter.endpoint_overrides = overrides_from_env();
		if let Ok(flag) = std::env::var("FLOODGATE_ADAPTIVE_BACKOFF") {
			config.limiter.adaptive_backoff = matches!(flag.as_str(), "1" | "true" | "yes");
		}
		set_duration_secs(
			&mut config.limiter.backoff_cooldown,
			"FLOODGATE_BACKOFF_COOLDOWN_SECS",
		);
		config.limiter.bucket_ttl = config.storage.default_ttl;

		set_duration_secs(&mut config.config_cache_ttl, "FLOODGATE_CONFIG_CACHE_TTL_SECS");
		if let Ok(filter) = std::env::var("FLOODGATE_LOG_FILTER") {
			config.log_filter = filter;
		}

		// The admin API limits itself through the same limiter.
		config.limiter.endpoint_overrides.insert(
			ADMIN_ENDPOINT.to_string(),
			EndpointLimit::per_minute(config.admin_rate_per_minute, config.admin_burst),
		);

		config
	}
}

fn edge_kv_from_env() -> Option<EdgeKvSettings> {
	let account_id = std::env::var("FLOODGATE_EDGE_KV_ACCOUNT").ok()?;
	let namespace_id = std::env::var("FLOODGATE_EDGE_KV_NAMESPACE").ok()?;
	let api_token = std::env::var("FLOODGATE_EDGE_KV_TOKEN").ok()?;
	let base_url = std::env::var("FLOODGATE_EDGE_KV_BASE_URL")
		.unwrap_or_else(|_| "https://api.cloudflare.com/client/v4".to_string());

	Some(EdgeKvSettings {
		base_url,
		account_id,
		namespace_id,
		api_token,
	})
}

/// Per-level sampling rates from `FLOODGATE_SAMPLING_<LEVEL>` variables.
fn sampling_from_env() -> BTreeMap<Level, f64> {
	let mut sampling = BTreeMap::new();
	for level in Level::ALL {
		let var = format!("FLOODGATE_SAMPLING_{}", level.as_str().to_uppercase());
		if let Ok(raw) = std::env::var(&var) {
			match raw.parse::<f64>() {
				Ok(rate) if (0.0..=1.0).contains(&rate) => {
					sampling.insert(level, rate);
				}
				_ => warn!(var = %var, value = %raw, "ignoring invalid sampling rate"),
			}
		}
	}
	sampling
}

/// Endpoint overrides from `FLOODGATE_ENDPOINT_OVERRIDES`.
///
/// Format: `endpoint=bucket_size:refill_rate`, comma separated, e.g.
/// `ingest=500:50,export=10:0.5`.
fn overrides_from_env() -> BTreeMap<String, EndpointLimit> {
	let mut overrides = BTreeMap::new();
	let Ok(raw) = std::env::var("FLOODGATE_ENDPOINT_OVERRIDES") else {
		return overrides;
	};

	for entry in raw.split(',').filter(|s| !s.trim().is_empty()) {
		let parsed = entry.trim().split_once('=').and_then(|(endpoint, limit)| {
			let (size, rate) = limit.split_once(':')?;
			Some((
				endpoint.to_string(),
				EndpointLimit {
					bucket_size: size.parse().ok()?,
					refill_rate: rate.parse().ok()?,
				},
			))
		});
		match parsed {
			Some((endpoint, limit)) => {
				overrides.insert(endpoint, limit);
			}
			None => warn!(entry, "ignoring malformed endpoint override"),
		}
	}
	overrides
}

fn list_from_env(var: &str) -> Vec<String> {
	std::env::var(var)
		.map(|raw| {
			raw.split(',')
				.map(|s| s.trim().to_string())
				.filter(|s| !s.is_empty())
				.collect()
		})
		.unwrap_or_default()
}

fn set_parsed<T: std::str::FromStr>(target: &mut T, var: &str) {
	if let Ok(raw) = std::env::var(var) {
		match raw.parse() {
			Ok(value) => *target = value,
			Err(_) => warn!(var, value = %raw, "ignoring unparseable value"),
		}
	}
}

fn set_duration_secs(target: &mut Duration, var: &str) {
	if let Ok(raw) = std::env::var(var) {
		match raw.parse::<u64>() {
			Ok(secs) => *target = Duration::from_secs(secs),
			Err(_) => warn!(var, value = %raw, "ignoring unparseable duration"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_sane() {
		let config = ServerConfig::default();
		assert_eq!(config.admin_rate_per_minute, 30);
		assert!(config.api_keys.is_empty());
		assert!(!config.storage.timeout.is_zero());
	}

	#[test]
	fn override_format_parses() {
		std::env::set_var("FLOODGATE_ENDPOINT_OVERRIDES", "ingest=500:50, export=10:0.5,bad");
		let overrides = overrides_from_env();
		std::env::remove_var("FLOODGATE_ENDPOINT_OVERRIDES");

		assert_eq!(overrides.len(), 2);
		assert_eq!(overrides["ingest"].bucket_size, 500);
		assert_eq!(overrides["export"].refill_rate, 0.5);
	}

	#[test]
	fn admin_endpoint_override_is_always_installed() {
		let config = ServerConfig::load_from_env();
		let admin = &config.limiter.endpoint_overrides[ADMIN_ENDPOINT];
		assert_eq!(admin.bucket_size, config.admin_burst);
	}
}
