// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The governance configuration document and its merge semantics.
//!
//! The document is a singleton: one well-known storage key holds the current
//! version. Replicas race on writes with last-write-wins semantics, so the
//! only cross-replica guarantee is the monotonically increasing `version`
//! assigned by the writer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::level::Level;

/// The runtime log governance document.
///
/// `version` starts at 1 for the first persisted document and strictly
/// increases on every successful write, including resets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceConfig {
	/// Minimum severity admitted when no service override applies.
	pub global_level: Level,
	/// Per-service minimum severity overrides.
	#[serde(default)]
	pub service_levels: BTreeMap<String, Level>,
	/// Per-level token budgets (bucket sizes) for the rate limiter.
	#[serde(default)]
	pub rate_limits: BTreeMap<Level, u64>,
	/// Global kill switch. When false, every check is admitted untouched.
	pub enabled: bool,
	/// Monotonic document version assigned by the writer.
	pub version: u64,
	/// Server-assigned write timestamp.
	pub last_updated: DateTime<Utc>,
}

impl Default for GovernanceConfig {
	fn default() -> Self {
		let mut rate_limits = BTreeMap::new();
		rate_limits.insert(Level::Trace, 10);
		rate_limits.insert(Level::Debug, 50);
		rate_limits.insert(Level::Info, 100);
		rate_limits.insert(Level::Warn, 200);
		rate_limits.insert(Level::Error, 500);
		rate_limits.insert(Level::Fatal, 1000);

		Self {
			global_level: Level::Info,
			service_levels: BTreeMap::new(),
			rate_limits,
			enabled: true,
			version: 1,
			last_updated: Utc::now(),
		}
	}
}

impl GovernanceConfig {
	/// The minimum severity in effect for `service`.
	pub fn effective_level(&self, service: &str) -> Level {
		self.service_levels
			.get(service)
			.copied()
			.unwrap_or(self.global_level)
	}

	/// Whether a record at `level` from `service` passes the severity gate.
	///
	/// This is the cheap pre-check a call site runs before consulting the
	/// rate limiter. A disabled document admits everything.
	pub fn is_admitted(&self, service: &str, level: Level) -> bool {
		if !self.enabled {
			return true;
		}
		level >= self.effective_level(service)
	}

	/// Condensed view for `GET ?summary=true`.
	pub fn summary(&self) -> GovernanceSummary {
		GovernanceSummary {
			global_level: self.global_level,
			service_override_count: self.service_levels.len(),
			enabled: self.enabled,
			version: self.version,
			last_updated: self.last_updated,
		}
	}
}

/// Condensed governance view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceSummary {
	pub global_level: Level,
	pub service_override_count: usize,
	pub enabled: bool,
	pub version: u64,
	pub last_updated: DateTime<Utc>,
}

/// Partial governance document used by PATCH.
///
/// Scalar fields overwrite; map fields merge key-by-key, preserving
/// unspecified keys. `version` and `last_updated` are server-assigned and
/// cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernanceConfigPatch {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub global_level: Option<Level>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub service_levels: Option<BTreeMap<String, Level>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rate_limits: Option<BTreeMap<Level, u64>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub enabled: Option<bool>,
}

impl GovernanceConfigPatch {
	/// Apply this patch to `base`, returning the merged document.
	///
	/// Does not bump `version` or `last_updated`; the config manager owns
	/// those on write.
	pub fn apply(&self, base: &GovernanceConfig) -> GovernanceConfig {
		let mut merged = base.clone();

		if let Some(level) = self.global_level {
			merged.global_level = level;
		}
		if let Some(overrides) = &self.service_levels {
			for (service, level) in overrides {
				merged.service_levels.insert(service.clone(), *level);
			}
		}
		if let Some(limits) = &self.rate_limits {
			for (level, budget) in limits {
				merged.rate_limits.insert(*level, *budget);
			}
		}
		if let Some(enabled) = self.enabled {
			merged.enabled = enabled;
		}

		merged
	}

	/// Whether the patch specifies nothing.
	pub fn is_empty(&self) -> bool {
		self.global_level.is_none()
			&& self.service_levels.is_none()
			&& self.rate_limits.is_none()
			&& self.enabled.is_none()
	}
}

/// Fields of `new` that differ from `old`, as a JSON object.
///
/// Used for the `changes` object in PATCH responses. Server-assigned fields
/// (`version`, `last_updated`) are excluded.
pub fn diff_changes(
	old: &GovernanceConfig,
	new: &GovernanceConfig,
) -> serde_json::Map<String, serde_json::Value> {
	let mut changes = serde_json::Map::new();

	if old.global_level != new.global_level {
		changes.insert(
			"global_level".to_string(),
			serde_json::json!(new.global_level),
		);
	}
	if old.service_levels != new.service_levels {
		changes.insert(
			"service_levels".to_string(),
			serde_json::json!(new.service_levels),
		);
	}
	if old.rate_limits != new.rate_limits {
		changes.insert("rate_limits".to_string(), serde_json::json!(new.rate_limits));
	}
	if old.enabled != new.enabled {
		changes.insert("enabled".to_string(), serde_json::json!(new.enabled));
	}

	changes
}
