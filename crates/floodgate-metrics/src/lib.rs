// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Observability counters for the log governance plane.
//!
//! [`MetricsRecorder`] is a cheaply clonable handle around a shared set of
//! atomic counters. It is a pure observer: it never mutates domain state, and
//! recording is safe at any point in the process lifecycle: calls made
//! before [`MetricsRecorder::init`] (or after [`MetricsRecorder::reset`]) are
//! silently dropped rather than panicking, so instrumented code paths never
//! need to know whether metrics are live.
//!
//! All counters use relaxed atomic ordering; counts are monotonic but carry
//! no happens-before relationship with the operations they describe.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Shared governance metrics counters.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
	inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
	enabled: AtomicBool,
	config_fetch_total: AtomicU64,
	config_update_total: AtomicU64,
	config_error_total: AtomicU64,
	rate_limit_hits_total: AtomicU64,
	rate_limit_resets_total: AtomicU64,
	storage_operations_total: AtomicU64,
	storage_errors_total: AtomicU64,
	admin_api_calls_total: AtomicU64,
	admin_api_errors_total: AtomicU64,
}

/// Point-in-time view of every counter.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
	pub config_fetch_total: u64,
	pub config_update_total: u64,
	pub config_error_total: u64,
	pub rate_limit_hits_total: u64,
	pub rate_limit_resets_total: u64,
	pub storage_operations_total: u64,
	pub storage_errors_total: u64,
	pub admin_api_calls_total: u64,
	pub admin_api_errors_total: u64,
	pub timestamp: DateTime<Utc>,
}

macro_rules! counter {
	($record:ident, $get:ident, $field:ident) => {
		#[doc = concat!("Increment `", stringify!($field), "`.")]
		pub fn $record(&self) {
			if self.inner.enabled.load(Ordering::Relaxed) {
				self.inner.$field.fetch_add(1, Ordering::Relaxed);
			}
		}

		#[doc = concat!("Current value of `", stringify!($field), "`.")]
		pub fn $get(&self) -> u64 {
			self.inner.$field.load(Ordering::Relaxed)
		}
	};
}

impl MetricsRecorder {
	/// Create a recorder. Recording is a no-op until [`init`](Self::init).
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a recorder with recording already enabled.
	pub fn initialized() -> Self {
		let recorder = Self::new();
		recorder.init();
		recorder
	}

	/// Enable recording.
	pub fn init(&self) {
		self.inner.enabled.store(true, Ordering::Relaxed);
	}

	/// Whether recording is currently live.
	pub fn is_initialized(&self) -> bool {
		self.inner.enabled.load(Ordering::Relaxed)
	}

	/// Zero every counter and disable recording until the next
	/// [`init`](Self::init). Used between test runs and on redeploy.
	pub fn reset(&self) {
		self.inner.enabled.store(false, Ordering::Relaxed);
		self.inner.config_fetch_total.store(0, Ordering::Relaxed);
		self.inner.config_update_total.store(0, Ordering::Relaxed);
		self.inner.config_error_total.store(0, Ordering::Relaxed);
		self.inner.rate_limit_hits_total.store(0, Ordering::Relaxed);
		self.inner.rate_limit_resets_total.store(0, Ordering::Relaxed);
		self.inner.storage_operations_total.store(0, Ordering::Relaxed);
		self.inner.storage_errors_total.store(0, Ordering::Relaxed);
		self.inner.admin_api_calls_total.store(0, Ordering::Relaxed);
		self.inner.admin_api_errors_total.store(0, Ordering::Relaxed);
	}

	counter!(record_config_fetch, config_fetch_total, config_fetch_total);
	counter!(record_config_update, config_update_total, config_update_total);
	counter!(record_config_error, config_error_total, config_error_total);
	counter!(record_rate_limit_hit, rate_limit_hits_total, rate_limit_hits_total);
	counter!(
		record_rate_limit_reset,
		rate_limit_resets_total,
		rate_limit_resets_total
	);
	counter!(
		record_storage_operation,
		storage_operations_total,
		storage_operations_total
	);
	counter!(record_storage_error, storage_errors_total, storage_errors_total);
	counter!(record_admin_api_call, admin_api_calls_total, admin_api_calls_total);
	counter!(
		record_admin_api_error,
		admin_api_errors_total,
		admin_api_errors_total
	);

	/// Snapshot every counter with a capture timestamp.
	pub fn snapshot(&self) -> MetricsSnapshot {
		MetricsSnapshot {
			config_fetch_total: self.config_fetch_total(),
			config_update_total: self.config_update_total(),
			config_error_total: self.config_error_total(),
			rate_limit_hits_total: self.rate_limit_hits_total(),
			rate_limit_resets_total: self.rate_limit_resets_total(),
			storage_operations_total: self.storage_operations_total(),
			storage_errors_total: self.storage_errors_total(),
			admin_api_calls_total: self.admin_api_calls_total(),
			admin_api_errors_total: self.admin_api_errors_total(),
			timestamp: Utc::now(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn recording_before_init_is_a_noop() {
		let metrics = MetricsRecorder::new();
		metrics.record_rate_limit_hit();
		assert_eq!(metrics.rate_limit_hits_total(), 0);

		metrics.init();
		metrics.record_rate_limit_hit();
		assert_eq!(metrics.rate_limit_hits_total(), 1);
	}

	#[test]
	fn reset_zeroes_and_requires_reinit() {
		let metrics = MetricsRecorder::initialized();
		metrics.record_storage_operation();
		metrics.record_storage_error();
		assert_eq!(metrics.storage_operations_total(), 1);

		metrics.reset();
		assert_eq!(metrics.storage_operations_total(), 0);
		assert_eq!(metrics.storage_errors_total(), 0);

		// Still disabled until re-init
		metrics.record_storage_operation();
		assert_eq!(metrics.storage_operations_total(), 0);

		metrics.init();
		metrics.record_storage_operation();
		assert_eq!(metrics.storage_operations_total(), 1);
	}

	#[test]
	fn clones_share_counters() {
		let metrics = MetricsRecorder::initialized();
		let observer = metrics.clone();
		metrics.record_admin_api_call();
		assert_eq!(observer.admin_api_calls_total(), 1);
	}

	#[test]
	fn snapshot_captures_all_counters() {
		let metrics = MetricsRecorder::initialized();
		metrics.record_config_fetch();
		metrics.record_config_update();
		metrics.record_admin_api_error();

		let snap = metrics.snapshot();
		assert_eq!(snap.config_fetch_total, 1);
		assert_eq!(snap.config_update_total, 1);
		assert_eq!(snap.admin_api_errors_total, 1);
		assert_eq!(snap.rate_limit_hits_total, 0);
	}
}
