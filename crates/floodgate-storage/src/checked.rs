// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Result-shaped storage operations with metrics accounting.
//!
//! The rate limiter and the config manager never want a storage failure to
//! propagate as an error: they apply their own fallback policy (fail-open
//! admission, last-known-good config). [`CheckedStorage`] wraps a backend so
//! every call yields an [`OpResult`] instead of a `Result`, retries
//! transient failures up to the configured count, and feeds the
//! `storage_operations_total` / `storage_errors_total` counters.

use std::sync::Arc;
use std::time::Duration;

use floodgate_metrics::MetricsRecorder;
use tracing::warn;

use crate::backend::StorageBackend;
use crate::error::StorageError;

/// Outcome of a checked storage operation.
#[derive(Debug)]
pub struct OpResult<T> {
	pub success: bool,
	pub data: Option<T>,
	pub error: Option<StorageError>,
}

impl<T> OpResult<T> {
	fn ok(data: T) -> Self {
		Self {
			success: true,
			data: Some(data),
			error: None,
		}
	}

	fn err(error: StorageError) -> Self {
		Self {
			success: false,
			data: None,
			error: Some(error),
		}
	}
}

/// A storage backend wrapped with retries and metrics accounting.
#[derive(Clone)]
pub struct CheckedStorage {
	backend: Arc<dyn StorageBackend>,
	metrics: MetricsRecorder,
	retries: u32,
}

impl CheckedStorage {
	pub fn new(backend: Arc<dyn StorageBackend>, metrics: MetricsRecorder, retries: u32) -> Self {
		Self {
			backend,
			metrics,
			retries,
		}
	}

	/// The wrapped backend.
	pub fn backend(&self) -> &Arc<dyn StorageBackend> {
		&self.backend
	}

	pub async fn get(&self, key: &str) -> OpResult<Option<String>> {
		self.run("get", || self.backend.get(key)).await
	}

	pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> OpResult<()> {
		self.run("set", || self.backend.set(key, value, ttl)).await
	}

	pub async fn delete(&self, key: &str) -> OpResult<()> {
		self.run("delete", || self.backend.delete(key)).await
	}

	pub async fn exists(&self, key: &str) -> OpResult<bool> {
		self.run("exists", || self.backend.exists(key)).await
	}

	/// Probe backend health, counting the probe like any other operation.
	pub async fn health(&self) -> OpResult<bool> {
		self.run("health_check", || self.backend.health_check()).await
	}

	async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> OpResult<T>
	where
		F: FnMut() -> Fut,
		Fut: std::future::Future<Output = Result<T, StorageError>>,
	{
		let mut attempt = 0u32;
		loop {
			self.metrics.record_storage_operation();
			match call().await {
				Ok(data) => return OpResult::ok(data),
				Err(e) => {
					self.metrics.record_storage_error();
					if e.is_transient() && attempt < self.retries {
						attempt += 1;
						continue;
					}
					warn!(
						backend = self.backend.name(),
						operation,
						error = %e,
						"storage operation failed"
					);
					return OpResult::err(e);
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicU32, Ordering};

	use crate::memory::MemoryBackend;

	/// Backend that fails every call with a transient error.
	#[derive(Default)]
	struct FailingBackend {
		calls: AtomicU32,
	}

	#[async_trait]
	impl StorageBackend for FailingBackend {
		async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Err(StorageError::Connection("refused".to_string()))
		}

		async fn set(
			&self,
			_key: &str,
			_value: &str,
			_ttl: Option<Duration>,
		) -> Result<(), StorageError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Err(StorageError::Connection("refused".to_string()))
		}

		async fn delete(&self, _key: &str) -> Result<(), StorageError> {
			Err(StorageError::Connection("refused".to_string()))
		}

		async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
			Err(StorageError::Connection("refused".to_string()))
		}

		async fn health_check(&self) -> Result<bool, StorageError> {
			Err(StorageError::Connection("refused".to_string()))
		}

		fn name(&self) -> &'static str {
			"failing"
		}
	}

	#[tokio::test]
	async fn successful_ops_carry_data_and_count() {
		let metrics = MetricsRecorder::initialized();
		let storage = CheckedStorage::new(Arc::new(MemoryBackend::new()), metrics.clone(), 0);

		let set = storage.set("k", "v", None).await;
		assert!(set.success);

		let get = storage.get("k").await;
		assert!(get.success);
		assert_eq!(get.data.unwrap().as_deref(), Some("v"));

		assert_eq!(metrics.storage_operations_total(), 2);
		assert_eq!(metrics.storage_errors_total(), 0);
	}

	#[tokio::test]
	async fn failures_are_result_shaped_not_raised() {
		let metrics = MetricsRecorder::initialized();
		let storage = CheckedStorage::new(Arc::new(FailingBackend::default()), metrics.clone(), 0);

		let result = storage.get("k").await;
		assert!(!result.success);
		assert!(result.data.is_none());
		assert!(result.error.unwrap().is_transient());
		assert_eq!(metrics.storage_errors_total(), 1);
	}

	#[tokio::test]
	async fn transient_failures_retry_up_to_budget() {
		let backend = Arc::new(FailingBackend::default());
		let metrics = MetricsRecorder::initialized();
		let storage = CheckedStorage::new(backend.clone(), metrics.clone(), 2);

		let result = storage.get("k").await;
		assert!(!result.success);
		// Initial attempt plus two retries
		assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
		assert_eq!(metrics.storage_errors_total(), 3);
	}
}
