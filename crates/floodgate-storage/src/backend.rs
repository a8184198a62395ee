// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The uniform storage contract.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageError;

/// Uniform async key-value contract implemented by every backend.
///
/// Values are opaque strings (callers store serialized JSON). A `ttl` of
/// `None` persists the key until overwritten or deleted; backends with
/// native expiry delegate TTL to it, the memory backend enforces expiry
/// lazily on read. Reads after expiry return `None`, never a stale value.
#[async_trait]
pub trait StorageBackend: Send + Sync {
	/// Fetch the value at `key`, or `None` if absent or expired.
	async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

	/// Store `value` at `key`, optionally expiring after `ttl`.
	async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StorageError>;

	/// Remove `key`. Removing an absent key is not an error.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Whether `key` currently holds a live value.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Probe backend reachability.
	async fn health_check(&self) -> Result<bool, StorageError>;

	/// Short backend identifier for logs and the health endpoint.
	fn name(&self) -> &'static str;
}

/// Run `fut` under the backend's timeout budget.
///
/// Elapsed budgets become [`StorageError::Timeout`] so a slow backend can
/// never hang a log call site.
pub(crate) async fn bounded<T, F>(
	operation: &'static str,
	budget: Duration,
	fut: F,
) -> Result<T, StorageError>
where
	F: Future<Output = Result<T, StorageError>>,
{
	match tokio::time::timeout(budget, fut).await {
		Ok(result) => result,
		Err(_) => Err(StorageError::Timeout { operation }),
	}
}
