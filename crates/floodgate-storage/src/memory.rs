// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process storage backend with real TTL expiry.
//!
//! The default backend, and the fallback when Redis or edge-KV settings are
//! invalid. Expiry is enforced lazily: an expired entry is purged and
//! reported absent on the next `get`/`exists` that touches it. State is
//! process-local, which is fine for single-instance deployments and tests;
//! horizontally scaled deployments want a remote backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::backend::StorageBackend;
use crate::error::StorageError;

#[derive(Debug, Clone)]
struct Entry {
	value: String,
	expires_at: Option<Instant>,
}

impl Entry {
	fn is_expired(&self, now: Instant) -> bool {
		self.expires_at.is_some_and(|deadline| now >= deadline)
	}
}

/// In-memory key-value backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
	entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryBackend {
	pub fn new() -> Self {
		Self::default()
	}

	/// Drop every entry. Test isolation hook; never used on a live path.
	pub async fn clear(&self) {
		self.entries.write().await.clear();
	}

	/// Number of live (non-expired) entries.
	pub async fn len(&self) -> usize {
		let now = Instant::now();
		self.entries
			.read()
			.await
			.values()
			.filter(|entry| !entry.is_expired(now))
			.count()
	}

	pub async fn is_empty(&self) -> bool {
		self.len().await == 0
	}
}

#[async_trait]
impl StorageBackend for MemoryBackend {
	async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		let now = Instant::now();

		{
			let entries = self.entries.read().await;
			match entries.get(key) {
				None => return Ok(None),
				Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
				Some(_) => {}
			}
		}

		// Expired: purge under the write lock, re-checking in case of a
		// concurrent overwrite between the two lock acquisitions.
		let mut entries = self.entries.write().await;
		if let Some(entry) = entries.get(key) {
			if entry.is_expired(now) {
				entries.remove(key);
			} else {
				return Ok(Some(entry.value.clone()));
			}
		}
		Ok(None)
	}

	async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StorageError> {
		let entry = Entry {
			value: value.to_string(),
			expires_at: ttl.map(|ttl| Instant::now() + ttl),
		};
		self.entries.write().await.insert(key.to_string(), entry);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.entries.write().await.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(self.get(key).await?.is_some())
	}

	async fn health_check(&self) -> Result<bool, StorageError> {
		Ok(true)
	}

	fn name(&self) -> &'static str {
		"memory"
	}
}
