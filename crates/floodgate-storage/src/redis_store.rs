// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redis-backed storage.
//!
//! Shares admission state across horizontally scaled instances. Keys expire
//! via Redis' native TTL. Connections go through
//! `redis::aio::ConnectionManager`, which reconnects internally, so a
//! dropped connection shows up as a transient [`StorageError::Connection`]
//! rather than a poisoned handle.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use crate::backend::{bounded, StorageBackend};
use crate::error::StorageError;

/// Redis storage backend.
#[derive(Clone)]
pub struct RedisStore {
	manager: ConnectionManager,
	timeout: Duration,
}

impl RedisStore {
	/// Connect to `url` (e.g. `redis://127.0.0.1/`).
	///
	/// Fails fast on an unreachable server so [`select_backend`](crate::select_backend)
	/// can degrade to the memory backend at startup.
	pub async fn connect(url: &str, timeout: Duration) -> Result<Self, StorageError> {
		let client = redis::Client::open(url).map_err(StorageError::from)?;
		let manager = bounded("connect", timeout, async {
			ConnectionManager::new(client).await.map_err(StorageError::from)
		})
		.await?;

		debug!(%url, "connected to redis storage backend");
		Ok(Self { manager, timeout })
	}

	fn connection(&self) -> ConnectionManager {
		self.manager.clone()
	}
}

#[async_trait]
impl StorageBackend for RedisStore {
	async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		let mut conn = self.connection();
		bounded("get", self.timeout, async move {
			conn.get::<_, Option<String>>(key).await.map_err(StorageError::from)
		})
		.await
	}

	async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StorageError> {
		let mut conn = self.connection();
		bounded("set", self.timeout, async move {
			match ttl {
				Some(ttl) => conn
					.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
					.await
					.map_err(StorageError::from),
				None => conn.set::<_, _, ()>(key, value).await.map_err(StorageError::from),
			}
		})
		.await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut conn = self.connection();
		bounded("delete", self.timeout, async move {
			conn.del::<_, ()>(key).await.map_err(StorageError::from)
		})
		.await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let mut conn = self.connection();
		bounded("exists", self.timeout, async move {
			conn.exists::<_, bool>(key).await.map_err(StorageError::from)
		})
		.await
	}

	async fn health_check(&self) -> Result<bool, StorageError> {
		let mut conn = self.connection();
		bounded("ping", self.timeout, async move {
			let pong: String = redis::cmd("PING")
				.query_async(&mut conn)
				.await
				.map_err(StorageError::from)?;
			Ok(pong == "PONG")
		})
		.await
	}

	fn name(&self) -> &'static str {
		"redis"
	}
}
