// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage error taxonomy.

use thiserror::Error;

/// Errors surfaced by storage backends.
///
/// Timeouts and connection failures are transient: callers apply their own
/// fallback policy (fail-open admission, last-known-good config) instead of
/// propagating these to end users.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("storage operation '{operation}' timed out")]
	Timeout { operation: &'static str },

	#[error("storage connection failed: {0}")]
	Connection(String),

	#[error("storage backend error: {0}")]
	Backend(String),

	#[error("invalid storage configuration: {0}")]
	InvalidConfig(String),
}

impl StorageError {
	/// Whether retrying the operation could plausibly succeed.
	pub fn is_transient(&self) -> bool {
		matches!(self, StorageError::Timeout { .. } | StorageError::Connection(_))
	}
}

impl From<redis::RedisError> for StorageError {
	fn from(err: redis::RedisError) -> Self {
		if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
			StorageError::Connection(err.to_string())
		} else {
			StorageError::Backend(err.to_string())
		}
	}
}

impl From<reqwest::Error> for StorageError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_timeout() {
			StorageError::Timeout { operation: "http" }
		} else if err.is_connect() {
			StorageError::Connection(err.to_string())
		} else {
			StorageError::Backend(err.to_string())
		}
	}
}
