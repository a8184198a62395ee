// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Pluggable key-value storage for the log governance plane.
//!
//! Rate-limit buckets and the governance document live behind the
//! [`StorageBackend`] trait so that call sites in ephemeral environments
//! (serverless functions, edge workers, browsers talking through a proxy)
//! never depend on local process memory. Three backends are provided:
//!
//! - [`MemoryBackend`] - in-process map with real TTL expiry; the default
//!   and the fallback when other backends are misconfigured
//! - [`RedisStore`] - shared state via Redis with native key expiry
//! - [`EdgeKvStore`] - a read-optimized REST edge KV namespace
//!
//! Backend selection happens once at startup via [`select_backend`]:
//! a Redis connection URL wins, then edge-KV credentials, then memory.
//! Structurally invalid settings degrade to memory rather than failing
//! startup.
//!
//! Every operation is bounded by a configurable timeout; a timed-out call
//! surfaces as [`StorageError::Timeout`], never a hang. Callers that prefer
//! result-shaped outcomes over `?` propagation (the rate limiter, the config
//! manager) wrap the backend in [`CheckedStorage`], which also feeds the
//! storage counters on a shared [`MetricsRecorder`](floodgate_metrics::MetricsRecorder).

pub mod backend;
pub mod checked;
pub mod edge_kv;
pub mod error;
pub mod memory;
pub mod redis_store;
pub mod select;

pub use backend::StorageBackend;
pub use checked::{CheckedStorage, OpResult};
pub use edge_kv::{EdgeKvSettings, EdgeKvStore};
pub use error::StorageError;
pub use memory::MemoryBackend;
pub use redis_store::RedisStore;
pub use select::{select_backend, StorageConfig};
