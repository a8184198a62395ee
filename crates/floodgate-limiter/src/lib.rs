// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage-backed token bucket rate limiter.
//!
//! Admission decisions are keyed by `(client_id, endpoint)` and the bucket
//! state lives in the shared storage backend, so decisions survive across
//! ephemeral invocations and are (approximately) shared across horizontally
//! scaled replicas. Concurrent read-modify-write on the same bucket is
//! last-write-wins; slight over-admission under contention is the accepted
//! trade-off for avoiding a distributed lock.
//!
//! A per-level sampling pre-filter runs before any storage traffic: levels
//! sampled at 1.0 always reach the bucket, levels at 0.0 are denied outright
//! (the usual shape is `error`/`fatal` at 1.0 and `debug` well below it).
//!
//! When storage is unavailable the limiter fails open: it returns a
//! well-formed admitted decision against a conservative default bucket and
//! the failure is only visible in metrics and logs. Admission control
//! degrading is preferable to the logging path itself becoming an outage.

pub mod bucket;
pub mod limiter;

pub use bucket::BucketState;
pub use limiter::{EndpointLimit, RateLimiter, RateLimiterSettings};
