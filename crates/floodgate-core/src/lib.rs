// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Floodgate log governance system.
//!
//! This crate provides the shared types for runtime log governance: the
//! severity level scale, the governance configuration document that operators
//! edit at runtime, patch/merge semantics, field-level validation, and the
//! rate-limit decision type. It is used by the admin server
//! (`floodgate-server`), the rate limiter (`floodgate-limiter`), and any SDK
//! that consults governance state at a log call site.
//!
//! # Overview
//!
//! The governance system supports:
//! - A global minimum severity plus per-service overrides
//! - Per-level token budgets consumed by the rate limiter
//! - A global kill switch (`enabled`)
//! - Monotonic document versioning with last-write-wins persistence
//!
//! # Example
//!
//! ```
//! use floodgate_core::{GovernanceConfig, GovernanceConfigPatch, Level};
//!
//! let config = GovernanceConfig::default();
//! assert_eq!(config.global_level, Level::Info);
//! assert!(config.enabled);
//!
//! let patch = GovernanceConfigPatch {
//!     global_level: Some(Level::Warn),
//!     ..Default::default()
//! };
//! let updated = patch.apply(&config);
//! assert_eq!(updated.global_level, Level::Warn);
//! // Unspecified fields are preserved
//! assert_eq!(updated.rate_limits, config.rate_limits);
//! ```

pub mod config;
pub mod decision;
pub mod error;
pub mod level;
pub mod validate;

pub use config::{diff_changes, GovernanceConfig, GovernanceConfigPatch, GovernanceSummary};
pub use decision::RateLimitDecision;
pub use error::{GovernanceError, Result};
pub use level::Level;
pub use validate::{validate_document, validate_patch, FieldError};
