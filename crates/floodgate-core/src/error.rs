// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for governance operations.

use thiserror::Error;

use crate::validate::FieldError;

/// Errors produced by governance document operations.
#[derive(Debug, Error)]
pub enum GovernanceError {
	#[error("unknown log level: {0}")]
	UnknownLevel(String),

	#[error("configuration validation failed: {} error(s)", .0.len())]
	Validation(Vec<FieldError>),

	#[error("malformed governance document: {0}")]
	Malformed(#[from] serde_json::Error),
}

impl GovernanceError {
	/// The field-level errors behind a validation failure, if any.
	pub fn field_errors(&self) -> &[FieldError] {
		match self {
			GovernanceError::Validation(errors) => errors,
			_ => &[],
		}
	}
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
