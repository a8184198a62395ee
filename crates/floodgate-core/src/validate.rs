// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Field-level validation of governance documents.
//!
//! Validation runs on the raw JSON body before anything is deserialized or
//! persisted, so a rejected request never touches storage. POST validates a
//! full document (missing scalars fall back to defaults on merge, so only
//! present fields are checked); PATCH validates the same rules over the
//! partial body.

use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::level::Level;

/// A single validation failure tied to a document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
	/// Dotted path of the offending field, e.g. `service_levels.billing`.
	pub field: String,
	/// Human-readable description of the violation.
	pub message: String,
}

impl FieldError {
	fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			message: message.into(),
		}
	}
}

/// Validate a full governance document body (POST).
///
/// Returns an empty vec when the document is acceptable.
pub fn validate_document(body: &Value) -> Vec<FieldError> {
	let mut errors = Vec::new();

	let Some(obj) = body.as_object() else {
		errors.push(FieldError::new("", "request body must be a JSON object"));
		return errors;
	};

	if let Some(value) = obj.get("global_level") {
		check_level("global_level", value, &mut errors);
	}
	if let Some(value) = obj.get("service_levels") {
		check_service_levels(value, &mut errors);
	}
	if let Some(value) = obj.get("rate_limits") {
		check_rate_limits(value, &mut errors);
	}
	if let Some(value) = obj.get("enabled") {
		if !value.is_boolean() {
			errors.push(FieldError::new("enabled", "must be a boolean"));
		}
	}

	errors
}

/// Validate a partial governance document body (PATCH).
///
/// The rules are identical to [`validate_document`]; both bodies are
/// field-optional on the wire.
pub fn validate_patch(body: &Value) -> Vec<FieldError> {
	validate_document(body)
}

fn check_level(field: &str, value: &Value, errors: &mut Vec<FieldError>) {
	match value.as_str() {
		Some(s) if Level::from_str(s).is_ok() => {}
		Some(s) => errors.push(FieldError::new(
			field,
			format!("unknown level '{s}' (expected one of trace, debug, info, warn, error, fatal)"),
		)),
		None => errors.push(FieldError::new(field, "must be a level string")),
	}
}

fn check_service_levels(value: &Value, errors: &mut Vec<FieldError>) {
	let Some(map) = value.as_object() else {
		errors.push(FieldError::new(
			"service_levels",
			"must be an object mapping service names to levels",
		));
		return;
	};

	for (service, level) in map {
		check_level(&format!("service_levels.{service}"), level, errors);
	}
}

fn check_rate_limits(value: &Value, errors: &mut Vec<FieldError>) {
	let Some(map) = value.as_object() else {
		errors.push(FieldError::new(
			"rate_limits",
			"must be an object mapping levels to non-negative integers",
		));
		return;
	};

	for (level, budget) in map {
		let field = format!("rate_limits.{level}");
		if Level::from_str(level).is_err() {
			errors.push(FieldError::new(&field, format!("unknown level '{level}'")));
		}
		if !budget.is_u64() {
			errors.push(FieldError::new(&field, "must be a non-negative integer"));
		}
	}
}
