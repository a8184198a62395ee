// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Admin API error taxonomy and response shaping.
//!
//! Every failure surfaces as the uniform envelope
//! `{success: false, error, details?, retry_after?, timestamp}`. Auth and
//! validation failures carry verbatim messages for operators; unexpected
//! internal failures surface a generic message with no detail leakage.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use floodgate_core::FieldError;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the admin API pipeline.
#[derive(Debug, Error)]
pub enum ApiError {
	#[error("Missing authorization header")]
	MissingAuth,

	#[error("Invalid API key")]
	InvalidKey,

	#[error("Origin not allowed")]
	OriginNotAllowed,

	#[error("Rate limit exceeded")]
	RateLimited { retry_after_secs: u64 },

	#[error("Invalid JSON in request body")]
	InvalidJson,

	#[error("Configuration validation failed")]
	Validation(Vec<FieldError>),

	#[error("Failed to persist configuration")]
	Storage(String),

	#[error("Internal server error")]
	Internal,
}

impl ApiError {
	pub fn status(&self) -> StatusCode {
		match self {
			ApiError::MissingAuth | ApiError::InvalidKey | ApiError::OriginNotAllowed => {
				StatusCode::UNAUTHORIZED
			}
			ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
			ApiError::InvalidJson | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
			ApiError::Storage(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status();
		let mut body = json!({
			"success": false,
			"error": self.to_string(),
			"timestamp": chrono::Utc::now().to_rfc3339(),
		});

		match &self {
			ApiError::Validation(errors) => {
				body["details"] = json!({ "errors": errors });
			}
			ApiError::RateLimited { retry_after_secs } => {
				body["retry_after"] = json!(retry_after_secs);
			}
			// The storage detail goes to logs, not the caller.
			_ => {}
		}

		if let ApiError::Storage(detail) = &self {
			tracing::error!(detail = %detail, "configuration write could not be confirmed");
		}

		let mut response = (status, Json(body)).into_response();
		if let ApiError::RateLimited { retry_after_secs } = self {
			if let Ok(value) = retry_after_secs.to_string().parse() {
				response.headers_mut().insert(header::RETRY_AFTER, value);
			}
		}
		response
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn statuses_match_taxonomy() {
		assert_eq!(ApiError::MissingAuth.status(), StatusCode::UNAUTHORIZED);
		assert_eq!(ApiError::OriginNotAllowed.status(), StatusCode::UNAUTHORIZED);
		assert_eq!(
			ApiError::RateLimited { retry_after_secs: 2 }.status(),
			StatusCode::TOO_MANY_REQUESTS
		);
		assert_eq!(ApiError::InvalidJson.status(), StatusCode::BAD_REQUEST);
		assert_eq!(
			ApiError::Storage("boom".to_string()).status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}

	#[test]
	fn error_messages_are_verbatim() {
		assert_eq!(ApiError::MissingAuth.to_string(), "Missing authorization header");
		assert_eq!(ApiError::InvalidKey.to_string(), "Invalid API key");
		assert_eq!(ApiError::OriginNotAllowed.to_string(), "Origin not allowed");
		assert_eq!(
			ApiError::Validation(vec![]).to_string(),
			"Configuration validation failed"
		);
		assert_eq!(
			ApiError::InvalidJson.to_string(),
			"Invalid JSON in request body"
		);
	}
}
