// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Admin endpoints for the governance document.
//!
//! All four methods share one pipeline, short-circuiting at the first
//! failure: bearer-key auth, origin allow-list, self rate limiting, body
//! validation (POST/PATCH only), then delegation to the config manager.
//!
//! - GET /log-level - read the current document (`?summary=true` condenses)
//! - POST /log-level - full create/replace
//! - PATCH /log-level - partial update, response lists the changed fields
//! - DELETE /log-level - reset to the default document
//!
//! # Security
//!
//! All endpoints require an allow-listed bearer key. Clients are rate
//! limited independently by IP + User-Agent fingerprint.

use std::net::SocketAddr;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::IntoParams;

use crate::auth::Peer;
use crate::config::ADMIN_ENDPOINT;
use crate::error::ApiError;
use crate::AppState;

/// Query parameters for reading the document.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReadParams {
	/// Return a condensed summary alongside the document.
	#[serde(default)]
	pub summary: bool,
}

/// Run the shared admin pipeline: auth, origin, self rate limit.
async fn gate(
	state: &AppState,
	headers: &HeaderMap,
	peer: Option<SocketAddr>,
) -> Result<(), ApiError> {
	state.metrics.record_admin_api_call();

	state.auth.authorize(headers)?;
	state.auth.check_origin(headers)?;

	let client = crate::auth::client_id(headers, peer);
	let config = state.manager.fetch().await;
	let decision = state
		.limiter
		.check(&config, &client, ADMIN_ENDPOINT, floodgate_core::Level::Info)
		.await;
	if !decision.allowed {
		let retry_after_secs = decision.retry_after_ms.map(|ms| ms.div_ceil(1000)).unwrap_or(1);
		return Err(ApiError::RateLimited { retry_after_secs });
	}
	Ok(())
}

fn fail(state: &AppState, error: ApiError) -> Response {
	state.metrics.record_admin_api_error();
	error.into_response()
}

fn parse_body(body: &str) -> Result<Value, ApiError> {
	let value: Value = serde_json::from_str(body).map_err(|_| ApiError::InvalidJson)?;
	if value.is_object() {
		Ok(value)
	} else {
		Err(ApiError::InvalidJson)
	}
}

fn success(data: Value) -> Response {
	(
		StatusCode::OK,
		Json(json!({
			"success": true,
			"data": data,
			"timestamp": Utc::now().to_rfc3339(),
		})),
	)
		.into_response()
}

/// GET /log-level - Read the current governance document.
#[utoipa::path(
    get,
    path = "/log-level",
    params(ReadParams),
    responses(
        (status = 200, description = "Current governance document"),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 429, description = "Admin rate limit exceeded")
    ),
    tag = "log-level"
)]
pub async fn read_config(
	State(state): State<AppState>,
	Peer(peer): Peer,
	Query(params): Query<ReadParams>,
	headers: HeaderMap,
) -> Response {
	if let Err(e) = gate(&state, &headers, peer).await {
		return fail(&state, e);
	}

	let config = state.manager.fetch().await;
	let mut data = json!({ "config": config });
	if params.summary {
		data["summary"] = json!(config.summary());
	}
	success(data)
}

/// POST /log-level - Create or fully replace the governance document.
#[utoipa::path(
    post,
    path = "/log-level",
    responses(
        (status = 200, description = "Document created"),
        (status = 400, description = "Malformed JSON or validation failure"),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 429, description = "Admin rate limit exceeded"),
        (status = 500, description = "Write could not be confirmed")
    ),
    tag = "log-level"
)]
pub async fn create_config(
	State(state): State<AppState>,
	Peer(peer): Peer,
	headers: HeaderMap,
	body: String,
) -> Response {
	if let Err(e) = gate(&state, &headers, peer).await {
		return fail(&state, e);
	}

	let document = match parse_body(&body) {
		Ok(value) => value,
		Err(e) => return fail(&state, e),
	};

	match state.manager.create(&document).await {
		Ok(config) => {
			tracing::info!(version = config.version, "governance document replaced");
			success(json!({ "config": config }))
		}
		Err(e) => fail(&state, e),
	}
}

/// PATCH /log-level - Partially update the governance document.
#[utoipa::path(
    patch,
    path = "/log-level",
    responses(
        (status = 200, description = "Document updated; response lists changed fields"),
        (status = 400, description = "Malformed JSON or validation failure"),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 429, description = "Admin rate limit exceeded"),
        (status = 500, description = "Write could not be confirmed")
    ),
    tag = "log-level"
)]
pub async fn patch_config(
	State(state): State<AppState>,
	Peer(peer): Peer,
	headers: HeaderMap,
	body: String,
) -> Response {
	if let Err(e) = gate(&state, &headers, peer).await {
		return fail(&state, e);
	}

	let partial = match parse_body(&body) {
		Ok(value) => value,
		Err(e) => return fail(&state, e),
	};

	match state.manager.patch(&partial).await {
		Ok((config, changes)) => {
			tracing::info!(
				version = config.version,
				changed = changes.len(),
				"governance document patched"
			);
			success(json!({ "config": config, "changes": changes }))
		}
		Err(e) => fail(&state, e),
	}
}

/// DELETE /log-level - Reset to the default governance document.
#[utoipa::path(
    delete,
    path = "/log-level",
    responses(
        (status = 200, description = "Document reset to defaults"),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 429, description = "Admin rate limit exceeded"),
        (status = 500, description = "Write could not be confirmed")
    ),
    tag = "log-level"
)]
pub async fn reset_config(
	State(state): State<AppState>,
	Peer(peer): Peer,
	headers: HeaderMap,
) -> Response {
	if let Err(e) = gate(&state, &headers, peer).await {
		return fail(&state, e);
	}

	match state.manager.reset().await {
		Ok(config) => {
			tracing::info!(version = config.version, "governance document reset");
			success(json!({ "config": config }))
		}
		Err(e) => fail(&state, e),
	}
}
