// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health and metrics handlers. Unauthenticated: they expose no governance
//! state, only liveness and counters.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

/// GET /health - Storage-backed health check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Storage backend reachable"),
        (status = 503, description = "Storage backend unreachable")
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let result = state.storage.health().await;
	let healthy = result.success && result.data.unwrap_or(false);

	let status = if healthy {
		StatusCode::OK
	} else {
		StatusCode::SERVICE_UNAVAILABLE
	};

	(
		status,
		Json(json!({
			"status": if healthy { "healthy" } else { "unhealthy" },
			"backend": state.storage.backend().name(),
			"timestamp": chrono::Utc::now().to_rfc3339(),
		})),
	)
}

/// GET /metrics - Governance counters snapshot.
#[utoipa::path(
    get,
    path = "/metrics",
    responses(
        (status = 200, description = "Counter snapshot")
    ),
    tag = "health"
)]
pub async fn metrics_snapshot(State(state): State<AppState>) -> impl IntoResponse {
	Json(state.metrics.snapshot())
}
