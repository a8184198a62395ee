// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Admin control API for the Floodgate log governance plane.
//!
//! Exposes the governance document over HTTP (`/log-level`) behind bearer
//! keys, an origin allow-list, and the plane's own rate limiter, plus
//! unauthenticated `/health` and `/metrics` endpoints. All mutable state
//! lives in the injected storage backend; the server itself can be
//! restarted or horizontally scaled at will.

pub mod auth;
pub mod config;
pub mod error;
pub mod manager;
pub mod routes;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use floodgate_limiter::RateLimiter;
use floodgate_metrics::MetricsRecorder;
use floodgate_storage::CheckedStorage;

pub use auth::AuthSettings;
pub use config::ServerConfig;
pub use error::ApiError;
pub use manager::ConfigManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
	pub manager: Arc<ConfigManager>,
	pub limiter: RateLimiter,
	pub storage: CheckedStorage,
	pub auth: AuthSettings,
	pub metrics: MetricsRecorder,
}

/// Build the application state from resolved configuration and a selected
/// storage backend.
pub fn create_app_state(
	config: &ServerConfig,
	backend: Arc<dyn floodgate_storage::StorageBackend>,
	metrics: MetricsRecorder,
) -> AppState {
	let storage = CheckedStorage::new(backend, metrics.clone(), config.storage.retries);
	let manager = Arc::new(ConfigManager::new(
		storage.clone(),
		metrics.clone(),
		config.config_cache_ttl,
	));
	let limiter = RateLimiter::new(storage.clone(), config.limiter.clone(), metrics.clone());
	let auth = AuthSettings::new(config.api_keys.clone(), config.allowed_origins.clone());

	AppState {
		manager,
		limiter,
		storage,
		auth,
		metrics,
	}
}

/// Build the router with all routes mounted.
pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route(
			"/log-level",
			get(routes::log_level::read_config)
				.post(routes::log_level::create_config)
				.patch(routes::log_level::patch_config)
				.delete(routes::log_level::reset_config),
		)
		.route("/health", get(routes::health::health_check))
		.route("/metrics", get(routes::health::metrics_snapshot))
		.with_state(state)
}
