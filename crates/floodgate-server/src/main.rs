// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Floodgate admin server binary.

use clap::{Parser, Subcommand};
use floodgate_metrics::MetricsRecorder;
use floodgate_server::{create_app_state, create_router, ServerConfig};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Floodgate - admin server for the log governance plane.
#[derive(Parser, Debug)]
#[command(
	name = "floodgate-server",
	about = "Log governance admin server",
	version
)]
struct Args {
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("floodgate-server {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = ServerConfig::load_from_env();

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.log_filter.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	if config.api_keys.is_empty() {
		tracing::warn!("no admin API keys configured; every admin request will be rejected");
	}

	let metrics = MetricsRecorder::initialized();
	let backend = floodgate_storage::select_backend(&config.storage).await;
	tracing::info!(
		host = %config.host,
		port = config.port,
		backend = backend.name(),
		"starting floodgate-server"
	);

	let state = create_app_state(&config, backend, metrics);

	let cors = if config.allowed_origins.is_empty() {
		CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
	} else {
		let origins: Vec<_> = config
			.allowed_origins
			.iter()
			.filter_map(|origin| origin.parse().ok())
			.collect();
		CorsLayer::new()
			.allow_origin(AllowOrigin::list(origins))
			.allow_methods(Any)
			.allow_headers(Any)
	};

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(cors)
		.into_make_service_with_connect_info::<std::net::SocketAddr>();

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);
	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("received shutdown signal");
		}
	}

	tracing::info!("server shutdown complete");
	Ok(())
}
