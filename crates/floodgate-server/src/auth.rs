// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Admin request authorization and client identity.
//!
//! The admin surface authenticates with static bearer keys and gates
//! browser callers with an origin allow-list. Clients are told apart for
//! rate limiting by the first `X-Forwarded-For` hop (falling back to the
//! socket address) combined with a hash of the `User-Agent`, so two tools
//! behind one NAT still get independent budgets.

use std::collections::HashSet;
use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use http::header::{AUTHORIZATION, ORIGIN, USER_AGENT};
use http::request::Parts;
use http::HeaderMap;
use sha2::{Digest, Sha256};

use crate::error::ApiError;

/// Static auth configuration resolved at startup.
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
	api_keys: HashSet<String>,
	allowed_origins: HashSet<String>,
}

impl AuthSettings {
	pub fn new(api_keys: Vec<String>, allowed_origins: Vec<String>) -> Self {
		Self {
			api_keys: api_keys.into_iter().collect(),
			allowed_origins: allowed_origins.into_iter().collect(),
		}
	}

	/// Step 1 of the pipeline: bearer key check.
	pub fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
		let header = headers
			.get(AUTHORIZATION)
			.and_then(|v| v.to_str().ok())
			.ok_or(ApiError::MissingAuth)?;

		let key = header.strip_prefix("Bearer ").unwrap_or(header);
		if self.api_keys.contains(key) {
			Ok(())
		} else {
			Err(ApiError::InvalidKey)
		}
	}

	/// Step 2: origin allow-list, applied only when an `Origin` header is
	/// present (non-browser callers send none).
	pub fn check_origin(&self, headers: &HeaderMap) -> Result<(), ApiError> {
		let Some(origin) = headers.get(ORIGIN).and_then(|v| v.to_str().ok()) else {
			return Ok(());
		};
		if self.allowed_origins.contains(origin) {
			Ok(())
		} else {
			Err(ApiError::OriginNotAllowed)
		}
	}

	/// Configured origins, for building the CORS layer.
	pub fn allowed_origins(&self) -> impl Iterator<Item = &str> {
		self.allowed_origins.iter().map(String::as_str)
	}
}

/// Peer socket address, when the server was started with
/// `into_make_service_with_connect_info`. Absent in router-level tests.
pub struct Peer(pub Option<SocketAddr>);

impl<S> FromRequestParts<S> for Peer
where
	S: Send + Sync,
{
	type Rejection = Infallible;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
		Ok(Self(
			parts
				.extensions
				.get::<ConnectInfo<SocketAddr>>()
				.map(|ConnectInfo(addr)| *addr),
		))
	}
}

/// Rate-limit identity for an admin caller: `ip` plus a short
/// `User-Agent` fingerprint.
pub fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
	let ip = headers
		.get("x-forwarded-for")
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.split(',').next())
		.map(|v| v.trim().to_string())
		.or_else(|| peer.map(|addr| addr.ip().to_string()))
		.unwrap_or_else(|| "unknown".to_string());

	let user_agent = headers
		.get(USER_AGENT)
		.and_then(|v| v.to_str().ok())
		.unwrap_or("");

	let digest = Sha256::digest(user_agent.as_bytes());
	let fingerprint = hex::encode(&digest[..8]);

	format!("{ip}#{fingerprint}")
}

#[cfg(test)]
mod tests {
	use super::*;
	use http::HeaderValue;

	fn settings() -> AuthSettings {
		AuthSettings::new(
			vec!["key-one".to_string(), "key-two".to_string()],
			vec!["https://ops.example.com".to_string()],
		)
	}

	fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
		let mut map = HeaderMap::new();
		for (name, value) in pairs {
			map.insert(
				http::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
				HeaderValue::from_str(value).unwrap(),
			);
		}
		map
	}

	#[test]
	fn missing_header_is_distinct_from_bad_key() {
		let auth = settings();
		assert!(matches!(
			auth.authorize(&HeaderMap::new()),
			Err(ApiError::MissingAuth)
		));
		assert!(matches!(
			auth.authorize(&headers(&[("authorization", "Bearer nope")])),
			Err(ApiError::InvalidKey)
		));
	}

	#[test]
	fn bearer_prefix_is_optional() {
		let auth = settings();
		assert!(auth.authorize(&headers(&[("authorization", "Bearer key-one")])).is_ok());
		assert!(auth.authorize(&headers(&[("authorization", "key-two")])).is_ok());
	}

	#[test]
	fn origin_checked_only_when_present() {
		let auth = settings();
		assert!(auth.check_origin(&HeaderMap::new()).is_ok());
		assert!(auth
			.check_origin(&headers(&[("origin", "https://ops.example.com")]))
			.is_ok());
		assert!(matches!(
			auth.check_origin(&headers(&[("origin", "https://evil.example.com")])),
			Err(ApiError::OriginNotAllowed)
		));
	}

	#[test]
	fn user_agent_distinguishes_clients_behind_one_ip() {
		let a = client_id(
			&headers(&[("x-forwarded-for", "10.0.0.1"), ("user-agent", "curl/8")]),
			None,
		);
		let b = client_id(
			&headers(&[("x-forwarded-for", "10.0.0.1"), ("user-agent", "httpie/3")]),
			None,
		);
		assert_ne!(a, b);
		assert!(a.starts_with("10.0.0.1#"));
	}

	#[test]
	fn forwarded_for_takes_first_hop() {
		let id = client_id(
			&headers(&[("x-forwarded-for", "10.0.0.1, 172.16.0.9")]),
			Some("127.0.0.1:9999".parse().unwrap()),
		);
		assert!(id.starts_with("10.0.0.1#"));
	}

	#[test]
	fn falls_back_to_peer_address() {
		let id = client_id(&HeaderMap::new(), Some("192.168.1.7:1234".parse().unwrap()));
		assert!(id.starts_with("192.168.1.7#"));
	}
}
