// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rate-limit decision type.

use serde::{Deserialize, Serialize};

/// The outcome of a single rate-limit check. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitDecision {
	/// Whether the log record is admitted.
	pub allowed: bool,
	/// Tokens left in the bucket after this check.
	pub tokens_remaining: f64,
	/// Suggested wait before retrying, present only on bucket-exhaustion
	/// denials. Sampling denials carry no hint.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub retry_after_ms: Option<u64>,
}

impl RateLimitDecision {
	/// An admitted check with `tokens_remaining` left over.
	pub fn allowed(tokens_remaining: f64) -> Self {
		Self {
			allowed: true,
			tokens_remaining,
			retry_after_ms: None,
		}
	}

	/// A denial caused by an exhausted bucket.
	pub fn denied(tokens_remaining: f64, retry_after_ms: u64) -> Self {
		Self {
			allowed: false,
			tokens_remaining,
			retry_after_ms: Some(retry_after_ms),
		}
	}

	/// A denial caused by level sampling; retrying cannot help.
	pub fn sampled_out() -> Self {
		Self {
			allowed: false,
			tokens_remaining: 0.0,
			retry_after_ms: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn denied_carries_positive_retry_hint() {
		let decision = RateLimitDecision::denied(0.2, 160);
		assert!(!decision.allowed);
		assert_eq!(decision.retry_after_ms, Some(160));
	}

	#[test]
	fn sampled_out_has_no_retry_hint() {
		let decision = RateLimitDecision::sampled_out();
		assert!(!decision.allowed);
		assert!(decision.retry_after_ms.is_none());
	}

	#[test]
	fn retry_hint_omitted_from_json_when_allowed() {
		let json = serde_json::to_string(&RateLimitDecision::allowed(4.0)).unwrap();
		assert!(!json.contains("retry_after_ms"));
	}
}
