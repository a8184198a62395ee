// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Log severity levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Log severity level, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
	Trace,
	Debug,
	Info,
	Warn,
	Error,
	Fatal,
}

impl Level {
	/// All levels in severity order.
	pub const ALL: [Level; 6] = [
		Level::Trace,
		Level::Debug,
		Level::Info,
		Level::Warn,
		Level::Error,
		Level::Fatal,
	];

	/// Numeric severity rank (trace = 0, fatal = 5).
	pub fn rank(self) -> u8 {
		match self {
			Level::Trace => 0,
			Level::Debug => 1,
			Level::Info => 2,
			Level::Warn => 3,
			Level::Error => 4,
			Level::Fatal => 5,
		}
	}

	/// The wire name of this level (lower-case).
	pub fn as_str(self) -> &'static str {
		match self {
			Level::Trace => "trace",
			Level::Debug => "debug",
			Level::Info => "info",
			Level::Warn => "warn",
			Level::Error => "error",
			Level::Fatal => "fatal",
		}
	}
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Level {
	type Err = GovernanceError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"trace" => Ok(Level::Trace),
			"debug" => Ok(Level::Debug),
			"info" => Ok(Level::Info),
			"warn" => Ok(Level::Warn),
			"error" => Ok(Level::Error),
			"fatal" => Ok(Level::Fatal),
			other => Err(GovernanceError::UnknownLevel(other.to_string())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_all_known_levels() {
		for level in Level::ALL {
			assert_eq!(level.as_str().parse::<Level>().unwrap(), level);
		}
	}

	#[test]
	fn rejects_unknown_level() {
		let err = "verbose".parse::<Level>().unwrap_err();
		assert!(err.to_string().contains("verbose"));
	}

	#[test]
	fn severity_ordering() {
		assert!(Level::Trace < Level::Debug);
		assert!(Level::Error < Level::Fatal);
		assert!(Level::Warn > Level::Info);
	}

	#[test]
	fn serializes_lowercase() {
		assert_eq!(serde_json::to_string(&Level::Warn).unwrap(), "\"warn\"");
		let level: Level = serde_json::from_str("\"fatal\"").unwrap();
		assert_eq!(level, Level::Fatal);
	}
}
