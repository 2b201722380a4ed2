// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use std::time::Duration;

use faultline_core::DEFAULT_CONTEXT_LINES;
use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;
use crate::secret::SecretString;
use crate::AgentConfig;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DEDUPE_CAPACITY: usize = 1024;
pub const MAX_CONTEXT_LINES: u32 = 50;

/// Agent configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfigLayer {
	#[serde(default)]
	pub project_id: Option<String>,
	#[serde(default)]
	pub api_endpoint: Option<String>,
	#[serde(default)]
	pub api_key: Option<SecretString>,
	#[serde(default)]
	pub include_context: Option<bool>,
	#[serde(default)]
	pub context_lines: Option<u32>,
	#[serde(default)]
	pub request_timeout_secs: Option<u64>,
	#[serde(default)]
	pub dedupe_capacity: Option<usize>,
	#[serde(default)]
	pub crash_flush_timeout_ms: Option<u64>,
}

impl AgentConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: AgentConfigLayer) {
		merge_value(&mut self.project_id, other.project_id);
		merge_value(&mut self.api_endpoint, other.api_endpoint);
		merge_value(&mut self.api_key, other.api_key);
		merge_value(&mut self.include_context, other.include_context);
		merge_value(&mut self.context_lines, other.context_lines);
		merge_value(&mut self.request_timeout_secs, other.request_timeout_secs);
		merge_value(&mut self.dedupe_capacity, other.dedupe_capacity);
		merge_value(&mut self.crash_flush_timeout_ms, other.crash_flush_timeout_ms);
	}

	/// Apply defaults and validate into the runtime configuration.
	pub fn finalize(self) -> Result<AgentConfig, ConfigError> {
		let project_id = self
			.project_id
			.map(|s| s.trim().to_string())
			.filter(|s| !s.is_empty())
			.ok_or(ConfigError::Missing("project_id"))?;

		let api_endpoint = normalize_endpoint(
			self.api_endpoint
				.as_deref()
				.ok_or(ConfigError::Missing("api_endpoint"))?,
		)?;

		let api_key = self
			.api_key
			.filter(|key| !key.expose().trim().is_empty())
			.ok_or(ConfigError::Missing("api_key"))?;

		let context_lines = self.context_lines.unwrap_or(DEFAULT_CONTEXT_LINES);
		if context_lines > MAX_CONTEXT_LINES {
			return Err(ConfigError::Validation(format!(
				"context_lines must be at most {MAX_CONTEXT_LINES}, got {context_lines}"
			)));
		}

		let request_timeout_secs = self
			.request_timeout_secs
			.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
		if request_timeout_secs == 0 {
			return Err(ConfigError::Validation(
				"request_timeout_secs must be greater than zero".to_string(),
			));
		}

		let dedupe_capacity = self.dedupe_capacity.unwrap_or(DEFAULT_DEDUPE_CAPACITY);
		if dedupe_capacity == 0 {
			return Err(ConfigError::Validation(
				"dedupe_capacity must be at least 1".to_string(),
			));
		}

		Ok(AgentConfig {
			project_id,
			api_endpoint,
			api_key,
			include_context: self.include_context.unwrap_or(true),
			context_lines,
			request_timeout: Duration::from_secs(request_timeout_secs),
			dedupe_capacity,
			crash_flush_timeout: Duration::from_millis(self.crash_flush_timeout_ms.unwrap_or(0)),
		})
	}
}

fn merge_value<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}

/// Check that the endpoint is an http(s) URL and strip trailing slashes.
fn normalize_endpoint(raw: &str) -> Result<String, ConfigError> {
	let trimmed = raw.trim();
	let url = Url::parse(trimmed).map_err(|e| ConfigError::InvalidValue {
		key: "api_endpoint".to_string(),
		message: e.to_string(),
	})?;

	if !matches!(url.scheme(), "http" | "https") {
		return Err(ConfigError::InvalidValue {
			key: "api_endpoint".to_string(),
			message: format!("unsupported scheme '{}'", url.scheme()),
		});
	}

	Ok(trimmed.trim_end_matches('/').to_string())
}
