// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the Faultline agent.
//!
//! Settings are layered from built-in defaults, an optional TOML file and
//! `FAULTLINE_*` environment variables, in that order of precedence. The
//! API key may also be supplied through `FAULTLINE_API_KEY_FILE`.
//!
//! # Usage
//!
//! ```ignore
//! use faultline_config::load_config;
//!
//! let config = load_config()?;
//! println!("reporting project {} to {}", config.project_id, config.api_endpoint);
//! ```

pub mod env;
pub mod error;
pub mod layer;
pub mod secret;
pub mod sources;

pub use env::load_secret_env;
pub use error::ConfigError;
pub use layer::{
	AgentConfigLayer, DEFAULT_DEDUPE_CAPACITY, DEFAULT_REQUEST_TIMEOUT_SECS, MAX_CONTEXT_LINES,
};
pub use secret::{Secret, SecretString};
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

/// Fully resolved agent configuration. Immutable once the agent starts.
#[derive(Debug, Clone)]
pub struct AgentConfig {
	pub project_id: String,
	/// Base URL without a trailing slash.
	pub api_endpoint: String,
	pub api_key: SecretString,
	pub include_context: bool,
	pub context_lines: u32,
	pub request_timeout: Duration,
	pub dedupe_capacity: usize,
	/// How long a crashing panic waits for its report before the previous
	/// hook runs. Zero disables the wait.
	pub crash_flush_timeout: Duration,
}

impl AgentConfig {
	/// Build a configuration from the three required settings, with defaults
	/// for everything else.
	pub fn new(
		project_id: impl Into<String>,
		api_endpoint: impl Into<String>,
		api_key: impl Into<String>,
	) -> Result<Self, ConfigError> {
		AgentConfigLayer {
			project_id: Some(project_id.into()),
			api_endpoint: Some(api_endpoint.into()),
			api_key: Some(SecretString::new(api_key.into())),
			..Default::default()
		}
		.finalize()
	}

	pub fn with_include_context(mut self, include: bool) -> Self {
		self.include_context = include;
		self
	}

	pub fn with_context_lines(mut self, lines: u32) -> Self {
		self.context_lines = lines.min(MAX_CONTEXT_LINES);
		self
	}

	pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;
		self
	}

	pub fn with_crash_flush_timeout(mut self, timeout: Duration) -> Self {
		self.crash_flush_timeout = timeout;
		self
	}
}

/// Load configuration from all sources with proper precedence.
pub fn load_config() -> Result<AgentConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only.
pub fn load_config_from_env() -> Result<AgentConfig, ConfigError> {
	let mut merged = AgentConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<AgentConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<AgentConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = AgentConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

fn finalize(layer: AgentConfigLayer) -> Result<AgentConfig, ConfigError> {
	let config = layer.finalize()?;
	info!(
		project_id = %config.project_id,
		api_endpoint = %config.api_endpoint,
		include_context = config.include_context,
		context_lines = config.context_lines,
		"agent configuration loaded"
	);
	Ok(config)
}
