// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files and environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::env::{env_bool, env_u32, env_u64, env_usize, env_var, load_secret_env};
use crate::error::ConfigError;
use crate::layer::AgentConfigLayer;

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<AgentConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<AgentConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(AgentConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/faultline/agent.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<AgentConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(AgentConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: AgentConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: FAULTLINE_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<AgentConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(AgentConfigLayer {
			project_id: env_var("FAULTLINE_PROJECT_ID"),
			api_endpoint: env_var("FAULTLINE_API_ENDPOINT"),
			api_key: load_secret_env("FAULTLINE_API_KEY")?,
			include_context: env_bool("FAULTLINE_INCLUDE_CONTEXT")?,
			context_lines: env_u32("FAULTLINE_CONTEXT_LINES")?,
			request_timeout_secs: env_u64("FAULTLINE_REQUEST_TIMEOUT_SECS")?,
			dedupe_capacity: env_usize("FAULTLINE_DEDUPE_CAPACITY")?,
			crash_flush_timeout_ms: env_u64("FAULTLINE_CRASH_FLUSH_TIMEOUT_MS")?,
		})
	}
}
