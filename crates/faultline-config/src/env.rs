// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment variable helpers.
//!
//! Secrets follow the `VAR` / `VAR_FILE` convention: when `VAR_FILE` is set
//! the secret is read from that path (a single trailing newline is stripped),
//! otherwise `VAR` is used directly.

use std::path::PathBuf;
use std::{env, fs};

use crate::error::ConfigError;
use crate::secret::SecretString;

/// Load a secret from `var` or the file named by `{var}_FILE`.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, ConfigError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path_str) = env::var(&file_var) {
		if path_str.is_empty() {
			return Err(ConfigError::Secret(format!("secret file path in {file_var} is empty")));
		}

		let path = PathBuf::from(&path_str);
		let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead {
			path: path.clone(),
			source: e,
		})?;

		let secret = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(secret)));
	}

	Ok(env_var(var).map(SecretString::new))
}

pub(crate) fn env_var(name: &str) -> Option<String> {
	env::var(name).ok().filter(|s| !s.is_empty())
}

pub(crate) fn env_bool(name: &str) -> Result<Option<bool>, ConfigError> {
	match env_var(name) {
		Some(v) => match v.to_ascii_lowercase().as_str() {
			"true" | "1" | "yes" | "on" => Ok(Some(true)),
			"false" | "0" | "no" | "off" => Ok(Some(false)),
			_ => Err(ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid boolean value '{v}'"),
			}),
		},
		None => Ok(None),
	}
}

pub(crate) fn env_u32(name: &str) -> Result<Option<u32>, ConfigError> {
	env_parsed(name, "u32")
}

pub(crate) fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	env_parsed(name, "u64")
}

pub(crate) fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
	env_parsed(name, "usize")
}

fn env_parsed<T: std::str::FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}
