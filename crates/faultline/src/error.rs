// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the agent.

use faultline_core::{Exception, Fault};
use thiserror::Error;

/// Name given to exceptions built from an [`AgentError`].
pub const INTERNAL_ERROR_NAME: &str = "FaultlineAgentError";

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors raised by the agent itself.
///
/// These never reach the host's fault channels as reportable faults: a panic
/// carrying one, or an exception built with [`AgentError::to_exception`], is
/// recognised by the hooks and ignored.
#[derive(Debug, Error)]
pub enum AgentError {
	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Ingestion endpoint answered with a non-2xx status.
	#[error("server error (status {status}): {message}")]
	ServerError { status: u16, message: String },

	/// Failed to serialize a report.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// `init` was called more than once.
	#[error("faultline agent is already initialized")]
	AlreadyInitialized,

	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// The background dispatcher has shut down.
	#[error("dispatcher is not running")]
	WorkerUnavailable,

	/// Failed to start the dispatcher thread or its runtime.
	#[error("runtime error: {0}")]
	Runtime(#[from] std::io::Error),
}

impl AgentError {
	/// Convert into an exception flagged as internal.
	pub fn to_exception(&self) -> Exception {
		Exception::internal(INTERNAL_ERROR_NAME, self.to_string())
	}
}

impl From<faultline_config::ConfigError> for AgentError {
	fn from(error: faultline_config::ConfigError) -> Self {
		AgentError::InvalidConfig(error.to_string())
	}
}

impl From<AgentError> for Fault {
	fn from(error: AgentError) -> Self {
		Fault::from(error.to_exception())
	}
}
