// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Faultline fault-telemetry agent.
//!
//! This crate holds everything the agent needs that does not touch the
//! network, the filesystem or process-global state:
//!
//! - [`Exception`] and [`Fault`], the values flowing through the pipeline
//! - [`parse_stack_trace`], which turns a raw trace string into [`StackFrame`]s
//! - [`slice_window`], which cuts a source snippet around a fault line
//! - the wire payloads ([`ErrorReport`], [`RejectionReport`]) posted to the
//!   ingestion endpoint

pub mod backtrace;
pub mod context;
pub mod fault;
pub mod frame;
pub mod payload;
pub mod request;

pub use context::{slice_window, CodeContext, EnvironmentInfo, DEFAULT_CONTEXT_LINES};
pub use fault::{Exception, Fault};
pub use frame::{parse_stack_trace, StackFrame, MAX_FRAMES};
pub use payload::{timestamp_now, Envelope, ErrorData, ErrorReport, RejectionReport, Report, ReportMeta};
pub use request::{extract_client_ip, RequestMeta, UNKNOWN_IP};

use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Synthetic identity attached to an [`Exception`] when it is created.
///
/// Rust values carry no object identity, so the dedupe registry keys on this
/// instead. Copies are cheap and never keep the exception alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FaultId(pub Uuid);

impl FaultId {
	pub fn new() -> Self {
		Self(Uuid::now_v7())
	}
}

impl Default for FaultId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for FaultId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for FaultId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}
