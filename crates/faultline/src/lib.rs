// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process fault telemetry for Rust services.
//!
//! The agent subscribes to the process's fault channels (the panic hook and
//! an unhandled-rejection channel), enriches each fault with parsed stack
//! frames, source snippets and environment details, reports each exception
//! identity at most once, and posts the result to an ingestion endpoint.
//! Delivery failures are logged and never escalate into new faults.
//!
//! # Example
//!
//! ```ignore
//! use faultline::{AgentConfig, Exception};
//!
//! let agent = faultline::init(faultline_config::load_config()?)?;
//!
//! if let Err(e) = charge_card().await {
//!     agent.capture_exception(Exception::from_error(&e), None);
//! }
//!
//! // Unobserved task errors go to the rejection channel.
//! faultline::spawn_detached(async move {
//!     refresh_cache().await.map_err(|e| Exception::from_error(&e))
//! });
//!
//! agent.flush(std::time::Duration::from_secs(2));
//! ```

pub mod agent;
pub mod dedupe;
pub mod enrich;
pub mod environment;
pub mod error;
pub mod hooks;
pub mod pipeline;
pub mod source;
pub mod transport;
pub mod worker;

pub use agent::{agent, init, Agent};
pub use dedupe::DedupeRegistry;
pub use enrich::Enricher;
pub use error::{AgentError, Result};
pub use hooks::{
	install_process_hooks, notify_unhandled_rejection, rejection_listener_count,
	release_process_hooks, spawn_detached, FaultSink, HookChannel, HookInstaller, HostChannels,
	ProcessChannels, UncaughtFault,
};
pub use pipeline::{Pipeline, ReportOutcome};
pub use source::SourceReader;
pub use transport::{DeliveryStatus, Endpoint, HttpTransport, Reporter, Transport};
pub use worker::{Dispatcher, WorkerCommand};

pub use faultline_config::AgentConfig;
pub use faultline_core::{Exception, Fault, FaultId, RequestMeta};
