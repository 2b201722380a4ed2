// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The agent service and its process-wide instance.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use faultline_config::AgentConfig;
use faultline_core::{Exception, Fault, FaultId, RequestMeta};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::{AgentError, Result};
use crate::hooks::{self, FaultSink, HookChannel, HookInstaller, HostChannels};
use crate::pipeline::{Pipeline, ReportOutcome};
use crate::transport::{HttpTransport, Transport};
use crate::worker::{on_dispatcher_thread, Dispatcher};

static AGENT: OnceLock<Agent> = OnceLock::new();

/// Initialise the process-wide agent and install the global hooks.
///
/// Fails with [`AgentError::AlreadyInitialized`] on every call after the
/// first successful one.
pub fn init(config: AgentConfig) -> Result<&'static Agent> {
	if AGENT.get().is_some() {
		return Err(AgentError::AlreadyInitialized);
	}

	let agent = Agent::new(config)?;
	AGENT
		.set(agent)
		.map_err(|_| AgentError::AlreadyInitialized)?;
	let agent = AGENT.get().ok_or(AgentError::AlreadyInitialized)?;
	agent.install_global_hooks();
	Ok(agent)
}

/// The process-wide agent, if [`init`] has run.
pub fn agent() -> Option<&'static Agent> {
	AGENT.get()
}

struct AgentInner {
	config: AgentConfig,
	pipeline: Arc<Pipeline>,
	dispatcher: Dispatcher,
}

impl AgentInner {
	/// Entry point for faults arriving through the hooks.
	fn report_unhandled(&self, fault: Fault, channel: HookChannel) {
		// A fault raised while delivering a report must not be reported.
		if on_dispatcher_thread() {
			debug!("ignoring fault raised on the dispatcher thread");
			return;
		}

		if let Some(outcome) = self.pipeline.screen(&fault) {
			debug!(?outcome, ?channel, "hook fault not queued");
			return;
		}

		if let Err(e) = self.dispatcher.submit(fault, false, None, None) {
			warn!(error = %e, ?channel, "dropping unhandled fault");
			return;
		}

		let timeout = self.config.crash_flush_timeout;
		if channel == HookChannel::Uncaught
			&& !timeout.is_zero()
			&& !self.dispatcher.flush(timeout)
		{
			warn!(timeout_ms = timeout.as_millis() as u64, "crash report still in flight");
		}
	}
}

/// Hook sink holding only a weak reference, so installed hooks never keep a
/// dropped agent or its dispatcher alive.
fn hook_sink(inner: &Arc<AgentInner>) -> FaultSink {
	let inner = Arc::downgrade(inner);
	Arc::new(move |fault: Fault, channel: HookChannel| {
		if let Some(inner) = inner.upgrade() {
			inner.report_unhandled(fault, channel);
		}
	})
}

/// The fault telemetry agent.
///
/// Owns the pipeline, its background dispatcher and the hook installer.
/// Construct one with [`Agent::new`], or use [`init`] for the process-wide
/// instance.
pub struct Agent {
	inner: Arc<AgentInner>,
	sink: FaultSink,
	installer: HookInstaller,
}

impl Agent {
	/// Build an agent delivering over HTTP.
	pub fn new(config: AgentConfig) -> Result<Self> {
		let transport = Arc::new(HttpTransport::new(&config)?);
		Self::with_transport(config, transport)
	}

	/// Build an agent with a custom transport.
	pub fn with_transport(config: AgentConfig, transport: Arc<dyn Transport>) -> Result<Self> {
		let pipeline = Arc::new(Pipeline::new(&config, transport));
		let dispatcher = Dispatcher::start(pipeline.clone())?;

		info!(
			project_id = %config.project_id,
			api_endpoint = %config.api_endpoint,
			"faultline agent started"
		);

		let inner = Arc::new(AgentInner {
			config,
			pipeline,
			dispatcher,
		});
		Ok(Self {
			sink: hook_sink(&inner),
			inner,
			installer: HookInstaller::new(),
		})
	}

	pub fn config(&self) -> &AgentConfig {
		&self.inner.config
	}

	/// Whether the identity has already been claimed for reporting.
	pub fn is_reported(&self, id: FaultId) -> bool {
		self.inner.pipeline.registry().has(id)
	}

	/// Install the panic hook and the process rejection listener.
	///
	/// The process channels are registered once per process. Returns true only
	/// for that call; an install from any agent afterwards routes the existing
	/// handlers to this agent instead.
	pub fn install_global_hooks(&self) -> bool {
		hooks::install_process_hooks(self.sink.clone())
	}

	/// Install handlers on the given channels. Only the first call registers.
	pub fn install_hooks(&self, channels: &dyn HostChannels) -> bool {
		self.installer.install(channels, self.sink.clone())
	}

	/// Make this agent's handlers no-ops until the next install.
	pub fn uninstall_hooks(&self) -> bool {
		let local = self.installer.release(&self.sink);
		let global = hooks::release_process_hooks(&self.sink);
		local || global
	}

	/// Report a fault and wait for the delivery outcome.
	pub async fn report_fault(
		&self,
		fault: impl Into<Fault>,
		handled: bool,
		request: Option<RequestMeta>,
	) -> Result<ReportOutcome> {
		let fault = fault.into();
		if let Some(outcome) = self.inner.pipeline.screen(&fault) {
			return Ok(outcome);
		}

		let (reply_tx, reply_rx) = oneshot::channel();
		self.inner
			.dispatcher
			.submit(fault, handled, request, Some(reply_tx))?;
		reply_rx.await.map_err(|_| AgentError::WorkerUnavailable)
	}

	/// Report the value of a rejected operation.
	///
	/// Exception-shaped values are reported as exceptions; anything else goes
	/// to the rejections endpoint without deduplication.
	pub async fn report_rejection(
		&self,
		value: impl Into<Fault>,
		handled: bool,
		request: Option<RequestMeta>,
	) -> Result<ReportOutcome> {
		self.report_fault(value, handled, request).await
	}

	/// Report a caught exception without waiting.
	///
	/// The identity is claimed immediately, so the same exception surfacing
	/// later through a hook is not reported again. Returns false if the
	/// exception was not queued.
	pub fn capture_exception(
		&self,
		exception: impl Into<Arc<Exception>>,
		request: Option<RequestMeta>,
	) -> bool {
		let fault = Fault::Exception(exception.into());
		if self.inner.pipeline.screen(&fault).is_some() {
			return false;
		}

		match self.inner.dispatcher.submit(fault, true, request, None) {
			Ok(()) => true,
			Err(e) => {
				warn!(error = %e, "dropping captured exception");
				false
			}
		}
	}

	/// Block until queued reports finish or the timeout elapses.
	pub fn flush(&self, timeout: Duration) -> bool {
		self.inner.dispatcher.flush(timeout)
	}

	/// Deactivate the hooks, drain queued reports and stop the dispatcher.
	pub fn shutdown(&self) {
		self.uninstall_hooks();
		self.inner.dispatcher.shutdown();
		info!("faultline agent stopped");
	}
}

impl Drop for Agent {
	fn drop(&mut self) {
		hooks::release_process_hooks(&self.sink);
	}
}
