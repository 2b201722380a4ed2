// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subscription to the host's fault notification channels.
//!
//! Two channels exist. The uncaught channel is the std panic hook: the
//! agent's handler runs first and the previously installed hook always runs
//! after it, so default panic behaviour (message, unwind or abort, exit) is
//! untouched. The rejection channel carries errors nobody was left to
//! observe, such as the `Err` of a task started with [`spawn_detached`].

use std::backtrace::Backtrace;
use std::future::Future;
use std::panic::{Location, PanicHookInfo};
use std::sync::{Arc, LazyLock, Mutex, RwLock};

use faultline_core::backtrace::render_trace;
use faultline_core::{parse_stack_trace, Exception, Fault};
use tracing::{debug, info};

use crate::error::AgentError;

/// Exception name used for panics carrying a plain message.
pub const PANIC_EXCEPTION_NAME: &str = "panic";

/// An exception that reached the uncaught channel.
#[derive(Debug, Clone)]
pub struct UncaughtFault {
	pub exception: Arc<Exception>,
}

impl UncaughtFault {
	/// Convert a panic into a fault.
	///
	/// `Exception` payloads keep their identity, `AgentError` payloads become
	/// internal exceptions, and message payloads become a new exception named
	/// `panic` with the current backtrace as its stack.
	pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
		let payload = info.payload();
		let location = info.location();

		let exception = if let Some(exception) = payload.downcast_ref::<Arc<Exception>>() {
			with_panic_stack(exception.clone(), location)
		} else if let Some(exception) = payload.downcast_ref::<Exception>() {
			with_panic_stack(Arc::new(exception.clone()), location)
		} else if let Some(error) = payload.downcast_ref::<AgentError>() {
			Arc::new(error.to_exception())
		} else {
			let message = panic_message(info);
			let stack = panic_trace(PANIC_EXCEPTION_NAME, &message, location);
			Arc::new(Exception::new(PANIC_EXCEPTION_NAME, message).with_stack(stack))
		};

		Self { exception }
	}
}

/// Attach the panic backtrace to an exception raised without one.
fn with_panic_stack(
	exception: Arc<Exception>,
	location: Option<&Location<'_>>,
) -> Arc<Exception> {
	if exception.stack().is_some() {
		return exception;
	}
	let stack = panic_trace(exception.name(), exception.message(), location);
	Arc::new((*exception).clone().with_stack(stack))
}

fn panic_trace(name: &str, message: &str, location: Option<&Location<'_>>) -> String {
	let trace = render_trace(name, message, &Backtrace::force_capture());
	let location = location.map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
	with_location_fallback(trace, location.as_deref())
}

/// Append the panic site as a frame when the backtrace has no resolvable
/// location, e.g. in a binary built without debug info.
fn with_location_fallback(trace: String, location: Option<&str>) -> String {
	let resolved =
		parse_stack_trace(Some(trace.as_str())).is_some_and(|frames| !frames.is_empty());
	match location {
		Some(location) if !resolved => format!("{trace}\n             at {location}"),
		_ => trace,
	}
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
	if let Some(s) = info.payload().downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = info.payload().downcast_ref::<String>() {
		s.clone()
	} else {
		"Box<dyn Any>".to_string()
	}
}

pub type UncaughtHandler = Box<dyn Fn(UncaughtFault) + Send + Sync>;
pub type RejectionHandler = Box<dyn Fn(Fault) + Send + Sync>;

/// The host's fault notification channels.
pub trait HostChannels: Send + Sync {
	fn on_uncaught(&self, handler: UncaughtHandler);
	fn on_unhandled_rejection(&self, handler: RejectionHandler);
}

/// The channel a fault arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookChannel {
	Uncaught,
	Rejection,
}

/// Receives faults from installed hooks. Hook faults are always unhandled.
pub type FaultSink = Arc<dyn Fn(Fault, HookChannel) + Send + Sync>;

type SinkSlot = Arc<RwLock<Option<FaultSink>>>;

/// Installs one handler per channel exactly once and routes what they
/// receive to the current sink.
///
/// Registration happens on the first [`install`](Self::install) only. Later
/// calls swap the sink the registered handlers forward to, so the channels
/// never carry more than one handler from the same installer.
#[derive(Default)]
pub struct HookInstaller {
	registered: Mutex<bool>,
	target: SinkSlot,
}

impl HookInstaller {
	pub fn new() -> Self {
		Self::default()
	}

	/// Route hook faults to `sink`, registering the handlers if no call has
	/// done so yet. Returns true only for the call that performed the
	/// registration.
	pub fn install(&self, channels: &dyn HostChannels, sink: FaultSink) -> bool {
		let mut registered = self
			.registered
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner());

		let previous = self
			.target
			.write()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.replace(sink.clone());

		if *registered {
			match previous {
				Some(previous) if Arc::ptr_eq(&previous, &sink) => {}
				Some(_) => info!("fault hooks retargeted"),
				None => info!("fault hooks reactivated"),
			}
			return false;
		}
		*registered = true;

		let target = self.target.clone();
		channels.on_uncaught(Box::new(move |fault: UncaughtFault| {
			let Some(sink) = current_sink(&target) else {
				return;
			};
			if fault.exception.is_internal() {
				debug!(
					message = fault.exception.message(),
					"ignoring panic raised by the agent"
				);
				return;
			}
			sink(Fault::Exception(fault.exception), HookChannel::Uncaught);
		}));

		let target = self.target.clone();
		channels.on_unhandled_rejection(Box::new(move |fault: Fault| {
			let Some(sink) = current_sink(&target) else {
				return;
			};
			if fault.is_internal() {
				debug!("ignoring rejection raised by the agent");
				return;
			}
			sink(fault, HookChannel::Rejection);
		}));

		info!("fault hooks installed");
		true
	}

	/// Turn the registered handlers into no-ops. Returns true if they were
	/// active.
	pub fn uninstall(&self) -> bool {
		let was_active = self
			.target
			.write()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.take()
			.is_some();
		if was_active {
			info!("fault hooks deactivated");
		}
		was_active
	}

	/// Like [`uninstall`](Self::uninstall), but only while `sink` is the
	/// current target.
	pub fn release(&self, sink: &FaultSink) -> bool {
		let mut target = self
			.target
			.write()
			.unwrap_or_else(|poisoned| poisoned.into_inner());
		if !target.as_ref().is_some_and(|current| Arc::ptr_eq(current, sink)) {
			return false;
		}
		*target = None;
		info!("fault hooks deactivated");
		true
	}

	pub fn is_active(&self) -> bool {
		self.target
			.read()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.is_some()
	}
}

fn current_sink(target: &SinkSlot) -> Option<FaultSink> {
	target
		.read()
		.unwrap_or_else(|poisoned| poisoned.into_inner())
		.clone()
}

static REJECTION_LISTENERS: RwLock<Vec<RejectionHandler>> = RwLock::new(Vec::new());

/// The single installer owning the process channels. Every agent installing
/// global hooks goes through it, so the panic hook chain and the rejection
/// listener list gain at most one handler per process.
static PROCESS_HOOKS: LazyLock<HookInstaller> = LazyLock::new(HookInstaller::new);

/// The real process channels: the std panic hook and the process-wide
/// rejection listener list.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessChannels;

impl HostChannels for ProcessChannels {
	fn on_uncaught(&self, handler: UncaughtHandler) {
		let previous = std::panic::take_hook();
		std::panic::set_hook(Box::new(move |info| {
			handler(UncaughtFault::from_panic(info));
			previous(info);
		}));
	}

	fn on_unhandled_rejection(&self, handler: RejectionHandler) {
		REJECTION_LISTENERS
			.write()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.push(handler);
	}
}

/// Route the process channels to `sink`. Returns true only for the first
/// call in the process; later calls retarget the existing handlers.
pub fn install_process_hooks(sink: FaultSink) -> bool {
	PROCESS_HOOKS.install(&ProcessChannels, sink)
}

/// Silence the process handlers if `sink` is the one they route to.
pub fn release_process_hooks(sink: &FaultSink) -> bool {
	PROCESS_HOOKS.release(sink)
}

/// Number of handlers listening on the process rejection channel.
pub fn rejection_listener_count() -> usize {
	REJECTION_LISTENERS
		.read()
		.unwrap_or_else(|poisoned| poisoned.into_inner())
		.len()
}

/// Deliver a fault to the process rejection channel. Returns the number of
/// listeners notified.
pub fn notify_unhandled_rejection(fault: impl Into<Fault>) -> usize {
	let fault = fault.into();
	let listeners = REJECTION_LISTENERS
		.read()
		.unwrap_or_else(|poisoned| poisoned.into_inner());
	for listener in listeners.iter() {
		listener(fault.clone());
	}
	listeners.len()
}

/// Spawn a task whose error nobody awaits.
///
/// An `Err` is routed to the process rejection channel instead of being
/// dropped silently.
///
/// ```ignore
/// faultline::spawn_detached(async move {
///     sync_inventory().await.map_err(|e| Exception::from_error(&e))
/// });
/// ```
pub fn spawn_detached<F, T, E>(future: F) -> tokio::task::JoinHandle<()>
where
	F: Future<Output = Result<T, E>> + Send + 'static,
	T: Send + 'static,
	E: Into<Fault> + Send + 'static,
{
	tokio::spawn(async move {
		if let Err(e) = future.await {
			let notified = notify_unhandled_rejection(e);
			if notified == 0 {
				debug!("unhandled rejection with no listeners");
			}
		}
	})
}
