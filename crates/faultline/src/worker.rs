// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background dispatcher for report delivery.
//!
//! Reports are handed to a dedicated OS thread running a current-thread Tokio
//! runtime, so hooks can enqueue from any context (a panicking thread, a
//! thread with no runtime) without blocking on network I/O. Each report runs
//! as its own task; there is no ordering between faults.

use std::cell::Cell;
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use faultline_core::{Fault, RequestMeta};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{AgentError, Result};
use crate::pipeline::{Pipeline, ReportOutcome};

const THREAD_NAME: &str = "faultline-dispatcher";

thread_local! {
	static ON_DISPATCHER: Cell<bool> = const { Cell::new(false) };
}

/// Returns true when called from the dispatcher thread.
pub fn on_dispatcher_thread() -> bool {
	ON_DISPATCHER.with(Cell::get)
}

/// Command sent to the dispatcher thread.
#[derive(Debug)]
pub enum WorkerCommand {
	/// Enrich and deliver an already screened fault.
	Report {
		fault: Fault,
		handled: bool,
		request: Option<RequestMeta>,
		reply: Option<oneshot::Sender<ReportOutcome>>,
	},
	/// Wait for every in-flight report, then acknowledge.
	Flush(std_mpsc::SyncSender<()>),
	/// Drain in-flight reports and stop.
	Shutdown,
}

pub struct Dispatcher {
	tx: mpsc::UnboundedSender<WorkerCommand>,
	worker: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
	/// Start the dispatcher thread.
	pub fn start(pipeline: Arc<Pipeline>) -> Result<Self> {
		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_all()
			.thread_name(THREAD_NAME)
			.build()?;
		let (tx, rx) = mpsc::unbounded_channel();

		let worker = thread::Builder::new()
			.name(THREAD_NAME.to_string())
			.spawn(move || {
				ON_DISPATCHER.with(|flag| flag.set(true));
				runtime.block_on(run(pipeline, rx));
			})?;

		Ok(Self {
			tx,
			worker: Mutex::new(Some(worker)),
		})
	}

	/// Queue a screened fault for delivery. Never blocks.
	pub fn submit(
		&self,
		fault: Fault,
		handled: bool,
		request: Option<RequestMeta>,
		reply: Option<oneshot::Sender<ReportOutcome>>,
	) -> Result<()> {
		self.tx
			.send(WorkerCommand::Report {
				fault,
				handled,
				request,
				reply,
			})
			.map_err(|_| AgentError::WorkerUnavailable)
	}

	/// Block until every report queued so far has finished, or the timeout
	/// elapses. Returns true if the queue drained in time.
	pub fn flush(&self, timeout: Duration) -> bool {
		if on_dispatcher_thread() {
			warn!("flush called from the dispatcher thread, skipping");
			return false;
		}

		let (done_tx, done_rx) = std_mpsc::sync_channel(1);
		if self.tx.send(WorkerCommand::Flush(done_tx)).is_err() {
			return false;
		}
		done_rx.recv_timeout(timeout).is_ok()
	}

	/// Drain in-flight reports and stop the thread. Later submissions fail
	/// with [`AgentError::WorkerUnavailable`].
	pub fn shutdown(&self) {
		let _ = self.tx.send(WorkerCommand::Shutdown);

		if on_dispatcher_thread() {
			return;
		}

		let handle = self
			.worker
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.take();
		if let Some(handle) = handle {
			if handle.join().is_err() {
				error!("dispatcher thread panicked during shutdown");
			}
		}
	}

	pub fn is_running(&self) -> bool {
		!self.tx.is_closed()
	}
}

impl Drop for Dispatcher {
	fn drop(&mut self) {
		self.shutdown();
	}
}

async fn run(pipeline: Arc<Pipeline>, mut rx: mpsc::UnboundedReceiver<WorkerCommand>) {
	info!("fault dispatcher started");
	let mut in_flight = JoinSet::new();

	loop {
		tokio::select! {
			command = rx.recv() => match command {
				Some(WorkerCommand::Report { fault, handled, request, reply }) => {
					let pipeline = pipeline.clone();
					in_flight.spawn(async move {
						let outcome = pipeline.deliver(fault, handled, request).await;
						if let Some(reply) = reply {
							let _ = reply.send(outcome);
						}
					});
				}
				Some(WorkerCommand::Flush(done)) => {
					drain(&mut in_flight).await;
					let _ = done.send(());
				}
				Some(WorkerCommand::Shutdown) | None => {
					drain(&mut in_flight).await;
					break;
				}
			},
			Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
				log_join(joined);
			}
		}
	}

	rx.close();
	// Acknowledge flushes that raced with shutdown.
	while let Ok(command) = rx.try_recv() {
		if let WorkerCommand::Flush(done) = command {
			let _ = done.send(());
		}
	}
	info!("fault dispatcher stopped");
}

async fn drain(in_flight: &mut JoinSet<()>) {
	debug!(count = in_flight.len(), "draining in-flight reports");
	while let Some(joined) = in_flight.join_next().await {
		log_join(joined);
	}
}

fn log_join(joined: std::result::Result<(), tokio::task::JoinError>) {
	if let Err(e) = joined {
		error!(error = %e, "report task failed");
	}
}
