// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The capture → enrich → dedupe → deliver pipeline.
//!
//! Admission ([`Pipeline::screen`]) is synchronous so callers on any thread,
//! including a panicking one, claim an identity before the report is queued.
//! Delivery ([`Pipeline::deliver`]) is asynchronous and runs on the
//! dispatcher.

use std::sync::Arc;

use faultline_config::AgentConfig;
use faultline_core::{Fault, Report, RequestMeta};
use tracing::debug;

use crate::dedupe::DedupeRegistry;
use crate::enrich::Enricher;
use crate::transport::{DeliveryStatus, Endpoint, Reporter, Transport};

/// What happened to a fault handed to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
	Delivered,
	/// Delivery was attempted and failed; the failure was logged.
	Failed,
	/// The exception identity was already reported.
	Duplicate,
	/// The fault came from the agent itself.
	Ignored,
}

impl From<DeliveryStatus> for ReportOutcome {
	fn from(status: DeliveryStatus) -> Self {
		match status {
			DeliveryStatus::Delivered => ReportOutcome::Delivered,
			DeliveryStatus::Failed => ReportOutcome::Failed,
		}
	}
}

pub struct Pipeline {
	enricher: Enricher,
	registry: DedupeRegistry,
	reporter: Reporter,
}

impl Pipeline {
	pub fn new(config: &AgentConfig, transport: Arc<dyn Transport>) -> Self {
		Self {
			enricher: Enricher::new(config),
			registry: DedupeRegistry::new(config.dedupe_capacity),
			reporter: Reporter::new(transport),
		}
	}

	pub fn registry(&self) -> &DedupeRegistry {
		&self.registry
	}

	/// Decide whether a fault may be delivered, claiming its identity if so.
	///
	/// Returns the final outcome for faults that must not be delivered.
	pub fn screen(&self, fault: &Fault) -> Option<ReportOutcome> {
		match fault {
			Fault::Exception(exception) if exception.is_internal() => {
				debug!(fault_id = %exception.id(), "ignoring internal agent fault");
				Some(ReportOutcome::Ignored)
			}
			Fault::Exception(exception) => {
				if self.registry.check_and_add(exception.id()) {
					None
				} else {
					debug!(fault_id = %exception.id(), "fault already reported");
					Some(ReportOutcome::Duplicate)
				}
			}
			Fault::Rejection(_) => None,
		}
	}

	/// Enrich and deliver a fault that has already passed [`Pipeline::screen`].
	pub async fn deliver(
		&self,
		fault: Fault,
		handled: bool,
		request: Option<RequestMeta>,
	) -> ReportOutcome {
		let report = match fault {
			Fault::Exception(exception) => Report::Error(
				self.enricher
					.enrich_exception(&exception, handled, request.as_ref())
					.await,
			),
			Fault::Rejection(value) => Report::Rejection(
				self.enricher
					.enrich_rejection(value, handled, request.as_ref())
					.await,
			),
		};

		let endpoint = Endpoint::for_report(&report);
		self.reporter.send(&report, endpoint).await.into()
	}

	/// Screen, enrich and deliver in one step.
	pub async fn report(
		&self,
		fault: Fault,
		handled: bool,
		request: Option<RequestMeta>,
	) -> ReportOutcome {
		if let Some(outcome) = self.screen(&fault) {
			return outcome;
		}
		self.deliver(fault, handled, request).await
	}
}
