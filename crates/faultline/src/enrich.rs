// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Turns faults into fully populated reports.

use faultline_config::AgentConfig;
use faultline_core::{
	parse_stack_trace, timestamp_now, CodeContext, ErrorData, ErrorReport, Exception,
	RejectionReport, ReportMeta, RequestMeta, StackFrame,
};
use futures::future::join_all;
use tracing::trace;

use crate::environment;
use crate::source::SourceReader;

/// Builds reports from faults using the agent configuration.
#[derive(Debug, Clone)]
pub struct Enricher {
	project_id: String,
	include_context: bool,
	context_lines: u32,
	reader: SourceReader,
}

impl Enricher {
	pub fn new(config: &AgentConfig) -> Self {
		Self {
			project_id: config.project_id.clone(),
			include_context: config.include_context,
			context_lines: config.context_lines,
			reader: SourceReader::new(),
		}
	}

	pub async fn enrich_exception(
		&self,
		exception: &Exception,
		handled: bool,
		request: Option<&RequestMeta>,
	) -> ErrorReport {
		let code_contexts = if self.include_context {
			let frames = parse_stack_trace(exception.stack()).unwrap_or_default();
			self.code_contexts(&frames).await
		} else {
			Vec::new()
		};

		trace!(
			fault_id = %exception.id(),
			contexts = code_contexts.len(),
			"enriched exception"
		);

		ErrorReport {
			error: ErrorData {
				name: exception.name().to_string(),
				message: exception.message().to_string(),
				stack: exception.stack().map(str::to_string),
			},
			code_contexts,
			handled,
			timestamp: timestamp_now(),
			project_id: self.project_id.clone(),
			meta: ReportMeta::new(request, environment::collect(request)),
		}
	}

	pub async fn enrich_rejection(
		&self,
		value: serde_json::Value,
		handled: bool,
		request: Option<&RequestMeta>,
	) -> RejectionReport {
		RejectionReport {
			value,
			handled,
			timestamp: timestamp_now(),
			project_id: self.project_id.clone(),
			meta: ReportMeta::new(request, environment::collect(request)),
		}
	}

	/// Read every frame concurrently, keeping the readable ones in frame order.
	async fn code_contexts(&self, frames: &[StackFrame]) -> Vec<CodeContext> {
		let reads = frames
			.iter()
			.map(|frame| self.reader.context_for(frame, self.context_lines));
		join_all(reads).await.into_iter().flatten().collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	fn config(include_context: bool) -> AgentConfig {
		AgentConfig::new("proj_enrich", "http://localhost:1", "ft_key")
			.unwrap()
			.with_include_context(include_context)
	}

	fn source_file(lines: usize) -> NamedTempFile {
		let mut file = NamedTempFile::new().unwrap();
		for i in 1..=lines {
			writeln!(file, "fn line_{i}() {{}}").unwrap();
		}
		file
	}

	#[tokio::test]
	async fn contexts_keep_frame_order_and_skip_missing_files() {
		let first = source_file(10);
		let second = source_file(10);
		let stack = format!(
			"Error: boom\n    at handler ({}:2:5)\n    at /nonexistent/faultline/gone.rs:3:1\n    at {}:9:1",
			first.path().display(),
			second.path().display()
		);
		let exception = Exception::new("Error", "boom").with_stack(stack);

		let report = Enricher::new(&config(true))
			.enrich_exception(&exception, false, None)
			.await;

		assert_eq!(report.code_contexts.len(), 2);
		assert_eq!(report.code_contexts[0].file, first.path().display().to_string());
		assert_eq!(report.code_contexts[0].line, 2);
		assert_eq!(report.code_contexts[1].file, second.path().display().to_string());
		assert_eq!(report.code_contexts[1].line, 9);
		assert!(!report.handled);
		assert_eq!(report.project_id, "proj_enrich");
	}

	#[tokio::test]
	async fn context_disabled_skips_reads() {
		let file = source_file(3);
		let exception = Exception::new("Error", "boom")
			.with_stack(format!("Error: boom\n    at {}:1:1", file.path().display()));

		let report = Enricher::new(&config(false))
			.enrich_exception(&exception, true, None)
			.await;

		assert!(report.code_contexts.is_empty());
		assert!(report.error.stack.is_some());
	}

	#[tokio::test]
	async fn exception_without_stack_has_no_contexts() {
		let exception = Exception::new("Error", "no trace");
		let report = Enricher::new(&config(true))
			.enrich_exception(&exception, true, None)
			.await;

		assert!(report.code_contexts.is_empty());
		assert_eq!(report.error.stack, None);
	}

	#[tokio::test]
	async fn rejection_carries_request_meta() {
		let request = RequestMeta::new("GET", "/health").with_ip("192.0.2.4");
		let report = Enricher::new(&config(true))
			.enrich_rejection(serde_json::json!(42), false, Some(&request))
			.await;

		assert_eq!(report.value, serde_json::json!(42));
		assert_eq!(report.meta.method.as_deref(), Some("GET"));
		assert_eq!(report.meta.path.as_deref(), Some("/health"));
		assert_eq!(report.meta.ip.as_deref(), Some("192.0.2.4"));
	}
}
