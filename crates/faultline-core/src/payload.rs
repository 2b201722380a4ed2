// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire payloads posted to the ingestion endpoint.
//!
//! Every body is wrapped as `{"data": ...}`. Exception reports go to the
//! errors endpoint, rejection reports to the rejections endpoint.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{CodeContext, EnvironmentInfo};
use crate::request::RequestMeta;

/// Current time as an ISO-8601 UTC timestamp with millisecond precision.
pub fn timestamp_now() -> String {
	Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The `{"data": ...}` wrapper around every body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
	pub data: T,
}

/// Basic exception identity as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
	pub name: String,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
}

/// Request and environment fields shared by both report kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMeta {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub method: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ip: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub os: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub runtime: Option<String>,
}

impl ReportMeta {
	pub fn new(request: Option<&RequestMeta>, environment: EnvironmentInfo) -> Self {
		Self {
			method: request.and_then(|r| r.method.clone()),
			path: request.and_then(|r| r.path.clone()),
			ip: environment.ip,
			os: environment.os,
			runtime: environment.runtime,
		}
	}
}

/// Body of an exception report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
	pub error: ErrorData,
	#[serde(rename = "codeContexts", default)]
	pub code_contexts: Vec<CodeContext>,
	pub handled: bool,
	pub timestamp: String,
	pub project_id: String,
	#[serde(flatten)]
	pub meta: ReportMeta,
}

/// Body of a rejection report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionReport {
	pub value: serde_json::Value,
	pub handled: bool,
	pub timestamp: String,
	pub project_id: String,
	#[serde(flatten)]
	pub meta: ReportMeta,
}

/// A fully enriched report, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
	Error(ErrorReport),
	Rejection(RejectionReport),
}

impl Report {
	pub fn handled(&self) -> bool {
		match self {
			Report::Error(report) => report.handled,
			Report::Rejection(report) => report.handled,
		}
	}

	/// Serialize into the enveloped JSON body.
	pub fn to_body(&self) -> serde_json::Result<serde_json::Value> {
		match self {
			Report::Error(data) => serde_json::to_value(Envelope { data }),
			Report::Rejection(data) => serde_json::to_value(Envelope { data }),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn environment() -> EnvironmentInfo {
		EnvironmentInfo {
			runtime: Some("Rust 1.83.0".to_string()),
			os: Some("Linux 6.8.0".to_string()),
			ip: None,
		}
	}

	#[test]
	fn timestamp_is_utc_with_millis() {
		let ts = timestamp_now();
		assert!(ts.ends_with('Z'));
		let parsed = chrono::DateTime::parse_from_rfc3339(&ts).unwrap();
		assert_eq!(parsed.offset().local_minus_utc(), 0);
		assert_eq!(ts.split('.').nth(1).map(|s| s.len()), Some(4));
	}

	#[test]
	fn error_body_uses_wire_names() {
		let request = RequestMeta::new("GET", "/orders").with_ip("203.0.113.9");
		let report = Report::Error(ErrorReport {
			error: ErrorData {
				name: "TypeError".to_string(),
				message: "x is undefined".to_string(),
				stack: Some("TypeError: x is undefined".to_string()),
			},
			code_contexts: vec![CodeContext {
				file: "/srv/app.js".to_string(),
				line: 3,
				column: 9,
				context: "let y = x.z;".to_string(),
			}],
			handled: false,
			timestamp: "2025-01-01T00:00:00.000Z".to_string(),
			project_id: "proj_123".to_string(),
			meta: ReportMeta::new(
				Some(&request),
				EnvironmentInfo {
					ip: request.ip.clone(),
					..environment()
				},
			),
		});

		let body = report.to_body().unwrap();
		assert_eq!(
			body,
			json!({
				"data": {
					"error": {
						"name": "TypeError",
						"message": "x is undefined",
						"stack": "TypeError: x is undefined"
					},
					"codeContexts": [
						{"file": "/srv/app.js", "line": 3, "column": 9, "context": "let y = x.z;"}
					],
					"handled": false,
					"timestamp": "2025-01-01T00:00:00.000Z",
					"project_id": "proj_123",
					"method": "GET",
					"path": "/orders",
					"ip": "203.0.113.9",
					"os": "Linux 6.8.0",
					"runtime": "Rust 1.83.0"
				}
			})
		);
	}

	#[test]
	fn rejection_body_omits_unknown_fields() {
		let report = Report::Rejection(RejectionReport {
			value: json!(42),
			handled: true,
			timestamp: "2025-01-01T00:00:00.000Z".to_string(),
			project_id: "proj_123".to_string(),
			meta: ReportMeta::default(),
		});

		assert!(report.handled());
		assert_eq!(
			report.to_body().unwrap(),
			json!({
				"data": {
					"value": 42,
					"handled": true,
					"timestamp": "2025-01-01T00:00:00.000Z",
					"project_id": "proj_123"
				}
			})
		);
	}

	#[test]
	fn error_report_parses_back_from_wire() {
		let wire = json!({
			"error": {"name": "Error", "message": "boom"},
			"codeContexts": [],
			"handled": true,
			"timestamp": "2025-01-01T00:00:00.000Z",
			"project_id": "proj_1",
			"runtime": "Rust 1.83.0"
		});
		let report: ErrorReport = serde_json::from_value(wire).unwrap();
		assert_eq!(report.error.stack, None);
		assert_eq!(report.meta.runtime.as_deref(), Some("Rust 1.83.0"));
		assert_eq!(report.meta.method, None);
	}
}
