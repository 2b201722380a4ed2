// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Full pipeline against a mock ingestion server.

use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use faultline::{Agent, AgentConfig, Exception, ReportOutcome, RequestMeta};
use serde_json::Value;
use tempfile::NamedTempFile;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_file(lines: usize) -> NamedTempFile {
	let mut file = NamedTempFile::new().unwrap();
	for i in 1..=lines {
		writeln!(file, "let step_{i} = {i};").unwrap();
	}
	file
}

async fn mock_endpoint(server: &MockServer, endpoint: &str) {
	Mock::given(method("POST"))
		.and(path(endpoint))
		.and(header("x-api-key", "ft_e2e_key"))
		.respond_with(ResponseTemplate::new(201))
		.expect(1)
		.mount(server)
		.await;
}

async fn received_body(server: &MockServer) -> Value {
	let requests = server.received_requests().await.unwrap();
	assert_eq!(requests.len(), 1);
	requests[0].body_json::<Value>().unwrap()
}

fn agent_for(server: &MockServer) -> Agent {
	let config = AgentConfig::new("proj_e2e", format!("{}/", server.uri()), "ft_e2e_key").unwrap();
	Agent::new(config).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn unhandled_exception_delivers_readable_contexts_only() {
	let server = MockServer::start().await;
	mock_endpoint(&server, "/api/errors").await;

	let first = source_file(20);
	let second = source_file(20);
	let stack = format!(
		"Error: checkout failed\n    at charge ({}:12:7)\n    at /nonexistent/faultline/billing.rs:40:3\n    at {}:1:1",
		first.path().display(),
		second.path().display()
	);
	let exception = Exception::new("Error", "checkout failed").with_stack(stack);

	let agent = agent_for(&server);
	let outcome = agent.report_fault(exception, false, None).await.unwrap();
	assert_eq!(outcome, ReportOutcome::Delivered);

	let body = received_body(&server).await;
	let data = &body["data"];
	assert_eq!(data["handled"], false);
	assert_eq!(data["project_id"], "proj_e2e");
	assert_eq!(data["error"]["name"], "Error");
	assert_eq!(data["error"]["message"], "checkout failed");

	let contexts = data["codeContexts"].as_array().unwrap();
	assert_eq!(contexts.len(), 2);
	assert_eq!(contexts[0]["file"], first.path().display().to_string());
	assert_eq!(contexts[0]["line"], 12);
	assert_eq!(contexts[0]["column"], 7);
	assert_eq!(
		contexts[0]["context"],
		(7..=17)
			.map(|i| format!("let step_{i} = {i};"))
			.collect::<Vec<_>>()
			.join("\n")
	);
	assert_eq!(contexts[1]["file"], second.path().display().to_string());
	assert_eq!(
		contexts[1]["context"],
		(1..=6)
			.map(|i| format!("let step_{i} = {i};"))
			.collect::<Vec<_>>()
			.join("\n")
	);

	let timestamp = data["timestamp"].as_str().unwrap();
	assert!(timestamp.ends_with('Z'));
	assert!(data.get("method").is_none());
	assert!(data.get("ip").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn rejection_value_posts_to_rejections_endpoint() {
	let server = MockServer::start().await;
	mock_endpoint(&server, "/api/rejections").await;

	let agent = agent_for(&server);
	let outcome = agent
		.report_rejection(serde_json::json!(42), false, None)
		.await
		.unwrap();
	assert_eq!(outcome, ReportOutcome::Delivered);

	let body = received_body(&server).await;
	assert_eq!(body["data"]["value"], 42);
	assert_eq!(body["data"]["handled"], false);
	assert!(body["data"].get("error").is_none());
	assert!(body["data"].get("codeContexts").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn request_scoped_report_carries_request_fields() {
	let server = MockServer::start().await;
	mock_endpoint(&server, "/api/errors").await;

	let request = http::Request::builder()
		.method("PUT")
		.uri("/orders/42?expand=items")
		.header("x-forwarded-for", "203.0.113.50, 10.0.0.1")
		.body(())
		.unwrap();
	let (parts, _) = request.into_parts();
	let peer: SocketAddr = "10.0.0.1:55000".parse().unwrap();
	let meta = RequestMeta::from_parts(&parts, Some(peer));

	let agent = agent_for(&server);
	agent
		.report_fault(Exception::new("Error", "conflict"), true, Some(meta))
		.await
		.unwrap();

	let body = received_body(&server).await;
	assert_eq!(body["data"]["method"], "PUT");
	assert_eq!(body["data"]["path"], "/orders/42");
	assert_eq!(body["data"]["ip"], "203.0.113.50");
	assert_eq!(body["data"]["handled"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_endpoint_is_attempted_once() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.respond_with(ResponseTemplate::new(500))
		.expect(1)
		.mount(&server)
		.await;

	let agent = agent_for(&server);
	let exception = std::sync::Arc::new(Exception::new("Error", "ingest down"));

	let first = agent
		.report_fault(exception.clone(), false, None)
		.await
		.unwrap();
	let second = agent.report_fault(exception, false, None).await.unwrap();

	assert_eq!(first, ReportOutcome::Failed);
	assert_eq!(second, ReportOutcome::Duplicate);
	assert!(agent.flush(Duration::from_secs(5)));
}
