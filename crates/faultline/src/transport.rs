// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery of reports to the ingestion endpoint.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use faultline_config::{AgentConfig, SecretString};
use faultline_core::Report;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{AgentError, Result};

/// Header carrying the project API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The two ingestion endpoints, relative to the configured base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
	Errors,
	Rejections,
}

impl Endpoint {
	pub fn path(&self) -> &'static str {
		match self {
			Endpoint::Errors => "/api/errors",
			Endpoint::Rejections => "/api/rejections",
		}
	}

	/// The endpoint a report belongs on.
	pub fn for_report(report: &Report) -> Self {
		match report {
			Report::Error(_) => Endpoint::Errors,
			Report::Rejection(_) => Endpoint::Rejections,
		}
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.path())
	}
}

/// Posts JSON bodies to an endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
	async fn post(&self, endpoint: Endpoint, body: &serde_json::Value) -> Result<()>;
}

/// HTTP transport using the shared reqwest client.
pub struct HttpTransport {
	client: Client,
	base_url: String,
	api_key: SecretString,
}

impl HttpTransport {
	pub fn new(config: &AgentConfig) -> Result<Self> {
		let client = faultline_common_http::client_with_timeout(config.request_timeout)?;
		Ok(Self {
			client,
			base_url: config.api_endpoint.clone(),
			api_key: config.api_key.clone(),
		})
	}

	fn url(&self, endpoint: Endpoint) -> String {
		format!("{}{}", self.base_url, endpoint.path())
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn post(&self, endpoint: Endpoint, body: &serde_json::Value) -> Result<()> {
		let url = self.url(endpoint);
		debug!(url = %url, "posting report");

		let response = self
			.client
			.post(&url)
			.header(API_KEY_HEADER, self.api_key.expose().as_str())
			.json(body)
			.send()
			.await?;

		if !response.status().is_success() {
			let status = response.status().as_u16();
			let message = response.text().await.unwrap_or_default();
			return Err(AgentError::ServerError { status, message });
		}

		Ok(())
	}
}

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
	Delivered,
	Failed,
}

/// Serializes reports and hands them to a [`Transport`].
///
/// This is the boundary where delivery failures stop: they are logged and
/// turned into [`DeliveryStatus::Failed`], never returned or raised.
#[derive(Clone)]
pub struct Reporter {
	transport: Arc<dyn Transport>,
}

impl Reporter {
	pub fn new(transport: Arc<dyn Transport>) -> Self {
		Self { transport }
	}

	pub async fn send(&self, report: &Report, endpoint: Endpoint) -> DeliveryStatus {
		match self.try_send(report, endpoint).await {
			Ok(()) => {
				debug!(endpoint = %endpoint, handled = report.handled(), "report delivered");
				DeliveryStatus::Delivered
			}
			Err(e) => {
				warn!(endpoint = %endpoint, error = %e, "failed to deliver fault report");
				DeliveryStatus::Failed
			}
		}
	}

	async fn try_send(&self, report: &Report, endpoint: Endpoint) -> Result<()> {
		let body = report.to_body()?;
		self.transport.post(endpoint, &body).await
	}
}
