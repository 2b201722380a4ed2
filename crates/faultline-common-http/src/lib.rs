// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with a consistent User-Agent header.

use std::time::Duration;

use faultline_common_version::BuildInfo;
use reqwest::{Client, ClientBuilder};

/// Creates a new HTTP client builder with the standard Faultline User-Agent header.
///
/// # Example
/// ```ignore
/// let client = faultline_common_http::builder()
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a client with the standard User-Agent and a total request timeout.
pub fn client_with_timeout(timeout: Duration) -> reqwest::Result<Client> {
	builder().timeout(timeout).build()
}

/// Returns the standard Faultline User-Agent string.
///
/// Format: `faultline/{platform}/{git_sha}`
pub fn user_agent() -> String {
	let info = BuildInfo::current();
	format!("faultline/{}/{}", info.platform, info.git_sha)
}
