// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP request metadata for faults raised while serving a request.

use std::net::SocketAddr;

use http::HeaderMap;
use serde::{Deserialize, Serialize};

/// Sentinel reported when no client address can be determined.
pub const UNKNOWN_IP: &str = "unknown";

/// Request metadata supplied by request-scoped collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMeta {
	pub method: Option<String>,
	pub path: Option<String>,
	pub ip: Option<String>,
}

impl RequestMeta {
	pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
		Self {
			method: Some(method.into()),
			path: Some(path.into()),
			ip: None,
		}
	}

	pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
		self.ip = Some(ip.into());
		self
	}

	/// Build request metadata from HTTP request parts and the peer address.
	pub fn from_parts(parts: &http::request::Parts, peer: Option<SocketAddr>) -> Self {
		Self {
			method: Some(parts.method.as_str().to_string()),
			path: Some(parts.uri.path().to_string()),
			ip: Some(extract_client_ip(&parts.headers, peer)),
		}
	}
}

/// Extract the client IP for a request.
///
/// Checks in order:
/// 1. `X-Forwarded-For` (first address in the chain)
/// 2. the connection's peer address
/// 3. [`UNKNOWN_IP`]
pub fn extract_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
	if let Some(xff) = headers.get("x-forwarded-for") {
		if let Ok(xff_str) = xff.to_str() {
			if let Some(first_ip) = xff_str.split(',').next() {
				let ip = first_ip.trim();
				if !ip.is_empty() {
					return ip.to_string();
				}
			}
		}
	}

	match peer {
		Some(addr) => addr.ip().to_string(),
		None => UNKNOWN_IP.to_string(),
	}
}
