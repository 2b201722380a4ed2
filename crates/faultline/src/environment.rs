// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-report environment fields.
//!
//! Each field is computed fresh on every call and degrades to `None` on its
//! own when it cannot be determined.

use faultline_common_version::runtime_descriptor;
use faultline_core::{EnvironmentInfo, RequestMeta};
use sysinfo::System;

/// Collect the runtime, OS and client IP for one report.
pub fn collect(request: Option<&RequestMeta>) -> EnvironmentInfo {
	EnvironmentInfo {
		runtime: runtime_descriptor(),
		os: os_descriptor(),
		ip: request.and_then(|r| r.ip.clone()),
	}
}

/// OS name and kernel release, e.g. "Linux 6.8.0-45-generic".
pub fn os_descriptor() -> Option<String> {
	let name = System::name().filter(|n| !n.is_empty());
	let kernel = System::kernel_version().filter(|k| !k.is_empty());
	match (name, kernel) {
		(Some(name), Some(kernel)) => Some(format!("{name} {kernel}")),
		(Some(name), None) => Some(name),
		(None, Some(kernel)) => Some(format!("{} {kernel}", std::env::consts::OS)),
		(None, None) => None,
	}
}
