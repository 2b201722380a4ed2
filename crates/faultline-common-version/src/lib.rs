// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build and toolchain information for the Faultline agent.
//!
//! Everything here is captured at compile time, so the values describe the
//! binary the agent was linked into.

shadow_rs::shadow!(build);

/// Platform string in `{os}-{arch}` format, e.g. "linux-x86_64".
pub const PLATFORM: &str = env!("FAULTLINE_PLATFORM");

/// Core build information used for the User-Agent and runtime descriptor.
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
	pub version: &'static str,
	pub git_sha: &'static str,
	pub platform: &'static str,
	/// Full `rustc --version` output of the compiling toolchain.
	pub rustc: &'static str,
}

impl BuildInfo {
	/// Get the current build information (compile-time constants).
	#[allow(clippy::const_is_empty)]
	pub const fn current() -> Self {
		Self {
			version: build::PKG_VERSION,
			git_sha: if build::SHORT_COMMIT.is_empty() {
				"unknown"
			} else {
				build::SHORT_COMMIT
			},
			platform: PLATFORM,
			rustc: build::RUST_VERSION,
		}
	}

	/// The bare compiler version, e.g. "1.83.0".
	pub fn rustc_version(&self) -> Option<&'static str> {
		let mut parts = self.rustc.split_whitespace();
		match (parts.next(), parts.next()) {
			(Some("rustc"), Some(version)) => Some(version),
			_ => None,
		}
	}
}

/// Describe the language runtime, e.g. "Rust 1.83.0".
pub fn runtime_descriptor() -> Option<String> {
	BuildInfo::current()
		.rustc_version()
		.map(|version| format!("Rust {version}"))
}
