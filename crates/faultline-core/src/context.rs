// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Context attached to fault reports (source snippets, runtime environment).

use serde::{Deserialize, Serialize};

/// Lines of source kept on each side of the fault line by default.
pub const DEFAULT_CONTEXT_LINES: u32 = 5;

/// A source snippet around one stack frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeContext {
	pub file: String,
	pub line: u32,
	pub column: u32,
	/// Contiguous block of source lines around `line`.
	pub context: String,
}

/// Runtime environment at report time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
	/// e.g. "Rust 1.83.0"
	pub runtime: Option<String>,
	/// e.g. "Linux 6.8.0-45-generic"
	pub os: Option<String>,
	pub ip: Option<String>,
}

/// Cut the lines surrounding `target_line` (1-based) out of `source`.
///
/// The window is `[target - context_lines - 1, target + context_lines)` in
/// 0-based line indices, clamped to the file.
pub fn slice_window(source: &str, target_line: u32, context_lines: u32) -> String {
	let lines: Vec<&str> = source.lines().collect();
	let target = target_line as usize;
	let context_lines = context_lines as usize;

	let start = target.saturating_sub(context_lines + 1);
	let end = (target + context_lines).min(lines.len());

	if start >= end {
		return String::new();
	}

	lines[start..end].join("\n")
}
