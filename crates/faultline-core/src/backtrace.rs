// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backtrace capture and rendering into trace strings.
//!
//! A trace string is a header line (`name: message`) followed by the
//! backtrace as std renders it. Frames belonging to the capture machinery
//! itself (std backtrace internals, panic plumbing, this crate's constructors)
//! are trimmed from the top so the frame cap is spent on application code.

use std::backtrace::Backtrace;

/// Capture a fresh backtrace and render it as a trace string.
pub fn capture_trace(name: &str, message: &str) -> String {
	let backtrace = Backtrace::force_capture();
	render_trace(name, message, &backtrace)
}

/// Render an already captured backtrace as a trace string.
pub fn render_trace(name: &str, message: &str, backtrace: &Backtrace) -> String {
	let rendered = trim_leading_runtime_frames(&backtrace.to_string());
	format!("{}\n{}", header_line(name, message), rendered)
}

/// Build the single-line header that opens every trace string.
pub fn header_line(name: &str, message: &str) -> String {
	let message = message.replace(['\r', '\n'], " ");
	if message.is_empty() {
		name.to_string()
	} else {
		format!("{name}: {message}")
	}
}

/// Drop frame blocks from the top of a rendered backtrace until the first
/// application frame. Keeps everything if no application frame is found.
fn trim_leading_runtime_frames(rendered: &str) -> String {
	let mut blocks: Vec<Vec<&str>> = Vec::new();
	for line in rendered.lines() {
		if frame_function(line).is_some() {
			blocks.push(vec![line]);
		} else if let Some(block) = blocks.last_mut() {
			block.push(line);
		}
	}

	let first_app = blocks
		.iter()
		.position(|block| frame_function(block[0]).is_some_and(is_in_app_frame))
		.unwrap_or(0);

	blocks[first_app..]
		.iter()
		.flatten()
		.copied()
		.collect::<Vec<_>>()
		.join("\n")
}

/// Extract the function name from a frame header line such as `  3: my_app::main`.
fn frame_function(line: &str) -> Option<&str> {
	let (index, function) = line.trim().split_once(':')?;
	index.trim().parse::<usize>().ok()?;
	Some(function.trim())
}

/// Determine if a frame is from application code rather than the runtime or
/// the agent's own capture path.
fn is_in_app_frame(function: &str) -> bool {
	const SYSTEM_PREFIXES: &[&str] = &[
		"std::",
		"core::",
		"alloc::",
		"<std::",
		"<core::",
		"<alloc::",
		"backtrace::",
		"<backtrace::",
		"panic_unwind::",
		"rust_begin_unwind",
		"rust_panic",
		"__rust_",
		"_rust_",
		"faultline_core::backtrace::",
		"faultline_core::fault::Exception::",
		"faultline::hooks::",
		"<alloc::boxed::Box<F,A> as core::ops::function::Fn",
	];

	const SYSTEM_CONTAINS: &[&str] = &["::panicking::", "::backtrace_rs::"];

	if SYSTEM_PREFIXES.iter().any(|prefix| function.starts_with(prefix)) {
		return false;
	}

	!SYSTEM_CONTAINS.iter().any(|needle| function.contains(needle))
}

#[cfg(test)]
mod tests {
	use super::*;

	const RENDERED: &str = "   0: std::backtrace_rs::backtrace::libunwind::trace
             at /rustc/abc/library/std/src/../../backtrace/src/backtrace/libunwind.rs:116:5
   1: std::backtrace::Backtrace::force_capture
             at /rustc/abc/library/std/src/backtrace.rs:312:9
   2: faultline_core::backtrace::capture_trace
             at ./src/backtrace.rs:15:18
   3: my_app::handlers::process
             at ./src/handlers.rs:42:7
   4: my_app::main
             at ./src/main.rs:3:5";

	#[test]
	fn header_line_is_single_line() {
		assert_eq!(header_line("Error", "a\nb"), "Error: a b");
		assert_eq!(header_line("panic", ""), "panic");
	}

	#[test]
	fn trims_capture_machinery() {
		let trimmed = trim_leading_runtime_frames(RENDERED);
		assert!(trimmed.starts_with("   3: my_app::handlers::process"));
		assert!(trimmed.contains("at ./src/main.rs:3:5"));
	}

	#[test]
	fn keeps_everything_without_app_frames() {
		let rendered = "   0: std::rt::lang_start\n             at /rustc/abc/library/std/src/rt.rs:1:1";
		assert_eq!(trim_leading_runtime_frames(rendered), rendered);
	}

	#[test]
	fn location_lines_are_not_headers() {
		assert!(frame_function("             at ./src/main.rs:3:5").is_none());
		assert_eq!(frame_function("  5: my_app::main"), Some("my_app::main"));
	}

	#[test]
	fn in_app_heuristic() {
		assert!(!is_in_app_frame("std::panicking::begin_panic_handler"));
		assert!(!is_in_app_frame("core::panicking::panic_fmt"));
		assert!(!is_in_app_frame("faultline::hooks::install_panic_hook::{{closure}}"));
		assert!(is_in_app_frame("my_app::main"));
		assert!(is_in_app_frame("faultline_core::fault::tests::capture"));
	}

	#[test]
	fn capture_trace_starts_with_header() {
		let trace = capture_trace("Error", "boom");
		assert!(trace.starts_with("Error: boom\n"));
	}
}
