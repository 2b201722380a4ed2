// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack trace parsing.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum number of frames kept from a single trace.
pub const MAX_FRAMES: usize = 10;

/// Matches `at <description> (<file>:<line>:<column>)` and
/// `at <file>:<line>:<column>`. Rust backtrace location lines use the second form.
static FRAME_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\s*at\s+(?:.*\s\()?(.+):(\d+):(\d+)\)?\s*$").unwrap());

/// A single resolved stack frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
	pub file: String,
	/// 1-based.
	pub line: u32,
	/// 1-based.
	pub column: u32,
}

/// Parse a raw trace string into at most [`MAX_FRAMES`] frames.
///
/// The first line is the fault's own header and is skipped. Lines that do not
/// look like a frame location are dropped. Returns `None` only when there is
/// no trace at all; a trace with no recognisable frames yields an empty list.
pub fn parse_stack_trace(stack: Option<&str>) -> Option<Vec<StackFrame>> {
	let stack = stack.filter(|s| !s.trim().is_empty())?;

	let frames = stack
		.lines()
		.skip(1)
		.filter_map(parse_frame_line)
		.take(MAX_FRAMES)
		.collect();

	Some(frames)
}

fn parse_frame_line(line: &str) -> Option<StackFrame> {
	let captures = FRAME_REGEX.captures(line)?;
	let file = captures.get(1)?.as_str().trim();
	let line = captures.get(2)?.as_str().parse::<u32>().ok()?;
	let column = captures.get(3)?.as_str().parse::<u32>().ok()?;

	if file.is_empty() || line == 0 || column == 0 {
		return None;
	}

	Some(StackFrame {
		file: file.to_string(),
		line,
		column,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn frame(file: &str, line: u32, column: u32) -> StackFrame {
		StackFrame {
			file: file.to_string(),
			line,
			column,
		}
	}

	#[test]
	fn absent_trace_is_none() {
		assert_eq!(parse_stack_trace(None), None);
		assert_eq!(parse_stack_trace(Some("   ")), None);
	}

	#[test]
	fn header_only_trace_is_empty() {
		assert_eq!(parse_stack_trace(Some("Error: boom")), Some(vec![]));
	}

	#[test]
	fn parses_described_frames() {
		let stack = "TypeError: x is undefined\n    at handler (/srv/app/routes.js:12:7)\n    at Layer.handle [as handle_request] (/srv/app/node_modules/router/layer.js:95:5)";
		assert_eq!(
			parse_stack_trace(Some(stack)).unwrap(),
			vec![
				frame("/srv/app/routes.js", 12, 7),
				frame("/srv/app/node_modules/router/layer.js", 95, 5),
			]
		);
	}

	#[test]
	fn parses_bare_and_uri_frames() {
		let stack = "Error\n    at /srv/app/index.js:3:1\n    at file:///srv/app/main.mjs:8:15";
		assert_eq!(
			parse_stack_trace(Some(stack)).unwrap(),
			vec![
				frame("/srv/app/index.js", 3, 1),
				frame("file:///srv/app/main.mjs", 8, 15),
			]
		);
	}

	#[test]
	fn parses_rust_backtrace_locations() {
		let stack = "panic: boom
   3: my_app::handlers::process
             at ./src/handlers.rs:42:7
   4: my_app::main
             at ./src/main.rs:3:5";
		assert_eq!(
			parse_stack_trace(Some(stack)).unwrap(),
			vec![frame("./src/handlers.rs", 42, 7), frame("./src/main.rs", 3, 5)]
		);
	}

	#[test]
	fn drops_free_form_and_zero_positions() {
		let stack = "Error: boom\n    at async Promise.all (index 0)\n    at <anonymous>\n    at /a.js:0:1\n    at /b.js:2:0\n    at /c.js:2:2";
		assert_eq!(parse_stack_trace(Some(stack)).unwrap(), vec![frame("/c.js", 2, 2)]);
	}

	#[test]
	fn caps_deep_traces_in_order() {
		let mut stack = String::from("Error: deep");
		for i in 1..=50 {
			stack.push_str(&format!("\n    at fn{i} (/srv/app/f{i}.js:{i}:1)"));
		}

		let frames = parse_stack_trace(Some(&stack)).unwrap();
		assert_eq!(frames.len(), MAX_FRAMES);
		for (i, frame) in frames.iter().enumerate() {
			assert_eq!(frame.file, format!("/srv/app/f{}.js", i + 1));
			assert_eq!(frame.line, i as u32 + 1);
		}
	}

	proptest! {
		#[test]
		fn never_exceeds_cap(depth in 0usize..200, line in 1u32..100_000, column in 1u32..500) {
			let mut stack = String::from("Error: generated");
			for i in 0..depth {
				stack.push_str(&format!("\n    at f{i} (/src/m{i}.rs:{line}:{column})"));
			}
			let frames = parse_stack_trace(Some(&stack)).unwrap();
			prop_assert_eq!(frames.len(), depth.min(MAX_FRAMES));
			prop_assert!(frames.iter().all(|f| f.line == line && f.column == column));
		}

		#[test]
		fn arbitrary_input_never_panics(input in ".*") {
			let _ = parse_stack_trace(Some(&input));
		}
	}
}
