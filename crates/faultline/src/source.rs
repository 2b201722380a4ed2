// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reads the source files referenced by stack frames.

use std::path::PathBuf;

use faultline_core::{slice_window, CodeContext, StackFrame};
use tracing::debug;
use url::Url;

/// Reads source files for code context. Failures are never surfaced.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceReader;

impl SourceReader {
	pub fn new() -> Self {
		Self
	}

	/// Read the whole file behind a frame reference, or `None` if it cannot
	/// be resolved or read.
	pub async fn read(&self, file: &str) -> Option<String> {
		let path = resolve_path(file)?;
		match tokio::fs::read_to_string(&path).await {
			Ok(source) => Some(source),
			Err(e) => {
				debug!(path = %path.display(), error = %e, "source file unreadable, skipping context");
				None
			}
		}
	}

	/// Read the window of lines around a frame.
	pub async fn context_for(&self, frame: &StackFrame, context_lines: u32) -> Option<CodeContext> {
		let source = self.read(&frame.file).await?;
		Some(CodeContext {
			file: frame.file.clone(),
			line: frame.line,
			column: frame.column,
			context: slice_window(&source, frame.line, context_lines),
		})
	}
}

/// Turn a frame's file reference into a filesystem path.
///
/// `file://` URIs are converted; other URI schemes cannot be read. Relative
/// paths resolve against the working directory.
pub fn resolve_path(file: &str) -> Option<PathBuf> {
	if file.starts_with("file:") {
		let url = Url::parse(file).ok()?;
		return match url.to_file_path() {
			Ok(path) => Some(path),
			Err(()) => {
				debug!(file, "file URI has no local path");
				None
			}
		};
	}

	if file.contains("://") {
		debug!(file, "frame references a non-file URI");
		return None;
	}

	Some(PathBuf::from(file))
}
