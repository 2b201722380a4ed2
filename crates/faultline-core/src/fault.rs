// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Faults: exceptions with identity, and opaque rejection values.

use std::fmt;
use std::sync::Arc;

use crate::backtrace::capture_trace;
use crate::FaultId;

/// An exception-shaped fault.
///
/// Every exception receives a [`FaultId`] when it is constructed; clones share
/// it, so the same fault observed on several channels is recognised as one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
	id: FaultId,
	name: String,
	message: String,
	stack: Option<String>,
	internal: bool,
}

impl Exception {
	/// Create an exception without a stack trace.
	pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			id: FaultId::new(),
			name: name.into(),
			message: message.into(),
			stack: None,
			internal: false,
		}
	}

	/// Create an exception and capture the current backtrace as its stack.
	pub fn capture(name: impl Into<String>, message: impl Into<String>) -> Self {
		let exception = Self::new(name, message);
		let stack = capture_trace(&exception.name, &exception.message);
		exception.with_stack(stack)
	}

	/// Build an exception from any error, capturing the current backtrace.
	///
	/// The name is the error's type name; the message is its `Display` output
	/// followed by the `source()` chain.
	pub fn from_error<E>(error: &E) -> Self
	where
		E: std::error::Error + ?Sized,
	{
		let mut message = error.to_string();
		let mut source = error.source();
		while let Some(cause) = source {
			message.push_str(": ");
			message.push_str(&cause.to_string());
			source = cause.source();
		}
		Self::capture(std::any::type_name::<E>(), message)
	}

	/// Create an exception raised by the agent's own delivery path.
	///
	/// Hooks recognise these and never report them.
	pub fn internal(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			internal: true,
			..Self::new(name, message)
		}
	}

	/// Replace the raw stack trace string.
	pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
		self.stack = Some(stack.into());
		self
	}

	pub fn id(&self) -> FaultId {
		self.id
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	pub fn stack(&self) -> Option<&str> {
		self.stack.as_deref()
	}

	pub fn is_internal(&self) -> bool {
		self.internal
	}
}

impl fmt::Display for Exception {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.name, self.message)
	}
}

impl std::error::Error for Exception {}

/// A fault entering the pipeline.
#[derive(Debug, Clone)]
pub enum Fault {
	/// An exception; reported at most once per identity.
	Exception(Arc<Exception>),
	/// The value carried by a rejected asynchronous operation. Values have no
	/// identity and are never deduplicated.
	Rejection(serde_json::Value),
}

impl Fault {
	/// Identity of the fault, if it has one.
	pub fn id(&self) -> Option<FaultId> {
		match self {
			Fault::Exception(exception) => Some(exception.id()),
			Fault::Rejection(_) => None,
		}
	}

	/// Returns true for exceptions raised by the agent itself.
	pub fn is_internal(&self) -> bool {
		matches!(self, Fault::Exception(exception) if exception.is_internal())
	}
}

impl From<Arc<Exception>> for Fault {
	fn from(exception: Arc<Exception>) -> Self {
		Fault::Exception(exception)
	}
}

impl From<Exception> for Fault {
	fn from(exception: Exception) -> Self {
		Fault::Exception(Arc::new(exception))
	}
}

impl From<serde_json::Value> for Fault {
	fn from(value: serde_json::Value) -> Self {
		Fault::Rejection(value)
	}
}
