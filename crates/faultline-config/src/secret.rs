// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting holder for the ingestion API key.

use std::fmt;

use serde::Deserialize;
use zeroize::Zeroize;

const REDACTED: &str = "[REDACTED]";

/// A value that never shows up in `Debug` output and is zeroized on drop.
/// Read it with [`Secret::expose`].
#[derive(Clone, Deserialize, Zeroize)]
#[serde(transparent)]
#[zeroize(drop)]
pub struct Secret<T: Zeroize>(T);

pub type SecretString = Secret<String>;

impl<T: Zeroize> Secret<T> {
	pub fn new(inner: T) -> Self {
		Self(inner)
	}

	pub fn expose(&self) -> &T {
		&self.0
	}
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn deserializes_from_a_plain_string() {
		let parsed: SecretString = serde_json::from_str("\"ft_live_abc123\"").unwrap();
		assert_eq!(parsed.expose(), "ft_live_abc123");
		assert_eq!(format!("{parsed:?}"), "Secret(\"[REDACTED]\")");
	}

	proptest! {
		#[test]
		fn debug_never_contains_the_key(value in "[a-zA-Z0-9_]{12,40}") {
			let secret = Secret::new(value.clone());
			let debug_direct = format!("{secret:?}");
			let debug_clone = format!("{:?}", secret.clone());
			prop_assert!(!debug_direct.contains(&value));
			prop_assert!(!debug_clone.contains(&value));
		}
	}
}
