// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! At-most-once bookkeeping for exception identities.
//!
//! The registry stores bare [`FaultId`]s in a bounded LRU, so membership never
//! keeps an exception alive. Once more than `capacity` identities have been
//! seen the least recently touched one is forgotten.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use faultline_config::DEFAULT_DEDUPE_CAPACITY;
use faultline_core::FaultId;
use lru::LruCache;

#[derive(Debug)]
pub struct DedupeRegistry {
	seen: Mutex<LruCache<FaultId, ()>>,
}

impl DedupeRegistry {
	/// A capacity of zero falls back to the default.
	pub fn new(capacity: usize) -> Self {
		let capacity = NonZeroUsize::new(capacity)
			.or(NonZeroUsize::new(DEFAULT_DEDUPE_CAPACITY))
			.unwrap_or(NonZeroUsize::MIN);
		Self {
			seen: Mutex::new(LruCache::new(capacity)),
		}
	}

	pub fn has(&self, id: FaultId) -> bool {
		self.lock().contains(&id)
	}

	/// Record an identity. Adding one that is already present only refreshes it.
	pub fn add(&self, id: FaultId) {
		self.lock().put(id, ());
	}

	/// Atomically test and insert. Returns `true` when the identity was new.
	pub fn check_and_add(&self, id: FaultId) -> bool {
		let mut seen = self.lock();
		if seen.get(&id).is_some() {
			return false;
		}
		seen.put(id, ());
		true
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	// The registry is consulted from the panic hook, so a poisoned lock is
	// recovered rather than propagated.
	fn lock(&self) -> MutexGuard<'_, LruCache<FaultId, ()>> {
		self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}
}

impl Default for DedupeRegistry {
	fn default() -> Self {
		Self::new(DEFAULT_DEDUPE_CAPACITY)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::sync::Arc;

	#[test]
	fn add_is_idempotent() {
		let registry = DedupeRegistry::default();
		let id = FaultId::new();

		assert!(!registry.has(id));
		registry.add(id);
		registry.add(id);
		assert!(registry.has(id));
		assert_eq!(registry.len(), 1);
	}

	#[test]
	fn check_and_add_reports_first_sighting_only() {
		let registry = DedupeRegistry::default();
		let id = FaultId::new();

		assert!(registry.check_and_add(id));
		assert!(!registry.check_and_add(id));
		assert!(registry.check_and_add(FaultId::new()));
	}

	#[test]
	fn evicts_least_recently_used() {
		let registry = DedupeRegistry::new(2);
		let (a, b, c) = (FaultId::new(), FaultId::new(), FaultId::new());

		registry.add(a);
		registry.add(b);
		assert!(!registry.check_and_add(a));
		registry.add(c);

		assert!(registry.has(a));
		assert!(!registry.has(b));
		assert!(registry.has(c));
	}

	#[test]
	fn zero_capacity_uses_default() {
		let registry = DedupeRegistry::new(0);
		for _ in 0..10 {
			registry.add(FaultId::new());
		}
		assert_eq!(registry.len(), 10);
	}

	#[test]
	fn concurrent_check_and_add_admits_once() {
		let registry = Arc::new(DedupeRegistry::default());
		let id = FaultId::new();

		let handles: Vec<_> = (0..8)
			.map(|_| {
				let registry = registry.clone();
				std::thread::spawn(move || registry.check_and_add(id))
			})
			.collect();

		let admitted = handles
			.into_iter()
			.map(|h| h.join().unwrap())
			.filter(|admitted| *admitted)
			.count();
		assert_eq!(admitted, 1);
	}

	proptest! {
		#[test]
		fn never_exceeds_capacity(capacity in 1usize..32, inserts in 0usize..100) {
			let registry = DedupeRegistry::new(capacity);
			for _ in 0..inserts {
				registry.add(FaultId::new());
			}
			prop_assert_eq!(registry.len(), inserts.min(capacity));
		}
	}
}
