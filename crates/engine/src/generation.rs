use std::collections::HashSet;

use tracing::trace;

/// Monotonic submission ids plus the in-flight set.
///
/// An id stays in the set exactly while its diff computation or deferred
/// commit has not yet resolved. Owned by the coordinating task; no locking.
#[derive(Debug, Default)]
pub(crate) struct GenerationLedger {
	last_issued: u64,
	in_flight: HashSet<u64>,
}

impl GenerationLedger {
	/// Issues the next generation id and records it as in-flight.
	pub fn issue(&mut self) -> u64 {
		self.last_issued += 1;
		self.in_flight.insert(self.last_issued);
		trace!(generation = self.last_issued, in_flight = self.in_flight.len(), "generation issued");
		self.last_issued
	}

	/// Removes `id` from the in-flight set. Idempotent.
	pub fn resolve(&mut self, id: u64) {
		if self.in_flight.remove(&id) {
			trace!(generation = id, in_flight = self.in_flight.len(), "generation resolved");
		}
	}

	/// True iff `id` is the most recently issued generation.
	pub fn is_current(&self, id: u64) -> bool {
		id == self.last_issued
	}

	/// True while any generation's computation or deferred commit is
	/// unresolved.
	pub fn has_in_flight(&self) -> bool {
		!self.in_flight.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_strictly_increase() {
		let mut ledger = GenerationLedger::default();
		let a = ledger.issue();
		let b = ledger.issue();
		let c = ledger.issue();
		assert!(a < b && b < c);
	}

	#[test]
	fn only_last_issued_is_current() {
		let mut ledger = GenerationLedger::default();
		let a = ledger.issue();
		let b = ledger.issue();
		assert!(!ledger.is_current(a));
		assert!(ledger.is_current(b));
	}

	#[test]
	fn resolve_is_idempotent() {
		let mut ledger = GenerationLedger::default();
		let a = ledger.issue();
		assert!(ledger.has_in_flight());
		ledger.resolve(a);
		ledger.resolve(a);
		assert!(!ledger.has_in_flight());
	}

	#[test]
	fn current_survives_resolution() {
		// Resolving removes from the in-flight set but does not change
		// which id is current.
		let mut ledger = GenerationLedger::default();
		let a = ledger.issue();
		ledger.resolve(a);
		assert!(ledger.is_current(a));
	}
}
