//! Generation-tracked asynchronous list reconciliation.
//!
//! One coordinating actor task owns all mutable engine state: the frozen
//! "old" snapshot, the live sequence, the generation ledger, the commit time
//! gate, and the update throttle. Producers submit full replacement lists;
//! a minimal edit script is computed off-thread against frozen snapshots and
//! rejoins the actor as a typed command, where staleness and the time gate
//! decide whether it commits. Structural mutations and throttled single-item
//! updates funnel through the same command queue, so position-based patch
//! indices can never be corrupted by interleaving.
//!
//! Entry point: build a [`ReconcilerSpec`] and hand it to
//! [`Reconciler::spawn`], then drive the returned [`ReconcilerHandle`].

mod engine;
mod gate;
mod generation;
mod listener;
mod mutation;
mod spawn;
mod throttle;

pub use engine::{EngineError, Reconciler, ReconcilerConfig, ReconcilerHandle, ReconcilerSpec, Snapshot};
pub use listener::PatchListener;
pub use mutation::{MutateOutcome, Mutation};
pub use splice_diff::{DiffError, DiffItem, DiffStrategy, EditOp, EditScript, IdentityMyers, same_identity};

#[cfg(test)]
pub(crate) mod testutil {
	use std::sync::{Arc, Mutex};

	use crate::{DiffItem, PatchListener};

	/// Minimal item used across this crate's tests: identity is `id`,
	/// content is `(id, rev)`, payload delta is the newer `rev`.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct Row {
		pub id: u64,
		pub rev: u32,
	}

	impl Row {
		pub fn new(id: u64) -> Self {
			Self { id, rev: 0 }
		}
	}

	impl DiffItem for Row {
		type Key = u64;
		type Payload = u32;

		fn kind(&self) -> u32 {
			0
		}

		fn identity(&self) -> Self::Key {
			self.id
		}

		fn same_content(&self, other: &Self) -> bool {
			self == other
		}

		fn payload_delta(&self, newer: &Self) -> Option<Self::Payload> {
			(self.rev != newer.rev).then_some(newer.rev)
		}
	}

	pub fn rows(ids: &[u64]) -> Vec<Row> {
		ids.iter().copied().map(Row::new).collect()
	}

	/// One observed listener invocation.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub enum Call {
		Insert(usize, usize),
		Remove(usize, usize),
		Move(usize, usize),
		Change(usize, usize, Option<u32>),
	}

	/// Listener recording every call for later assertions. Clones share the
	/// same call log.
	#[derive(Debug, Clone, Default)]
	pub struct Recorder {
		calls: Arc<Mutex<Vec<Call>>>,
	}

	impl Recorder {
		pub fn calls(&self) -> Vec<Call> {
			self.calls.lock().unwrap().clone()
		}
	}

	impl PatchListener<Row> for Recorder {
		fn on_insert(&mut self, pos: usize, count: usize) {
			self.calls.lock().unwrap().push(Call::Insert(pos, count));
		}

		fn on_remove(&mut self, pos: usize, count: usize) {
			self.calls.lock().unwrap().push(Call::Remove(pos, count));
		}

		fn on_move(&mut self, from: usize, to: usize) {
			self.calls.lock().unwrap().push(Call::Move(from, to));
		}

		fn on_change(&mut self, pos: usize, count: usize, payload: Option<&u32>) {
			self.calls.lock().unwrap().push(Call::Change(pos, count, payload.copied()));
		}
	}
}
