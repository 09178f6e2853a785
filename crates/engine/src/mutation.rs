use splice_diff::{DiffItem, same_identity};
use tracing::trace;

use crate::listener::PatchListener;

/// Structural edit against the live sequence.
///
/// Mutations bypass diff computation entirely: the edit is applied directly
/// and the matching patch notification is emitted. Out-of-range positions
/// clamp to the sequence bounds rather than erroring.
#[derive(Debug, Clone)]
pub enum Mutation<T: DiffItem> {
	/// Append items at the end of the sequence.
	Append { items: Vec<T> },
	/// Insert items before `pos`, clamped to the sequence length.
	Insert { pos: usize, items: Vec<T> },
	/// Remove up to `count` items starting at `pos`.
	Remove { pos: usize, count: usize },
	/// Remove the first item sharing `reference`'s identity.
	RemoveMatching { reference: T },
}

/// How the engine disposed of a mutation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutateOutcome {
	/// Applied synchronously; notifications already emitted.
	Applied,
	/// The commit gate was closed; the mutation will apply when it opens.
	Scheduled,
	/// A diff computation is in flight; the mutation was refused.
	RejectedInFlight,
}

impl<T: DiffItem> Mutation<T> {
	/// Applies this mutation to `live`, emitting the corresponding patch
	/// notification. A zero-effect mutation emits nothing.
	pub(crate) fn apply(self, live: &mut Vec<T>, listener: &mut dyn PatchListener<T>) {
		match self {
			Mutation::Append { items } => {
				if items.is_empty() {
					return;
				}
				let pos = live.len();
				let count = items.len();
				live.extend(items);
				trace!(pos, count, "append applied");
				listener.on_insert(pos, count);
			}
			Mutation::Insert { pos, items } => {
				if items.is_empty() {
					return;
				}
				let pos = pos.min(live.len());
				let count = items.len();
				live.splice(pos..pos, items);
				trace!(pos, count, "insert applied");
				listener.on_insert(pos, count);
			}
			Mutation::Remove { pos, count } => {
				if pos >= live.len() {
					return;
				}
				let count = count.min(live.len() - pos);
				if count == 0 {
					return;
				}
				live.drain(pos..pos + count);
				trace!(pos, count, "remove applied");
				listener.on_remove(pos, count);
			}
			Mutation::RemoveMatching { reference } => {
				let Some(pos) = live.iter().position(|item| same_identity(item, &reference)) else {
					return;
				};
				live.remove(pos);
				trace!(pos, "matching item removed");
				listener.on_remove(pos, 1);
			}
		}
	}
}
