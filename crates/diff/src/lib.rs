//! Item comparison capabilities and minimal edit scripts for ordered lists.
//!
//! This crate is the pure computation half of the reconciliation engine:
//! * [`DiffItem`] — the capability set items must provide (type tag, stable
//!   identity, content equality, payload diff).
//! * [`EditScript`] / [`EditOp`] — the ordered structural operations
//!   transforming one sequence into another.
//! * [`DiffStrategy`] — the pluggable seam for the edit computation, with
//!   [`IdentityMyers`] as the built-in deterministic implementation.
//!
//! Nothing here touches a runtime or shared state; inputs are frozen slices
//! and outputs are owned scripts.

mod item;
mod myers;
mod script;

pub use item::{DiffItem, same_identity};
pub use script::{EditOp, EditScript};

use thiserror::Error;

/// Failure raised by a diff strategy while computing an edit script.
///
/// A failed computation aborts only the generation it was computed for; the
/// engine's previous snapshot stays ground truth.
#[derive(Debug, Error)]
pub enum DiffError {
	/// The item comparison capability failed.
	#[error("comparison capability failed: {0}")]
	Comparison(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Pluggable minimal-edit computation between two frozen sequences.
///
/// Implementations must be deterministic (identical inputs always yield an
/// identical script) and must not mutate their inputs. The produced script
/// is replayed front-to-back; see [`EditScript`] for the position contract.
pub trait DiffStrategy<T: DiffItem>: Send + Sync + 'static {
	/// Computes the edit script transforming `old` into `new`.
	fn compute(&self, old: &[T], new: &[T]) -> Result<EditScript<T::Payload>, DiffError>;
}

/// Built-in identity-matched Myers minimal-edit strategy.
///
/// Items are aligned by [`same_identity`]; aligned pairs whose content
/// differs become `Change` ops carrying the item's payload delta. Move
/// detection is not performed — [`EditOp::Move`] exists for custom
/// strategies.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityMyers;

impl<T: DiffItem> DiffStrategy<T> for IdentityMyers {
	fn compute(&self, old: &[T], new: &[T]) -> Result<EditScript<T::Payload>, DiffError> {
		Ok(myers::diff_items(old, new))
	}
}

#[cfg(test)]
pub(crate) mod testutil {
	use crate::DiffItem;

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

		pub fn with_rev(id: u64, rev: u32) -> Self {
			Self { id, rev }
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
}
