use splice_diff::{DiffItem, EditOp, EditScript};

/// Renderer-side consumer of patch operations.
///
/// Calls arrive in the exact order the edit script was produced; positions
/// are valid only under that ordering. One committed generation produces
/// exactly one uninterrupted invocation sequence — never partial, never
/// retried.
pub trait PatchListener<T: DiffItem>: Send + 'static {
	/// `count` items were inserted at `pos`.
	fn on_insert(&mut self, pos: usize, count: usize);

	/// `count` items were removed at `pos`.
	fn on_remove(&mut self, pos: usize, count: usize);

	/// The item at `from` moved to `to`.
	fn on_move(&mut self, from: usize, to: usize);

	/// `count` items at `pos` changed content, with an optional
	/// partial-change payload.
	fn on_change(&mut self, pos: usize, count: usize, payload: Option<&T::Payload>);
}

/// Replays one committed edit script to the listener in emission order.
pub(crate) fn replay<T: DiffItem>(script: &EditScript<T::Payload>, listener: &mut dyn PatchListener<T>) {
	for op in script.ops() {
		match op {
			EditOp::Insert { pos, count } => listener.on_insert(*pos, *count),
			EditOp::Remove { pos, count } => listener.on_remove(*pos, *count),
			EditOp::Move { from, to } => listener.on_move(*from, *to),
			EditOp::Change { pos, count, payload } => listener.on_change(*pos, *count, payload.as_ref()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testutil::{Call, Recorder, Row};

	#[test]
	fn replay_preserves_emission_order() {
		let mut script = EditScript::new();
		script.push(EditOp::Remove { pos: 1, count: 1 });
		script.push(EditOp::Insert { pos: 2, count: 1 });
		script.push(EditOp::Move { from: 0, to: 2 });
		script.push(EditOp::Change {
			pos: 1,
			count: 2,
			payload: Some(4u32),
		});

		let mut recorder = Recorder::default();
		replay::<Row>(&script, &mut recorder);
		assert_eq!(
			recorder.calls(),
			vec![Call::Remove(1, 1), Call::Insert(2, 1), Call::Move(0, 2), Call::Change(1, 2, Some(4))]
		);
	}

	#[test]
	fn empty_script_emits_nothing() {
		let mut recorder = Recorder::default();
		replay::<Row>(&EditScript::new(), &mut recorder);
		assert!(recorder.calls().is_empty());
	}
}
