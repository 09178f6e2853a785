/// One structural edit operation against an ordered sequence.
///
/// Positions are working coordinates under front-to-back replay: when an op
/// is applied, the sequence prefix before `pos` already equals the target
/// sequence's prefix. `Insert` and `Change` therefore pull their items from
/// the target sequence at the same positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp<P> {
	/// Insert `count` items of the target sequence at `pos`.
	Insert { pos: usize, count: usize },
	/// Remove `count` items starting at `pos`.
	Remove { pos: usize, count: usize },
	/// Remove the item at `from` and reinsert it at `to`.
	Move { from: usize, to: usize },
	/// Replace `count` items at `pos` with the target sequence's items,
	/// carrying an optional partial-change payload.
	Change { pos: usize, count: usize, payload: Option<P> },
}

/// Ordered edit script transforming one sequence into another.
///
/// Operation order is load-bearing: downstream indices are valid only when
/// the ops are replayed in exactly this order, never reordered or filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditScript<P> {
	ops: Vec<EditOp<P>>,
}

impl<P> Default for EditScript<P> {
	fn default() -> Self {
		Self::new()
	}
}

impl<P> EditScript<P> {
	/// Creates an empty script.
	pub fn new() -> Self {
		Self { ops: Vec::new() }
	}

	/// Appends one operation.
	pub fn push(&mut self, op: EditOp<P>) {
		self.ops.push(op);
	}

	/// Returns the operations in emission order.
	pub fn ops(&self) -> &[EditOp<P>] {
		&self.ops
	}

	pub fn len(&self) -> usize {
		self.ops.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ops.is_empty()
	}
}

impl<P> EditScript<P> {
	/// Replays the script onto `old`, pulling inserted and changed items
	/// from `new`. After replay, `old` equals `new` when the script was
	/// produced by a diff of the two.
	pub fn apply_to<T: Clone>(&self, old: &mut Vec<T>, new: &[T]) {
		for op in &self.ops {
			match *op {
				EditOp::Insert { pos, count } => {
					old.splice(pos..pos, new[pos..pos + count].iter().cloned());
				}
				EditOp::Remove { pos, count } => {
					old.drain(pos..pos + count);
				}
				EditOp::Move { from, to } => {
					let item = old.remove(from);
					old.insert(to, item);
				}
				EditOp::Change { pos, count, .. } => {
					old[pos..pos + count].clone_from_slice(&new[pos..pos + count]);
				}
			}
		}
	}
}
