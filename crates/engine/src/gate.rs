use std::time::Duration;

use tokio::time::Instant;

/// Earliest-commit time gate.
///
/// A full-list replacement is assumed to cost the renderer proportionally to
/// the replaced list's size, so each commit pushes the next allowed commit
/// instant out by `size × per_item`. The deadline is non-decreasing between
/// commits: it is only re-armed from inside a commit, which requires the
/// previous deadline to have passed.
#[derive(Debug)]
pub(crate) struct CommitGate {
	per_item: Duration,
	deadline: Instant,
}

impl CommitGate {
	pub fn new(per_item: Duration) -> Self {
		Self {
			per_item,
			deadline: Instant::now(),
		}
	}

	/// Re-arms the gate after committing a snapshot of `size` items.
	pub fn arm(&mut self, size: usize) {
		let n = u32::try_from(size).unwrap_or(u32::MAX);
		self.deadline = Instant::now() + self.per_item.saturating_mul(n);
	}

	/// Time left until the next full-list commit may apply. Zero means the
	/// commit proceeds synchronously.
	pub fn time_remaining(&self) -> Duration {
		self.deadline.duration_since(Instant::now())
	}
}
