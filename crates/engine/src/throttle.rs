use std::time::Duration;

use tokio::time::Instant;

/// Pacing decision for one single-item update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pace {
	Immediate,
	After(Duration),
}

/// Forward-only watermark pacing single-item updates `step` apart.
///
/// The watermark advances on every scheduling decision, so a burst of
/// requests turns into a steady train of applications spaced exactly `step`
/// apart. Sequences below `small_threshold` skip pacing entirely — the
/// renderer can absorb updates to a small list at any rate.
#[derive(Debug)]
pub(crate) struct UpdateThrottle {
	step: Duration,
	small_threshold: usize,
	watermark: Instant,
}

impl UpdateThrottle {
	pub fn new(step: Duration, small_threshold: usize) -> Self {
		Self {
			step,
			small_threshold,
			watermark: Instant::now(),
		}
	}

	/// Decides when an update against a sequence of `live_len` items may
	/// apply, advancing the watermark either way.
	pub fn schedule(&mut self, live_len: usize) -> Pace {
		let now = Instant::now();
		if now > self.watermark || live_len < self.small_threshold {
			self.watermark = now + self.step;
			Pace::Immediate
		} else {
			let delay = self.watermark.duration_since(now);
			self.watermark += self.step;
			Pace::After(delay)
		}
	}
}
