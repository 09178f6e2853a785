use std::sync::Arc;
use std::time::Duration;

use splice_diff::{DiffError, DiffItem, DiffStrategy, EditScript, IdentityMyers};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::gate::CommitGate;
use crate::generation::GenerationLedger;
use crate::listener::{PatchListener, replay};
use crate::mutation::{MutateOutcome, Mutation};
use crate::spawn::{self, TaskClass};
use crate::throttle::{Pace, UpdateThrottle};

/// Immutable committed list state. Reference identity (`Arc::ptr_eq`) is
/// meaningful: resubmitting the identical snapshot is an idempotent no-op.
pub type Snapshot<T> = Arc<[T]>;

type Matcher<T> = Box<dyn Fn(&T) -> bool + Send>;
type UpdateFn<T> = Box<dyn Fn(&T) -> T + Send>;

/// Error surfaced by [`ReconcilerHandle`] operations.
#[derive(Debug, Error)]
pub enum EngineError {
	/// The coordinating task has shut down; no further commands are accepted.
	#[error("reconciler command queue is closed")]
	Closed,
}

/// Tuning knobs for one reconciler instance.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
	/// Per-item delay constant K: each commit pushes the next allowed commit
	/// out by `committed size × K`, and bursts of single-item updates are
	/// spaced K apart.
	pub per_item_delay: Duration,
	/// Sequences shorter than this skip update pacing entirely.
	pub small_list_threshold: usize,
	/// Bound on the command queue; producers back-pressure past it.
	pub queue_capacity: usize,
}

impl Default for ReconcilerConfig {
	fn default() -> Self {
		Self {
			per_item_delay: Duration::from_millis(5),
			small_list_threshold: 100,
			queue_capacity: 128,
		}
	}
}

/// Builder spec for one reconciler.
pub struct ReconcilerSpec<T: DiffItem, L: PatchListener<T>> {
	listener: L,
	strategy: Arc<dyn DiffStrategy<T>>,
	config: ReconcilerConfig,
}

impl<T: DiffItem, L: PatchListener<T>> ReconcilerSpec<T, L> {
	/// Creates a spec dispatching patches to `listener`, with the built-in
	/// [`IdentityMyers`] strategy and default configuration.
	pub fn new(listener: L) -> Self {
		Self {
			listener,
			strategy: Arc::new(IdentityMyers),
			config: ReconcilerConfig::default(),
		}
	}

	/// Replaces the diff strategy.
	#[must_use]
	pub fn strategy(mut self, strategy: impl DiffStrategy<T>) -> Self {
		self.strategy = Arc::new(strategy);
		self
	}

	/// Replaces the configuration.
	#[must_use]
	pub fn config(mut self, config: ReconcilerConfig) -> Self {
		self.config = config;
		self
	}
}

/// Commands drained by the coordinating task. Worker completions and timer
/// fires rejoin the queue as commands, so every state transition is
/// serialized through one owner.
enum Command<T: DiffItem> {
	/// Full-list replacement; `None` clears.
	Submit { payload: Option<Snapshot<T>> },
	/// A diff worker finished computing `generation`'s script.
	DiffResolved {
		generation: u64,
		new: Snapshot<T>,
		script: EditScript<T::Payload>,
	},
	/// A diff worker failed; the generation resolves without committing.
	DiffFailed { generation: u64, error: DiffError },
	/// A gated commit's timer fired.
	CommitDue {
		generation: u64,
		new: Snapshot<T>,
		script: EditScript<T::Payload>,
	},
	/// Structural mutation request.
	Mutate {
		mutation: Mutation<T>,
		ack: oneshot::Sender<MutateOutcome>,
	},
	/// A scheduled mutation's timer fired; applies unconditionally.
	MutateDue { mutation: Mutation<T> },
	/// Throttled single-item update request.
	Update { matcher: Matcher<T>, update: UpdateFn<T> },
	/// A paced update's timer fired; re-matches against the live sequence.
	UpdateDue { matcher: Matcher<T>, update: UpdateFn<T> },
	/// Serialized read of the live sequence.
	Inspect { reply: oneshot::Sender<Vec<T>> },
}

/// All mutable engine state, owned exclusively by the coordinating task.
struct EngineState<T: DiffItem> {
	listener: Box<dyn PatchListener<T>>,
	strategy: Arc<dyn DiffStrategy<T>>,
	generations: GenerationLedger,
	gate: CommitGate,
	throttle: UpdateThrottle,
	/// Frozen snapshot diffs are computed against.
	old: Option<Snapshot<T>>,
	/// The live sequence consumers observe via `current()`.
	live: Vec<T>,
	/// Weak so the queue closes once all external handles drop; upgraded
	/// only for the lifetime of a worker or timer task.
	tx: mpsc::WeakSender<Command<T>>,
	cancel: CancellationToken,
}

impl<T: DiffItem> EngineState<T> {
	fn handle(&mut self, cmd: Command<T>) {
		match cmd {
			Command::Submit { payload } => self.on_submit(payload),
			Command::DiffResolved { generation, new, script } => self.on_diff_resolved(generation, new, script),
			Command::DiffFailed { generation, error } => {
				warn!(generation, error = %error, "diff computation failed; generation abandoned");
				self.generations.resolve(generation);
			}
			Command::CommitDue { generation, new, script } => {
				if self.generations.is_current(generation) {
					self.commit(generation, new, script);
				} else {
					trace!(generation, "deferred commit superseded");
				}
				self.generations.resolve(generation);
			}
			Command::Mutate { mutation, ack } => {
				let outcome = self.on_mutate(mutation);
				let _ = ack.send(outcome);
			}
			Command::MutateDue { mutation } => {
				mutation.apply(&mut self.live, self.listener.as_mut());
				self.resync();
			}
			Command::Update { matcher, update } => self.on_update(matcher, update),
			Command::UpdateDue { matcher, update } => self.apply_update(matcher, update),
			Command::Inspect { reply } => {
				let _ = reply.send(self.live.clone());
			}
		}
	}

	fn on_submit(&mut self, payload: Option<Snapshot<T>>) {
		let generation = self.generations.issue();
		match payload {
			None => {
				let count = self.live.len();
				self.live.clear();
				self.old = None;
				if count > 0 {
					debug!(generation, count, "sequence cleared");
					self.listener.on_remove(0, count);
				}
				self.generations.resolve(generation);
			}
			Some(new) => match &self.old {
				Some(old) if Arc::ptr_eq(old, &new) => {
					trace!(generation, "identical snapshot resubmitted");
					self.generations.resolve(generation);
				}
				Some(old) => self.spawn_diff(generation, Arc::clone(old), new),
				None => {
					// Nothing to diff against: the first snapshot installs
					// synchronously as one insertion.
					self.live = new.to_vec();
					self.gate.arm(new.len());
					if !new.is_empty() {
						debug!(generation, size = new.len(), "initial snapshot installed");
						self.listener.on_insert(0, new.len());
					}
					self.old = Some(new);
					self.generations.resolve(generation);
				}
			},
		}
	}

	fn spawn_diff(&self, generation: u64, old: Snapshot<T>, new: Snapshot<T>) {
		let Some(tx) = self.tx.upgrade() else {
			return;
		};
		let strategy = Arc::clone(&self.strategy);
		spawn::spawn_blocking(TaskClass::DiffCompute, move || {
			let cmd = match strategy.compute(&old, &new) {
				Ok(script) => Command::DiffResolved { generation, new, script },
				Err(error) => Command::DiffFailed { generation, error },
			};
			let _ = tx.blocking_send(cmd);
		});
	}

	fn on_diff_resolved(&mut self, generation: u64, new: Snapshot<T>, script: EditScript<T::Payload>) {
		if !self.generations.is_current(generation) {
			trace!(generation, "stale diff result discarded");
			self.generations.resolve(generation);
			return;
		}
		let remaining = self.gate.time_remaining();
		if remaining.is_zero() {
			self.commit(generation, new, script);
			self.generations.resolve(generation);
		} else {
			// The generation stays in flight until the deferred commit
			// resolves, keeping mutations refused meanwhile.
			trace!(generation, delay_ms = remaining.as_millis() as u64, "commit gated");
			self.post_after(remaining, Command::CommitDue { generation, new, script });
		}
	}

	fn commit(&mut self, generation: u64, new: Snapshot<T>, script: EditScript<T::Payload>) {
		replay(&script, self.listener.as_mut());
		self.live = new.to_vec();
		self.gate.arm(new.len());
		debug!(generation, size = new.len(), ops = script.len(), "snapshot committed");
		self.old = Some(new);
	}

	fn on_mutate(&mut self, mutation: Mutation<T>) -> MutateOutcome {
		if self.generations.has_in_flight() {
			warn!("mutation refused: diff computation in flight");
			return MutateOutcome::RejectedInFlight;
		}
		let remaining = self.gate.time_remaining();
		if remaining.is_zero() {
			mutation.apply(&mut self.live, self.listener.as_mut());
			self.resync();
			MutateOutcome::Applied
		} else {
			// Scheduled mutations always fire; they apply against whatever
			// the live sequence is at fire time.
			self.post_after(remaining, Command::MutateDue { mutation });
			MutateOutcome::Scheduled
		}
	}

	fn on_update(&mut self, matcher: Matcher<T>, update: UpdateFn<T>) {
		match self.throttle.schedule(self.live.len()) {
			Pace::Immediate => self.apply_update(matcher, update),
			Pace::After(delay) => self.post_after(delay, Command::UpdateDue { matcher, update }),
		}
	}

	/// Replaces every matching live item, emitting a change per position.
	/// Deferred updates land here too, so matching is always against the
	/// current sequence rather than a stale index.
	fn apply_update(&mut self, matcher: Matcher<T>, update: UpdateFn<T>) {
		let mut touched = false;
		for pos in 0..self.live.len() {
			if !matcher(&self.live[pos]) {
				continue;
			}
			let replacement = update(&self.live[pos]);
			let payload = self.live[pos].payload_delta(&replacement);
			self.live[pos] = replacement;
			self.listener.on_change(pos, 1, payload.as_ref());
			touched = true;
		}
		if touched {
			self.resync();
		}
	}

	/// Re-freezes the snapshot from the live sequence after an in-place edit.
	fn resync(&mut self) {
		self.old = Some(Arc::from(self.live.as_slice()));
	}

	/// Posts `cmd` back to the queue after `delay` via a timer task. The
	/// coordinating task never sleeps; timers abort on shutdown.
	fn post_after(&self, delay: Duration, cmd: Command<T>) {
		let Some(tx) = self.tx.upgrade() else {
			return;
		};
		let cancel = self.cancel.clone();
		spawn::spawn(TaskClass::Timer, async move {
			tokio::select! {
				biased;
				_ = cancel.cancelled() => {}
				() = tokio::time::sleep(delay) => {
					let _ = tx.send(cmd).await;
				}
			}
		});
	}
}

async fn run<T: DiffItem>(mut state: EngineState<T>, mut rx: mpsc::Receiver<Command<T>>, cancel: CancellationToken) {
	loop {
		let cmd = tokio::select! {
			biased;
			_ = cancel.cancelled() => break,
			msg = rx.recv() => {
				let Some(cmd) = msg else { break };
				cmd
			}
		};
		state.handle(cmd);
	}
	debug!("reconciler stopped");
}

/// Entry point: spawns the coordinating task for a [`ReconcilerSpec`].
pub struct Reconciler;

impl Reconciler {
	pub fn spawn<T, L>(spec: ReconcilerSpec<T, L>) -> ReconcilerHandle<T>
	where
		T: DiffItem,
		L: PatchListener<T>,
	{
		let (tx, rx) = mpsc::channel(spec.config.queue_capacity);
		let cancel = CancellationToken::new();
		let state = EngineState {
			listener: Box::new(spec.listener),
			strategy: spec.strategy,
			generations: GenerationLedger::default(),
			gate: CommitGate::new(spec.config.per_item_delay),
			throttle: UpdateThrottle::new(spec.config.per_item_delay, spec.config.small_list_threshold),
			old: None,
			live: Vec::new(),
			tx: tx.downgrade(),
			cancel: cancel.clone(),
		};
		let join = spawn::spawn(TaskClass::Coordinate, run(state, rx, cancel.clone()));
		ReconcilerHandle {
			tx,
			cancel,
			join: Arc::new(tokio::sync::Mutex::new(Some(join))),
		}
	}
}

/// External handle to one running reconciler. Cloneable; the coordinating
/// task stops when every handle is dropped or [`shutdown`] is called.
///
/// [`shutdown`]: ReconcilerHandle::shutdown
pub struct ReconcilerHandle<T: DiffItem> {
	tx: mpsc::Sender<Command<T>>,
	cancel: CancellationToken,
	join: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl<T: DiffItem> Clone for ReconcilerHandle<T> {
	fn clone(&self) -> Self {
		Self {
			tx: self.tx.clone(),
			cancel: self.cancel.clone(),
			join: Arc::clone(&self.join),
		}
	}
}

impl<T: DiffItem> ReconcilerHandle<T> {
	/// Submits a full replacement list for asynchronous reconciliation.
	pub async fn submit(&self, sequence: impl Into<Snapshot<T>>) -> Result<(), EngineError> {
		self.send(Command::Submit {
			payload: Some(sequence.into()),
		})
		.await
	}

	/// Clears the sequence synchronously on the coordinating task. Valid with
	/// no prior snapshot.
	pub async fn clear(&self) -> Result<(), EngineError> {
		self.send(Command::Submit { payload: None }).await
	}

	/// Requests a structural mutation; resolves with how it was disposed of.
	pub async fn mutate(&self, mutation: Mutation<T>) -> Result<MutateOutcome, EngineError> {
		let (ack, outcome) = oneshot::channel();
		self.send(Command::Mutate { mutation, ack }).await?;
		outcome.await.map_err(|_| EngineError::Closed)
	}

	/// Requests a throttled update of every item accepted by `matcher`,
	/// replaced via `update`.
	pub async fn request_update(
		&self,
		matcher: impl Fn(&T) -> bool + Send + 'static,
		update: impl Fn(&T) -> T + Send + 'static,
	) -> Result<(), EngineError> {
		self.send(Command::Update {
			matcher: Box::new(matcher),
			update: Box::new(update),
		})
		.await
	}

	/// Reads the live sequence, serialized through the coordinating task.
	pub async fn current(&self) -> Result<Vec<T>, EngineError> {
		let (reply, sequence) = oneshot::channel();
		self.send(Command::Inspect { reply }).await?;
		sequence.await.map_err(|_| EngineError::Closed)
	}

	/// Cancels the coordinating task and joins it. Idempotent; concurrent
	/// callers other than the first may return before the task settles.
	pub async fn shutdown(&self) {
		self.cancel.cancel();
		let handle = self.join.lock().await.take();
		if let Some(handle) = handle {
			let _ = handle.await;
		}
	}

	async fn send(&self, cmd: Command<T>) -> Result<(), EngineError> {
		self.tx.send(cmd).await.map_err(|_| EngineError::Closed)
	}
}

#[cfg(test)]
mod tests {
	use splice_diff::EditOp;

	use super::*;
	use crate::testutil::{Call, Recorder, Row, rows};

	#[tokio::test]
	async fn shutdown_is_idempotent() {
		let handle = Reconciler::spawn(ReconcilerSpec::new(Recorder::default()));
		handle.submit(rows(&[1, 2])).await.unwrap();
		handle.shutdown().await;
		handle.shutdown().await;
	}

	#[tokio::test]
	async fn commands_fail_after_shutdown() {
		let handle = Reconciler::spawn(ReconcilerSpec::new(Recorder::default()));
		handle.shutdown().await;
		assert!(matches!(handle.submit(rows(&[1])).await, Err(EngineError::Closed)));
		assert!(matches!(handle.current().await, Err(EngineError::Closed)));
	}

	#[tokio::test]
	async fn fresh_engine_reads_empty() {
		let handle = Reconciler::spawn(ReconcilerSpec::new(Recorder::default()));
		assert!(handle.current().await.unwrap().is_empty());
		handle.shutdown().await;
	}

	// Drives the state machine command by command: a deferred commit whose
	// generation is superseded while waiting at the gate must be discarded
	// at fire time, and must still resolve its generation.
	#[tokio::test(start_paused = true)]
	async fn deferred_commit_superseded_at_fire_time_is_discarded() {
		let recorder = Recorder::default();
		let (tx, _rx) = mpsc::channel(8);
		let mut state: EngineState<Row> = EngineState {
			listener: Box::new(recorder.clone()),
			strategy: Arc::new(IdentityMyers),
			generations: GenerationLedger::default(),
			gate: CommitGate::new(Duration::from_millis(5)),
			throttle: UpdateThrottle::new(Duration::from_millis(5), 100),
			old: None,
			live: Vec::new(),
			tx: tx.downgrade(),
			cancel: CancellationToken::new(),
		};

		state.handle(Command::Submit {
			payload: Some(rows(&[1, 2]).into()),
		});

		// The install closed the gate for 10ms, so this result is deferred
		// rather than committed; its generation stays in flight.
		let generation = state.generations.issue();
		let new: Snapshot<Row> = rows(&[1, 2, 3]).into();
		let mut script = EditScript::new();
		script.push(EditOp::Insert { pos: 2, count: 1 });
		state.on_diff_resolved(generation, Snapshot::clone(&new), script.clone());
		assert!(state.generations.has_in_flight());

		// A newer submission lands before the gate opens.
		state.handle(Command::Submit { payload: None });

		state.handle(Command::CommitDue { generation, new, script });
		assert!(!state.generations.has_in_flight());
		assert!(state.live.is_empty());
		assert_eq!(recorder.calls(), vec![Call::Insert(0, 2), Call::Remove(0, 2)]);
	}
}
