use std::future::Future;
use std::sync::OnceLock;

use tokio::task::JoinHandle;

/// Execution classes for engine tasks, carried in trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskClass {
	/// The coordinating actor task that owns all engine state.
	Coordinate,
	/// CPU-bound edit-script computation on the blocking pool.
	DiffCompute,
	/// Deferred-command timers for gated commits, mutations, and updates.
	Timer,
}

impl TaskClass {
	const fn as_str(self) -> &'static str {
		match self {
			Self::Coordinate => "coordinate",
			Self::DiffCompute => "diff_compute",
			Self::Timer => "timer",
		}
	}
}

/// The ambient runtime, or a lazily-built single-worker fallback when the
/// reconciler is spawned from outside one.
fn handle() -> tokio::runtime::Handle {
	static FALLBACK: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	match tokio::runtime::Handle::try_current() {
		Ok(handle) => handle,
		Err(_) => FALLBACK
			.get_or_init(|| {
				tokio::runtime::Builder::new_multi_thread()
					.enable_all()
					.worker_threads(1)
					.thread_name("splice-engine")
					.build()
					.expect("failed to build splice-engine fallback runtime")
			})
			.handle()
			.clone(),
	}
}

pub(crate) fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(task = class.as_str(), "reconciler task spawned");
	handle().spawn(fut)
}

pub(crate) fn spawn_blocking<F, R>(class: TaskClass, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(task = class.as_str(), "reconciler blocking task spawned");
	handle().spawn_blocking(f)
}
