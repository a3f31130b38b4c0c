use std::time::{Duration, Instant};

use tokio::runtime::Handle;

use super::{Scheduler, Task, TaskHandle};

/// Runs tasks on a tokio runtime.
#[derive(Clone, Debug)]
pub struct TokioScheduler(Handle);

impl TokioScheduler {
  pub fn new(handle: Handle) -> Self { TokioScheduler(handle) }

  /// Bind to the runtime of the calling context.
  ///
  /// # Panics
  ///
  /// Panics outside a tokio runtime.
  pub fn current() -> Self { TokioScheduler(Handle::current()) }
}

impl Scheduler for TokioScheduler {
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let c_handle = handle.clone();
    let join = self.0.spawn(async move {
      if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
      }
      if !c_handle.is_cancelled() {
        task();
      }
      c_handle.mark_finished();
    });
    handle.set_on_cancel(move || join.abort());
    handle
  }

  fn now(&self) -> Instant { Instant::now() }
}
