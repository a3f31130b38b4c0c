//! Execution contexts.
//!
//! A [`Scheduler`] runs a unit of work now or after a delay and hands back a
//! [`TaskHandle`] that cancels the work if it has not started yet.
//! Schedulers are explicit values passed to the operators that need them;
//! there is no global default.
//!
//! | Scheduler | Runs tasks |
//! |---|---|
//! | [`ImmediateScheduler`] | synchronously on the caller, sleeping for delays |
//! | [`TrampolineScheduler`] | on the caller, queued behind the running task |
//! | [`ThreadPoolScheduler`] | on a fixed pool of worker threads |
//! | [`VirtualTimeScheduler`] | when the test advances virtual time |
//! | `TokioScheduler` | on a tokio runtime (`tokio-scheduler` feature) |

use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::subscription::SubscriptionLike;

mod immediate;
mod thread_pool;
#[cfg(feature = "tokio-scheduler")]
mod tokio_scheduler;
mod trampoline;
mod virtual_time;

pub use immediate::ImmediateScheduler;
pub use thread_pool::ThreadPoolScheduler;
#[cfg(feature = "tokio-scheduler")]
pub use tokio_scheduler::TokioScheduler;
pub use trampoline::TrampolineScheduler;
pub use virtual_time::VirtualTimeScheduler;

/// A unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// An execution context.
pub trait Scheduler: Send + Sync {
  /// Run `task` after `delay`, or as soon as possible for `None`.
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle;

  /// The scheduler's clock. Virtual schedulers report virtual time.
  fn now(&self) -> Instant;
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    (**self).schedule(task, delay)
  }

  fn now(&self) -> Instant { (**self).now() }
}

struct HandleState {
  cancelled: AtomicBool,
  finished: AtomicBool,
  on_cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

/// Cancellation handle of a scheduled task.
#[derive(Clone)]
pub struct TaskHandle(Arc<HandleState>);

impl TaskHandle {
  pub fn new() -> Self {
    TaskHandle(Arc::new(HandleState {
      cancelled: AtomicBool::new(false),
      finished: AtomicBool::new(false),
      on_cancel: Mutex::new(None),
    }))
  }

  /// A handle for work that already ran.
  pub fn finished() -> Self {
    let handle = Self::new();
    handle.mark_finished();
    handle
  }

  pub fn is_cancelled(&self) -> bool { self.0.cancelled.load(Ordering::Acquire) }

  pub fn is_finished(&self) -> bool { self.0.finished.load(Ordering::Acquire) }

  pub fn mark_finished(&self) {
    self.0.finished.store(true, Ordering::Release);
    self.0.on_cancel.lock().take();
  }

  /// Run `f` when the handle is cancelled. Runs immediately if it already
  /// was.
  pub fn set_on_cancel(&self, f: impl FnOnce() + Send + 'static) {
    if self.is_cancelled() {
      f();
      return;
    }
    *self.0.on_cancel.lock() = Some(Box::new(f));
    if self.is_cancelled() {
      let f = self.0.on_cancel.lock().take();
      if let Some(f) = f {
        f()
      }
    }
  }
}

impl Default for TaskHandle {
  fn default() -> Self { Self::new() }
}

impl SubscriptionLike for TaskHandle {
  fn unsubscribe(&self) {
    if self.0.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    let on_cancel = self.0.on_cancel.lock().take();
    if let Some(f) = on_cancel {
      f()
    }
  }

  fn is_closed(&self) -> bool { self.is_cancelled() || self.is_finished() }
}

/// Run `task` every `period`, first after one period, until the returned
/// handle is cancelled. The tick index is passed to `task`.
pub fn schedule_repeating<SD, F>(scheduler: &SD, period: Duration, task: F) -> TaskHandle
where
  SD: Scheduler + Clone + 'static,
  F: FnMut(usize) + Send + 'static,
{
  let handle = TaskHandle::new();
  let current: Arc<Mutex<Option<TaskHandle>>> = Arc::new(Mutex::new(None));
  let c_current = current.clone();
  handle.set_on_cancel(move || {
    let pending = c_current.lock().take();
    if let Some(pending) = pending {
      pending.unsubscribe();
    }
  });
  repeat(scheduler.clone(), period, Arc::new(Mutex::new(task)), handle.clone(), current, 0);
  handle
}

fn repeat<SD, F>(
  scheduler: SD, period: Duration, task: Arc<Mutex<F>>, handle: TaskHandle,
  current: Arc<Mutex<Option<TaskHandle>>>, tick: usize,
) where
  SD: Scheduler + Clone + 'static,
  F: FnMut(usize) + Send + 'static,
{
  let c_scheduler = scheduler.clone();
  let c_handle = handle.clone();
  let c_current = current.clone();
  let next = scheduler.schedule(
    Box::new(move || {
      if c_handle.is_cancelled() {
        return;
      }
      (&mut *task.lock())(tick);
      repeat(c_scheduler, period, task, c_handle, c_current, tick + 1);
    }),
    Some(period),
  );
  *current.lock() = Some(next);
  if handle.is_cancelled() {
    let pending = current.lock().take();
    if let Some(pending) = pending {
      pending.unsubscribe();
    }
  }
}
