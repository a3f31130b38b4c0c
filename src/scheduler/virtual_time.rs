//! Deterministic virtual time.
//!
//! Time only moves when the test says so. Tasks due within the advanced span
//! run in due order (FIFO for equal due times) on the advancing thread, and
//! tasks they schedule at or before the target run within the same call.
//!
//! ```
//! use std::time::Duration;
//! use rxflow::prelude::*;
//!
//! let scheduler = VirtualTimeScheduler::new();
//! let log = MutArc::own(vec![]);
//! let l = log.clone();
//! observable::of::<_, std::convert::Infallible>(1)
//!   .delay(Duration::from_millis(100), scheduler.clone())
//!   .subscribe(move |v| l.rc_deref_mut().push(v));
//!
//! scheduler.advance_by(Duration::from_millis(99));
//! assert!(log.rc_deref().is_empty());
//! scheduler.advance_by(Duration::from_millis(1));
//! assert_eq!(*log.rc_deref(), vec![1]);
//! ```

use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  time::{Duration, Instant},
};

use super::{Scheduler, Task, TaskHandle};
use crate::rc::MutArc;

struct Entry {
  due: Duration,
  id: u64,
  task: Task,
  handle: TaskHandle,
}

impl PartialEq for Entry {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.id == other.id }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Entry {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier times first, then FIFO by id
    other.due.cmp(&self.due).then_with(|| other.id.cmp(&self.id))
  }
}

struct State {
  origin: Instant,
  elapsed: Duration,
  queue: BinaryHeap<Entry>,
  next_id: u64,
}

/// A manually advanced clock and task queue. Clones share the clock.
#[derive(Clone)]
pub struct VirtualTimeScheduler(MutArc<State>);

impl Default for VirtualTimeScheduler {
  fn default() -> Self { Self::new() }
}

impl VirtualTimeScheduler {
  pub fn new() -> Self {
    VirtualTimeScheduler(MutArc::own(State {
      origin: Instant::now(),
      elapsed: Duration::ZERO,
      queue: BinaryHeap::new(),
      next_id: 0,
    }))
  }

  /// Virtual time elapsed since creation.
  pub fn elapsed(&self) -> Duration { self.0.rc_deref().elapsed }

  /// Advance the clock by `span`, running every task due until then.
  pub fn advance_by(&self, span: Duration) {
    let target = self.elapsed() + span;
    self.advance_to(target);
  }

  /// Advance the clock to `target` (measured from creation). Moving
  /// backwards is a no-op.
  pub fn advance_to(&self, target: Duration) {
    self.run_until(Some(target));
    let mut state = self.0.rc_deref_mut();
    if state.elapsed < target {
      state.elapsed = target;
    }
  }

  /// Run every pending task, advancing the clock as far as needed.
  ///
  /// Periodic work never drains; use `advance_by` for it.
  pub fn flush(&self) { self.run_until(None) }

  /// Pending tasks that were not cancelled.
  pub fn pending_count(&self) -> usize {
    self.0.rc_deref().queue.iter().filter(|e| !e.handle.is_cancelled()).count()
  }

  pub fn is_empty(&self) -> bool { self.pending_count() == 0 }

  fn run_until(&self, target: Option<Duration>) {
    loop {
      let entry = {
        let mut state = self.0.rc_deref_mut();
        let due = state.queue.peek().map(|e| e.due);
        match due {
          Some(due) if target.map_or(true, |t| due <= t) => {
            if state.elapsed < due {
              state.elapsed = due;
            }
            state.queue.pop()
          }
          _ => None,
        }
      };
      let Some(Entry { task, handle, .. }) = entry else { break };
      if !handle.is_cancelled() {
        task();
      }
      handle.mark_finished();
    }
  }
}

impl Scheduler for VirtualTimeScheduler {
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let mut state = self.0.rc_deref_mut();
    let id = state.next_id;
    state.next_id += 1;
    let due = state.elapsed + delay.unwrap_or_default();
    state.queue.push(Entry { due, id, task, handle: handle.clone() });
    handle
  }

  fn now(&self) -> Instant {
    let state = self.0.rc_deref();
    state.origin + state.elapsed
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscription::SubscriptionLike;

  fn push(log: &MutArc<Vec<&'static str>>, tag: &'static str) -> Task {
    let log = log.clone();
    Box::new(move || log.rc_deref_mut().push(tag))
  }

  #[test]
  fn runs_in_due_then_fifo_order() {
    let scheduler = VirtualTimeScheduler::new();
    let log = MutArc::own(vec![]);
    scheduler.schedule(push(&log, "b"), Some(Duration::from_millis(20)));
    scheduler.schedule(push(&log, "a1"), Some(Duration::from_millis(10)));
    scheduler.schedule(push(&log, "a2"), Some(Duration::from_millis(10)));

    scheduler.advance_by(Duration::from_millis(10));
    assert_eq!(*log.rc_deref(), vec!["a1", "a2"]);
    assert_eq!(scheduler.elapsed(), Duration::from_millis(10));
    assert_eq!(scheduler.pending_count(), 1);

    scheduler.flush();
    assert_eq!(*log.rc_deref(), vec!["a1", "a2", "b"]);
    assert!(scheduler.is_empty());
  }

  #[test]
  fn clock_tracks_virtual_time() {
    let scheduler = VirtualTimeScheduler::new();
    let start = scheduler.now();
    scheduler.advance_by(Duration::from_secs(3600));
    assert_eq!(scheduler.now() - start, Duration::from_secs(3600));
  }

  #[test]
  fn tasks_scheduled_by_tasks_run_within_span() {
    let scheduler = VirtualTimeScheduler::new();
    let log = MutArc::own(vec![]);
    let (s, l) = (scheduler.clone(), log.clone());
    scheduler.schedule(
      Box::new(move || {
        l.rc_deref_mut().push("first");
        s.schedule(push(&l, "second"), Some(Duration::from_millis(5)));
      }),
      Some(Duration::from_millis(5)),
    );
    scheduler.advance_by(Duration::from_millis(10));
    assert_eq!(*log.rc_deref(), vec!["first", "second"]);
  }

  #[test]
  fn cancelled_tasks_do_not_run() {
    let scheduler = VirtualTimeScheduler::new();
    let log = MutArc::own(vec![]);
    let handle = scheduler.schedule(push(&log, "x"), Some(Duration::from_millis(1)));
    handle.unsubscribe();
    assert_eq!(scheduler.pending_count(), 0);
    scheduler.flush();
    assert!(log.rc_deref().is_empty());
  }
}
