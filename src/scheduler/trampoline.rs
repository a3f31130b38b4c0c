use std::{
  cell::RefCell,
  cmp::Ordering,
  collections::BinaryHeap,
  time::{Duration, Instant},
};

use super::{Scheduler, Task, TaskHandle};

/// Runs tasks on the calling thread, one at a time.
///
/// A task scheduled while another trampolined task runs on the same thread
/// is queued and runs after it returns, so recursive scheduling does not
/// grow the stack. The outermost `schedule` call returns once the queue is
/// empty, sleeping for delayed tasks as needed.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrampolineScheduler;

struct Queued {
  due: Instant,
  seq: u64,
  task: Task,
  handle: TaskHandle,
}

impl PartialEq for Queued {
  fn eq(&self, other: &Self) -> bool { self.due == other.due && self.seq == other.seq }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Queued {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier first, then FIFO.
    other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
  }
}

#[derive(Default)]
struct Trampoline {
  running: bool,
  seq: u64,
  queue: BinaryHeap<Queued>,
}

thread_local! {
  static TRAMPOLINE: RefCell<Trampoline> = RefCell::new(Trampoline::default());
}

impl Scheduler for TrampolineScheduler {
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let due = Instant::now() + delay.unwrap_or_default();
    let run_loop = TRAMPOLINE.with(|t| {
      let mut t = t.borrow_mut();
      let seq = t.seq;
      t.seq += 1;
      t.queue.push(Queued { due, seq, task, handle: handle.clone() });
      !std::mem::replace(&mut t.running, true)
    });
    if run_loop {
      drain();
    }
    handle
  }

  fn now(&self) -> Instant { Instant::now() }
}

fn drain() {
  loop {
    let next = TRAMPOLINE.with(|t| {
      let mut t = t.borrow_mut();
      let next = t.queue.pop();
      if next.is_none() {
        t.running = false;
      }
      next
    });
    let Some(Queued { due, task, handle, .. }) = next else { break };
    if handle.is_cancelled() {
      continue;
    }
    let now = Instant::now();
    if due > now {
      std::thread::sleep(due - now);
    }
    if !handle.is_cancelled() {
      task();
    }
    handle.mark_finished();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use super::*;

  #[test]
  fn nested_tasks_run_after_current() {
    let log = Arc::new(Mutex::new(vec![]));
    let l = log.clone();
    TrampolineScheduler.schedule(
      Box::new(move || {
        l.lock().push("outer start");
        let inner = l.clone();
        TrampolineScheduler.schedule(Box::new(move || inner.lock().push("inner")), None);
        l.lock().push("outer end");
      }),
      None,
    );
    assert_eq!(*log.lock(), vec!["outer start", "outer end", "inner"]);
  }

  #[test]
  fn delayed_tasks_run_in_due_order() {
    let log = Arc::new(Mutex::new(vec![]));
    let l = log.clone();
    TrampolineScheduler.schedule(
      Box::new(move || {
        let (a, b) = (l.clone(), l.clone());
        TrampolineScheduler.schedule(Box::new(move || a.lock().push(2)), Some(Duration::from_millis(4)));
        TrampolineScheduler.schedule(Box::new(move || b.lock().push(1)), Some(Duration::from_millis(1)));
      }),
      None,
    );
    assert_eq!(*log.lock(), vec![1, 2]);
  }
}
