use std::time::{Duration, Instant};

use super::{Scheduler, Task, TaskHandle};

/// Runs every task synchronously on the calling thread.
///
/// A delayed task blocks the caller for the delay before running. Not meant
/// for periodic work: a repeating task never returns control.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  fn schedule(&self, task: Task, delay: Option<Duration>) -> TaskHandle {
    if let Some(delay) = delay.filter(|d| !d.is_zero()) {
      std::thread::sleep(delay);
    }
    task();
    TaskHandle::finished()
  }

  fn now(&self) -> Instant { Instant::now() }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;
  use crate::subscription::SubscriptionLike;

  #[test]
  fn runs_before_returning() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let start = Instant::now();
    let handle = ImmediateScheduler.schedule(
      Box::new(move || {
        h.fetch_add(1, Ordering::SeqCst);
      }),
      Some(Duration::from_millis(5)),
    );
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() >= Duration::from_millis(5));
    assert!(handle.is_closed());
  }
}
