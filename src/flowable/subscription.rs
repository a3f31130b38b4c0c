//! Demand signalling between a flowable source and its subscriber.

use std::{
  fmt::{Debug, Formatter},
  sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc,
  },
};

use tracing::warn;

use crate::subscription::SubscriptionLike;

/// Demand value meaning "deliver without limit". Once reached, demand stays
/// unbounded.
pub const UNBOUNDED: u64 = u64::MAX;

/// Outstanding demand of one subscription.
///
/// Requests add to the counter, saturating at [`UNBOUNDED`]; deliveries
/// claim from it. An unbounded counter is never decremented.
#[derive(Debug, Default)]
pub struct DemandCounter(AtomicU64);

impl DemandCounter {
  pub fn new() -> Self { Self::default() }

  /// Add `n` to the outstanding demand and return the previous value.
  pub fn add(&self, n: u64) -> u64 {
    match self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
      (current != UNBOUNDED).then(|| current.saturating_add(n))
    }) {
      Ok(previous) | Err(previous) => previous,
    }
  }

  pub fn get(&self) -> u64 { self.0.load(Ordering::Acquire) }

  pub fn is_unbounded(&self) -> bool { self.get() == UNBOUNDED }

  /// Take one unit of demand for a delivery about to happen. Returns
  /// `false` when there is none.
  pub fn try_claim(&self) -> bool {
    self
      .0
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| match current {
        0 => None,
        UNBOUNDED => Some(UNBOUNDED),
        n => Some(n - 1),
      })
      .is_ok()
  }

  /// Account for `n` values already delivered.
  ///
  /// # Panics
  ///
  /// If `n` exceeds the outstanding demand. Every source in this crate
  /// claims demand before delivering, so this only fires on a broken source.
  pub fn produced(&self, n: u64) {
    let result = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
      if current == UNBOUNDED {
        Some(UNBOUNDED)
      } else {
        current.checked_sub(n)
      }
    });
    if let Err(current) = result {
      panic!("protocol violation: {n} value(s) delivered against an outstanding demand of {current}");
    }
  }
}

/// The producer side of a [`FlowSubscription`].
pub trait FlowControl: Send + Sync {
  /// Grant `n` more deliveries. Never called with `0`.
  fn request(&self, n: u64);

  /// Stop delivering and release upstream resources. Idempotent.
  fn cancel(&self);

  fn is_cancelled(&self) -> bool;
}

/// Handle a flowable subscriber uses to request values and to cancel.
#[derive(Clone)]
pub struct FlowSubscription(Arc<dyn FlowControl>);

impl FlowSubscription {
  pub fn new(control: impl FlowControl + 'static) -> Self { FlowSubscription(Arc::new(control)) }

  pub fn from_arc(control: Arc<dyn FlowControl>) -> Self { FlowSubscription(control) }

  /// A subscription with nothing behind it, for sources that terminate
  /// right away.
  pub fn empty() -> Self { FlowSubscription::new(Finished::default()) }

  /// Grant `n` more values. `request(0)` is ignored.
  pub fn request(&self, n: u64) {
    if n == 0 {
      warn!("request(0) ignored");
      return;
    }
    self.0.request(n)
  }

  pub fn cancel(&self) { self.0.cancel() }

  pub fn is_cancelled(&self) -> bool { self.0.is_cancelled() }
}

impl SubscriptionLike for FlowSubscription {
  fn unsubscribe(&self) { self.cancel() }

  fn is_closed(&self) -> bool { self.is_cancelled() }
}

impl Debug for FlowSubscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FlowSubscription").field("is_cancelled", &self.is_cancelled()).finish()
  }
}

#[derive(Default)]
struct Finished(AtomicBool);

impl FlowControl for Finished {
  fn request(&self, _: u64) {}

  fn cancel(&self) { self.0.store(true, Ordering::Release) }

  fn is_cancelled(&self) -> bool { self.0.load(Ordering::Acquire) }
}

/// Work-in-progress counter serializing drain passes.
///
/// Whoever moves the counter off zero runs the drain loop; everybody else
/// only records that another pass is needed.
///
/// ```ignore
/// if !wip.enter() {
///   return;
/// }
/// let mut missed = 1;
/// loop {
///   // one drain pass
///   if !wip.leave(&mut missed) {
///     break;
///   }
/// }
/// ```
#[derive(Debug, Default)]
pub(crate) struct WorkInProgress(AtomicUsize);

impl WorkInProgress {
  pub(crate) fn enter(&self) -> bool { self.0.fetch_add(1, Ordering::AcqRel) == 0 }

  /// Finish a pass. Returns `true` if more work arrived meanwhile.
  pub(crate) fn leave(&self, missed: &mut usize) -> bool {
    *missed = self.0.fetch_sub(*missed, Ordering::AcqRel) - *missed;
    *missed != 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn demand_saturates_at_unbounded() {
    let demand = DemandCounter::new();
    demand.add(3);
    demand.add(UNBOUNDED - 1);
    assert!(demand.is_unbounded());
    assert!(demand.try_claim());
    demand.add(5);
    assert!(demand.is_unbounded());
  }

  #[test]
  fn claims_until_exhausted() {
    let demand = DemandCounter::new();
    assert!(!demand.try_claim());
    demand.add(2);
    assert!(demand.try_claim());
    assert!(demand.try_claim());
    assert!(!demand.try_claim());
    assert_eq!(demand.get(), 0);
  }

  #[test]
  #[should_panic(expected = "protocol violation")]
  fn over_production_panics() {
    let demand = DemandCounter::new();
    demand.add(1);
    demand.produced(2);
  }

  #[test]
  fn request_zero_is_ignored() {
    struct Recorder(AtomicU64);
    impl FlowControl for Recorder {
      fn request(&self, n: u64) { self.0.fetch_add(n, Ordering::SeqCst); }
      fn cancel(&self) {}
      fn is_cancelled(&self) -> bool { false }
    }
    let recorder = Arc::new(Recorder(AtomicU64::new(0)));
    let subscription = FlowSubscription::from_arc(recorder.clone());
    subscription.request(0);
    subscription.request(2);
    assert_eq!(recorder.0.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn work_in_progress_records_missed_passes() {
    let wip = WorkInProgress::default();
    assert!(wip.enter());
    assert!(!wip.enter());
    let mut missed = 1;
    assert!(wip.leave(&mut missed));
    assert_eq!(missed, 1);
    assert!(!wip.leave(&mut missed));
    assert!(wip.enter());
  }
}
