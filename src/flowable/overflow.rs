//! The boundary between a push producer and a demand-regulated subscriber.
//!
//! [`OverflowCore`] accepts pushes at any rate, forwards them while demand
//! lasts and applies its [`OverflowPolicy`] to the rest. It backs
//! `to_flowable`, `flowable::create` and the `on_backpressure_*` operators.

use std::{
  collections::VecDeque,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::{
  subscription::{DemandCounter, FlowControl, FlowSubscription, WorkInProgress, UNBOUNDED},
  FlowSubscriber,
};
use crate::{
  backpressure::{BackpressureStrategy, OverflowPolicy, RaiseFn},
  error::BackpressureError,
  observer::{Emission, Observer},
  subscription::{SharedSubscription, SubscriptionLike},
};

struct Pending<Item, Err> {
  queue: VecDeque<Item>,
  /// User terminal, delivered once the queue is drained.
  done: Option<Emission<Item, Err>>,
  /// Policy failure, delivered ahead of everything queued.
  overflow: Option<Err>,
}

pub(crate) struct OverflowCore<Item, Err, S> {
  subscriber: Mutex<Option<S>>,
  pending: Mutex<Pending<Item, Err>>,
  demand: DemandCounter,
  wip: WorkInProgress,
  cancelled: AtomicBool,
  policy: OverflowPolicy<Item>,
  raise: RaiseFn<Err>,
  /// Upstream resources, released on cancel and on overflow.
  upstream: SharedSubscription,
}

impl<Item, Err, S> OverflowCore<Item, Err, S>
where
  Item: Send + 'static,
  Err: Send + 'static,
  S: FlowSubscriber<Item, Err> + Send + 'static,
{
  pub(crate) fn new(
    subscriber: S, policy: OverflowPolicy<Item>, raise: RaiseFn<Err>, upstream: SharedSubscription,
  ) -> Arc<Self> {
    if let BackpressureStrategy::Buffer { capacity } = policy.strategy() {
      assert!(*capacity > 0, "overflow buffer capacity must be greater than zero");
    }
    Arc::new(OverflowCore {
      subscriber: Mutex::new(Some(subscriber)),
      pending: Mutex::new(Pending { queue: VecDeque::new(), done: None, overflow: None }),
      demand: DemandCounter::new(),
      wip: WorkInProgress::default(),
      cancelled: AtomicBool::new(false),
      policy,
      raise,
      upstream,
    })
  }

  /// Hand the subscription to the subscriber, then deliver whatever it
  /// requested meanwhile.
  pub(crate) fn start(self: &Arc<Self>) -> FlowSubscription {
    let subscription = FlowSubscription::from_arc(self.clone());
    let entered = self.wip.enter();
    debug_assert!(entered, "the subscription starts before any push");
    if let Some(subscriber) = self.subscriber.lock().as_mut() {
      subscriber.on_subscribe(subscription.clone());
    }
    self.drain_loop();
    subscription
  }

  /// Outstanding demand not yet covered by queued values.
  pub(crate) fn requested(&self) -> u64 {
    let demand = self.demand.get();
    if demand == UNBOUNDED {
      return demand;
    }
    demand.saturating_sub(self.pending.lock().queue.len() as u64)
  }

  pub(crate) fn is_cancelled(&self) -> bool { self.cancelled.load(Ordering::Acquire) }

  pub(crate) fn push(&self, value: Item) {
    if self.is_cancelled() {
      return;
    }
    {
      let mut pending = self.pending.lock();
      if pending.done.is_some() || pending.overflow.is_some() {
        return;
      }
      let demand = self.demand.get();
      let has_room = demand == UNBOUNDED || (pending.queue.len() as u64) < demand;
      if has_room || matches!(self.policy.strategy(), BackpressureStrategy::Missing) {
        pending.queue.push_back(value);
      } else if let Some(discarded) = self.overflow(&mut pending, value, demand) {
        drop(pending);
        self.policy.discard(discarded);
      }
    }
    self.drain();
  }

  /// Apply the policy to a value that arrived without demand. Returns the
  /// value to pass to the discard callback, if any.
  fn overflow(&self, pending: &mut Pending<Item, Err>, value: Item, demand: u64) -> Option<Item> {
    match *self.policy.strategy() {
      BackpressureStrategy::Buffer { capacity } => {
        let waiting = pending.queue.len() - demand as usize;
        if waiting < capacity {
          pending.queue.push_back(value);
          None
        } else if self.policy.has_callback() {
          let evicted = pending.queue.remove(demand as usize);
          pending.queue.push_back(value);
          trace!(capacity, "overflow buffer full, evicting the oldest value");
          evicted
        } else {
          warn!(capacity, "overflow buffer full");
          self.fail(pending, BackpressureError::BufferOverflow { capacity });
          None
        }
      }
      BackpressureStrategy::Drop => {
        trace!("no demand, dropping value");
        Some(value)
      }
      BackpressureStrategy::Latest => {
        let replaced =
          if pending.queue.len() > demand as usize { pending.queue.pop_back() } else { None };
        pending.queue.push_back(value);
        replaced
      }
      BackpressureStrategy::Error => {
        warn!("value produced without demand");
        self.fail(pending, BackpressureError::MissingDemand);
        None
      }
      BackpressureStrategy::Missing => {
        pending.queue.push_back(value);
        None
      }
    }
  }

  fn fail(&self, pending: &mut Pending<Item, Err>, err: BackpressureError) {
    match self.raise {
      Some(raise) => {
        pending.queue.clear();
        pending.overflow = Some(raise(err));
      }
      None => debug!(%err, "boundary cannot fail, value dropped"),
    }
  }

  /// Record the upstream terminal. It is delivered after queued values.
  pub(crate) fn finish(&self, terminal: Emission<Item, Err>) {
    {
      let mut pending = self.pending.lock();
      if pending.done.is_some() || pending.overflow.is_some() {
        return;
      }
      pending.done = Some(terminal);
    }
    self.drain();
  }

  fn drain(&self) {
    if self.wip.enter() {
      self.drain_loop();
    }
  }

  fn drain_loop(&self) {
    let mut missed = 1;
    loop {
      if self.drain_pass() {
        self.upstream.unsubscribe();
      }
      if !self.wip.leave(&mut missed) {
        break;
      }
    }
  }

  /// One pass over the queue. Returns `true` once the subscriber is gone.
  fn drain_pass(&self) -> bool {
    let mut slot = self.subscriber.lock();
    let missing = matches!(self.policy.strategy(), BackpressureStrategy::Missing);
    loop {
      if slot.is_none() || self.is_cancelled() {
        slot.take();
        self.pending.lock().queue.clear();
        return true;
      }
      let mut pending = self.pending.lock();
      if let Some(err) = pending.overflow.take() {
        pending.queue.clear();
        drop(pending);
        Emission::<Item, Err>::Error(err).deliver(&mut *slot);
        return true;
      }
      if pending.queue.is_empty() {
        let Some(terminal) = pending.done.take() else { return false };
        drop(pending);
        terminal.deliver(&mut *slot);
        return true;
      }
      if !missing && !self.demand.try_claim() {
        return false;
      }
      let Some(value) = pending.queue.pop_front() else { return false };
      drop(pending);
      Emission::<Item, Err>::Value(value).deliver(&mut *slot);
    }
  }
}

impl<Item, Err, S> FlowControl for OverflowCore<Item, Err, S>
where
  Item: Send + 'static,
  Err: Send + 'static,
  S: FlowSubscriber<Item, Err> + Send + 'static,
{
  fn request(&self, n: u64) {
    self.demand.add(n);
    self.drain();
  }

  fn cancel(&self) {
    if self.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    self.upstream.unsubscribe();
    self.drain();
  }

  fn is_cancelled(&self) -> bool { OverflowCore::is_cancelled(self) }
}

/// Feeds upstream emissions into an [`OverflowCore`].
pub(crate) struct OverflowObserver<Item, Err, S>(pub(crate) Arc<OverflowCore<Item, Err, S>>);

impl<Item, Err, S> Observer<Item, Err> for OverflowObserver<Item, Err, S>
where
  Item: Send + 'static,
  Err: Send + 'static,
  S: FlowSubscriber<Item, Err> + Send + 'static,
{
  fn next(&mut self, value: Item) { self.0.push(value) }

  fn error(self, err: Err) { self.0.finish(Emission::Error(err)) }

  fn complete(self) { self.0.finish(Emission::Complete) }

  fn is_closed(&self) -> bool { self.0.is_cancelled() }
}
