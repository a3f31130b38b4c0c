use std::{marker::PhantomData, sync::Arc};

use super::{overflow::OverflowCore, subscription::FlowSubscription, FlowSubscriber, Flowable};
use crate::{
  backpressure::{raise_with, OverflowPolicy},
  error::BackpressureError,
  observer::Emission,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// Build a flowable from a producer that pushes at its own pace.
///
/// Values pushed while the subscriber has demand are delivered; the rest go
/// through `policy`. The producer can poll [`FlowEmitter::requested`] to
/// avoid producing values nobody asked for.
///
/// ```
/// use rxflow::prelude::*;
/// use rxflow::testing::TestSubscriber;
///
/// let subscriber = TestSubscriber::<i32, BackpressureError>::new();
/// flowable::create(OverflowPolicy::latest(), |mut emitter| {
///   (1..=5).for_each(|v| emitter.next(v));
///   emitter.complete();
/// })
/// .subscribe_with(subscriber.clone());
///
/// subscriber.request(10);
/// assert_eq!(subscriber.values(), vec![5]);
/// assert!(subscriber.is_completed());
/// ```
pub fn create<Item, Err, F>(policy: impl Into<OverflowPolicy<Item>>, producer: F) -> FlowableCreate<F, Item, Err>
where
  F: FnOnce(FlowEmitter<Item, Err>),
  Err: From<BackpressureError>,
{
  FlowableCreate { producer, policy: policy.into(), _err: PhantomData }
}

pub struct FlowableCreate<F, Item, Err> {
  producer: F,
  policy: OverflowPolicy<Item>,
  _err: PhantomData<fn() -> Err>,
}

impl<F: Clone, Item, Err> Clone for FlowableCreate<F, Item, Err> {
  fn clone(&self) -> Self {
    FlowableCreate { producer: self.producer.clone(), policy: self.policy.clone(), _err: PhantomData }
  }
}

/// The sink side of an overflow boundary, with the subscriber type erased.
pub(crate) trait PushSink<Item, Err>: Send + Sync {
  fn push(&self, value: Item);
  fn finish(&self, terminal: Emission<Item, Err>);
  fn requested(&self) -> u64;
  fn is_cancelled(&self) -> bool;
}

impl<Item, Err, S> PushSink<Item, Err> for OverflowCore<Item, Err, S>
where
  Item: Send + 'static,
  Err: Send + 'static,
  S: FlowSubscriber<Item, Err> + Send + 'static,
{
  fn push(&self, value: Item) { OverflowCore::push(self, value) }

  fn finish(&self, terminal: Emission<Item, Err>) { OverflowCore::finish(self, terminal) }

  fn requested(&self) -> u64 { OverflowCore::requested(self) }

  fn is_cancelled(&self) -> bool { OverflowCore::is_cancelled(self) }
}

/// The producer side handed to [`create`]. Emissions after a terminal or
/// after cancellation are ignored.
pub struct FlowEmitter<Item, Err> {
  sink: Option<Arc<dyn PushSink<Item, Err>>>,
  resources: SharedSubscription,
}

impl<Item, Err> FlowEmitter<Item, Err> {
  pub fn next(&mut self, value: Item) {
    if let Some(sink) = &self.sink {
      sink.push(value)
    }
  }

  pub fn error(&mut self, err: Err) {
    if let Some(sink) = self.sink.take() {
      sink.finish(Emission::Error(err))
    }
  }

  pub fn complete(&mut self) {
    if let Some(sink) = self.sink.take() {
      sink.finish(Emission::Complete)
    }
  }

  /// Demand not yet covered by delivered or queued values.
  pub fn requested(&self) -> u64 { self.sink.as_ref().map_or(0, |sink| sink.requested()) }

  /// `true` after a terminal or once the subscriber cancelled.
  pub fn is_cancelled(&self) -> bool { self.sink.as_ref().map_or(true, |sink| sink.is_cancelled()) }

  /// Release a producer resource on cancellation or overflow.
  pub fn add_teardown(&self, f: impl FnOnce() + Send + 'static) { self.resources.add_fn(f) }
}

impl<F, Item, Err> Flowable for FlowableCreate<F, Item, Err>
where
  F: FnOnce(FlowEmitter<Item, Err>),
  Item: Send + 'static,
  Err: From<BackpressureError> + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe<S>(self, subscriber: S) -> FlowSubscription
  where
    S: FlowSubscriber<Item, Err> + Send + 'static,
  {
    let resources = SharedSubscription::new();
    let core = OverflowCore::new(subscriber, self.policy, raise_with(), resources.clone());
    let subscription = core.start();
    if !subscription.is_cancelled() {
      let sink: Arc<dyn PushSink<Item, Err>> = core;
      (self.producer)(FlowEmitter { sink: Some(sink), resources: resources.clone() });
    } else {
      resources.unsubscribe();
    }
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{
      atomic::{AtomicBool, AtomicUsize, Ordering},
      Arc,
    },
    thread,
  };

  use crate::{prelude::*, testing::TestSubscriber};

  #[test]
  fn buffer_holds_values_until_requested() {
    let subscriber = TestSubscriber::<i32, BackpressureError>::new();
    flowable::create(OverflowPolicy::buffer(8), |mut emitter| {
      (1..=4).for_each(|v| emitter.next(v));
      emitter.complete();
    })
    .subscribe_with(subscriber.clone());

    subscriber.request(3);
    assert_eq!(subscriber.values(), vec![1, 2, 3]);
    assert!(!subscriber.is_completed());
    subscriber.request(1);
    assert_eq!(subscriber.values(), vec![1, 2, 3, 4]);
    assert!(subscriber.is_completed());
  }

  #[test]
  fn producer_sees_outstanding_demand() {
    let subscriber = TestSubscriber::<i32, BackpressureError>::with_initial_request(3);
    let observed = Arc::new(AtomicUsize::new(0));
    let o = observed.clone();
    flowable::create(OverflowPolicy::error(), move |mut emitter| {
      let mut v = 0;
      while emitter.requested() > 0 {
        emitter.next(v);
        v += 1;
      }
      o.store(v as usize, Ordering::SeqCst);
    })
    .subscribe_with(subscriber.clone());
    assert_eq!(observed.load(Ordering::SeqCst), 3);
    assert_eq!(subscriber.values(), vec![0, 1, 2]);
    assert_eq!(subscriber.err(), None);
  }

  #[test]
  fn teardown_runs_on_cancel() {
    let released = Arc::new(AtomicBool::new(false));
    let r = released.clone();
    let subscriber = TestSubscriber::<i32, BackpressureError>::new();
    flowable::create(OverflowPolicy::drop(), move |emitter: FlowEmitter<i32, BackpressureError>| {
      emitter.add_teardown(move || r.store(true, Ordering::SeqCst));
    })
    .subscribe_with(subscriber.clone());
    assert!(!released.load(Ordering::SeqCst));
    subscriber.cancel();
    assert!(released.load(Ordering::SeqCst));
  }

  #[test]
  fn producer_on_another_thread() {
    let subscriber = TestSubscriber::<usize, BackpressureError>::with_initial_request(100);
    let (tx, rx) = crossbeam_channel::bounded(1);
    flowable::create(OverflowPolicy::buffer(16), move |mut emitter| {
      thread::spawn(move || {
        (0..50).for_each(|v| emitter.next(v));
        emitter.complete();
        tx.send(()).unwrap();
      });
    })
    .subscribe_with(subscriber.clone());
    rx.recv().unwrap();
    assert_eq!(subscriber.values(), (0..50).collect::<Vec<_>>());
    assert!(subscriber.is_completed());
  }
}
