//! Demand-regulated sources.
//!
//! A [`Flowable`] delivers nothing until its subscriber asks for it. On
//! subscription the source hands a [`FlowSubscription`] to
//! [`FlowSubscriber::on_subscribe`]; the subscriber calls
//! [`request(n)`](FlowSubscription::request) to grant `n` more values and
//! [`cancel`](FlowSubscription::cancel) to stop. The number of values
//! delivered never exceeds the total requested so far. Terminals need no
//! demand.
//!
//! ```
//! use rxflow::prelude::*;
//! use rxflow::testing::TestSubscriber;
//!
//! let subscriber = TestSubscriber::<u64, Infallible>::new();
//! flowable::range(0, 100)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 10)
//!   .subscribe_with(subscriber.clone());
//!
//! assert!(subscriber.values().is_empty());
//! subscriber.request(3);
//! assert_eq!(subscriber.values(), vec![0, 20, 40]);
//! ```

use crate::{
  backpressure::{raise_with, OverflowPolicy},
  error::BackpressureError,
  observer::{Observer, ObserverAll},
  scheduler::Scheduler,
};

pub mod create;
pub mod from_iter;
pub mod from_observable;
pub mod ops;
pub(crate) mod overflow;
pub mod subscription;

pub use create::{create, FlowEmitter, FlowableCreate};
pub use from_iter::{empty, from_iter, range, throw_err, FlowableEmpty, FlowableFromIter, FlowableThrow};
pub use subscription::{DemandCounter, FlowControl, FlowSubscription, UNBOUNDED};

use ops::{
  buffer_count::BufferCountOp, filter::FilterOp, flat_map_iter::FlatMapIterOp, map::MapOp,
  observe_on::ObserveOnOp, on_backpressure::OnBackpressureOp, scan::ScanOp, take::TakeOp,
  to_observable::FlowableToObservable, into_stream::FlowableStream,
};

/// The consumer of a [`Flowable`].
pub trait FlowSubscriber<Item, Err>: Observer<Item, Err> {
  /// Receive the subscription. Called once, before any other method.
  fn on_subscribe(&mut self, subscription: FlowSubscription);
}

/// A cold, demand-regulated source of values.
pub trait Flowable: Sized {
  type Item: Send + 'static;
  type Err: Send + 'static;

  /// Start an activation delivering into `subscriber`. The returned handle
  /// cancels the activation.
  fn actual_subscribe<S>(self, subscriber: S) -> FlowSubscription
  where
    S: FlowSubscriber<Self::Item, Self::Err> + Send + 'static;
}

/// Subscribes with unbounded demand.
pub struct RequestAll<O>(pub O);

impl<Item, Err, O: Observer<Item, Err>> Observer<Item, Err> for RequestAll<O> {
  fn next(&mut self, value: Item) { self.0.next(value) }

  fn error(self, err: Err) { self.0.error(err) }

  fn complete(self) { self.0.complete() }

  fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl<Item, Err, O: Observer<Item, Err>> FlowSubscriber<Item, Err> for RequestAll<O> {
  fn on_subscribe(&mut self, subscription: FlowSubscription) { subscription.request(UNBOUNDED) }
}

/// Operators and subscription entry points of every [`Flowable`].
pub trait FlowableExt: Flowable {
  fn subscribe_with<S>(self, subscriber: S) -> FlowSubscription
  where
    S: FlowSubscriber<Self::Item, Self::Err> + Send + 'static,
  {
    self.actual_subscribe(subscriber)
  }

  /// Subscribe with closures, requesting everything up front.
  fn subscribe_all<N, E, C>(self, next: N, error: E, complete: C) -> FlowSubscription
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnOnce(Self::Err) + Send + 'static,
    C: FnOnce() + Send + 'static,
  {
    self.actual_subscribe(RequestAll(ObserverAll::new(next, error, complete)))
  }

  fn map<B, F>(self, f: F) -> MapOp<Self, F>
  where
    F: FnMut(Self::Item) -> B,
  {
    MapOp { source: self, func: f }
  }

  /// Drop values failing `predicate`. Every dropped value is replaced by a
  /// request for one more upstream value.
  fn filter<F>(self, predicate: F) -> FilterOp<Self, F>
  where
    F: FnMut(&Self::Item) -> bool,
  {
    FilterOp { source: self, predicate }
  }

  fn scan<B, F>(self, initial: B, f: F) -> ScanOp<Self, F, B>
  where
    B: Clone,
    F: FnMut(B, Self::Item) -> B,
  {
    ScanOp { source: self, func: f, initial }
  }

  /// At most `count` values. Upstream demand is capped at what remains.
  fn take(self, count: u64) -> TakeOp<Self> { TakeOp { source: self, count } }

  /// Chunks of `count` values. A request for `k` chunks requests `k * count`
  /// values upstream.
  fn buffer_count(self, count: usize) -> BufferCountOp<Self> {
    assert!(count > 0, "buffer_count: count must be greater than zero");
    BufferCountOp { source: self, count }
  }

  /// Expand every value into the items of an iterator, requesting the next
  /// upstream value only once the current iterator is exhausted.
  fn flat_map_iter<I, F>(self, f: F) -> FlatMapIterOp<Self, F>
  where
    I: IntoIterator,
    F: FnMut(Self::Item) -> I,
  {
    FlatMapIterOp { source: self, func: f }
  }

  /// Deliver on `scheduler`. Requests pass through unchanged.
  fn observe_on<SD>(self, scheduler: SD) -> ObserveOnOp<Self, SD>
  where
    SD: Scheduler + Clone + 'static,
  {
    ObserveOnOp { source: self, scheduler }
  }

  /// Request everything upstream and apply `policy` to values arriving
  /// without downstream demand.
  fn on_backpressure(self, policy: impl Into<OverflowPolicy<Self::Item>>) -> OnBackpressureOp<Self>
  where
    Self::Err: From<BackpressureError>,
  {
    OnBackpressureOp { source: self, policy: policy.into(), raise: raise_with() }
  }

  /// Queue up to `capacity` values, then fail with
  /// [`BackpressureError::BufferOverflow`].
  fn on_backpressure_buffer(self, capacity: usize) -> OnBackpressureOp<Self>
  where
    Self::Err: From<BackpressureError>,
  {
    self.on_backpressure(OverflowPolicy::buffer(capacity))
  }

  /// Queue up to `capacity` values, then evict the oldest into `on_evict`.
  fn on_backpressure_buffer_with<F>(self, capacity: usize, on_evict: F) -> OnBackpressureOp<Self>
  where
    F: Fn(Self::Item) + Send + Sync + 'static,
  {
    OnBackpressureOp { source: self, policy: OverflowPolicy::buffer_with(capacity, on_evict), raise: None }
  }

  fn on_backpressure_drop(self) -> OnBackpressureOp<Self> {
    OnBackpressureOp { source: self, policy: OverflowPolicy::drop(), raise: None }
  }

  fn on_backpressure_drop_with<F>(self, on_drop: F) -> OnBackpressureOp<Self>
  where
    F: Fn(Self::Item) + Send + Sync + 'static,
  {
    OnBackpressureOp { source: self, policy: OverflowPolicy::drop_with(on_drop), raise: None }
  }

  fn on_backpressure_latest(self) -> OnBackpressureOp<Self> {
    OnBackpressureOp { source: self, policy: OverflowPolicy::latest(), raise: None }
  }

  /// Fail with [`BackpressureError::MissingDemand`] on the first value
  /// arriving without demand.
  fn on_backpressure_error(self) -> OnBackpressureOp<Self>
  where
    Self::Err: From<BackpressureError>,
  {
    self.on_backpressure(OverflowPolicy::error())
  }

  /// Push everything downstream with unbounded demand.
  fn to_observable(self) -> FlowableToObservable<Self> { FlowableToObservable { source: self } }

  /// Pull values as a `futures::Stream`, requesting one value per poll.
  fn into_stream(self) -> FlowableStream<Self::Item, Self::Err>
  where
    Self: Send + 'static,
  {
    FlowableStream::new(self)
  }
}

impl<T: Flowable> FlowableExt for T {}
