//! Push sources and the operator surface.
//!
//! An [`Observable`] is a cold description of a sequence: nothing happens
//! until it is subscribed, and every subscription is an independent
//! activation with its own operator state. [`ObservableExt`] carries the
//! operators and the `subscribe*` entry points and is implemented for every
//! observable.

use std::{
  convert::Infallible,
  hash::Hash,
  ops::Add,
  time::Duration,
};

use crate::{
  backpressure::OverflowPolicy,
  flowable::from_observable::ObservableToFlowable,
  observer::{FnMutObserver, Observer, ObserverAll},
  ops::{
    box_it::BoxedObservable,
    buffer_count::BufferCountOp,
    buffer_time::BufferTimeOp,
    combine_latest::CombineLatestOp,
    concat::{ConcatMapOp, ConcatOp},
    debounce::DebounceOp,
    delay::DelayOp,
    filter::FilterOp,
    filter_map::FilterMapOp,
    group_by::GroupByOp,
    map::MapOp,
    merge::{FlatMapOp, MergeOp},
    observe_on::ObserveOnOp,
    on_error::{OnErrorResumeNextOp, OnErrorReturnOp},
    reduce::{ReduceOp, ReduceWithOp},
    retry::{RetryOp, RetryPolicy},
    scan::ScanOp,
    skip::SkipOp,
    subscribe_on::SubscribeOnOp,
    switch_map::SwitchMapOp,
    take::TakeOp,
    take_while::TakeWhileOp,
    tap::TapOp,
    window::{WindowCountOp, WindowTimeOp},
    zip::ZipOp,
  },
  scheduler::{ImmediateScheduler, Scheduler},
  subject::{ReplayConfig, Subject},
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionWrapper},
};

pub mod connectable;
mod create;
mod defer;
mod from_iter;
mod interval;
mod of;

pub use connectable::ConnectableObservable;
pub use create::{create, Emitter, ObservableCreate};
pub use defer::{defer, ObservableDefer};
pub use from_iter::{from_iter, ObservableFromIter};
pub use interval::{interval, timer, ObservableInterval, ObservableTimer};
pub use of::{empty, never, of, throw_err, ObservableEmpty, ObservableNever, ObservableOf, ThrowErr};

/// A cold, push-based source of values.
pub trait Observable: Sized {
  type Item: Send + 'static;
  type Err: Send + 'static;

  /// Start an activation delivering into `subscriber`.
  ///
  /// Returns the activation's subscription, the same one the subscriber
  /// carries.
  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static;
}

/// Operators and subscription entry points of every [`Observable`].
pub trait ObservableExt: Observable {
  // ---------------------------------------------------------------------
  // subscribe
  // ---------------------------------------------------------------------

  /// Subscribe with a `next` closure. Only sources that cannot fail accept
  /// this; fallible sources use [`subscribe_err`](Self::subscribe_err) or
  /// [`subscribe_all`](Self::subscribe_all).
  fn subscribe<N>(self, next: N) -> SubscriptionWrapper<SharedSubscription>
  where
    Self: Observable<Err = Infallible>,
    N: FnMut(Self::Item) + Send + 'static,
  {
    self.subscribe_with(FnMutObserver(next))
  }

  fn subscribe_err<N, E>(self, next: N, error: E) -> SubscriptionWrapper<SharedSubscription>
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnOnce(Self::Err) + Send + 'static,
  {
    self.subscribe_with(ObserverAll::new(next, error, || {}))
  }

  fn subscribe_all<N, E, C>(
    self, next: N, error: E, complete: C,
  ) -> SubscriptionWrapper<SharedSubscription>
  where
    N: FnMut(Self::Item) + Send + 'static,
    E: FnOnce(Self::Err) + Send + 'static,
    C: FnOnce() + Send + 'static,
  {
    self.subscribe_with(ObserverAll::new(next, error, complete))
  }

  fn subscribe_with<O>(self, observer: O) -> SubscriptionWrapper<SharedSubscription>
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    let subscriber = Subscriber::new(observer);
    let subscription = subscriber.subscription.clone();
    self.actual_subscribe(subscriber);
    SubscriptionWrapper::new(subscription)
  }

  // ---------------------------------------------------------------------
  // stateless
  // ---------------------------------------------------------------------

  /// Transform every value with `f`.
  fn map<B, F>(self, f: F) -> MapOp<Self, F>
  where
    F: FnMut(Self::Item) -> B + Send + 'static,
    B: Send + 'static,
  {
    MapOp { source: self, func: f }
  }

  /// Emit only the values passing `predicate`.
  fn filter<F>(self, predicate: F) -> FilterOp<Self, F>
  where
    F: FnMut(&Self::Item) -> bool + Send + 'static,
  {
    FilterOp { source: self, predicate }
  }

  /// Map and filter in one step: `None` results are dropped.
  fn filter_map<B, F>(self, f: F) -> FilterMapOp<Self, F>
  where
    F: FnMut(Self::Item) -> Option<B> + Send + 'static,
    B: Send + 'static,
  {
    FilterMapOp { source: self, func: f }
  }

  /// Run a side effect on every value, passing the value on unchanged.
  fn tap<F>(self, f: F) -> TapOp<Self, F>
  where
    F: FnMut(&Self::Item) + Send + 'static,
  {
    TapOp { source: self, func: f }
  }

  /// Emit the first `count` values, then complete and cancel upstream.
  fn take(self, count: usize) -> TakeOp<Self> { TakeOp { source: self, count } }

  /// Skip the first `count` values.
  fn skip(self, count: usize) -> SkipOp<Self> { SkipOp { source: self, count } }

  /// Emit values while `predicate` holds, then complete.
  fn take_while<F>(self, predicate: F) -> TakeWhileOp<Self, F>
  where
    F: FnMut(&Self::Item) -> bool + Send + 'static,
  {
    TakeWhileOp { source: self, predicate }
  }

  // ---------------------------------------------------------------------
  // accumulation
  // ---------------------------------------------------------------------

  /// Emit every intermediate accumulator value.
  fn scan<B, F>(self, initial: B, f: F) -> ScanOp<Self, F, B>
  where
    F: FnMut(B, Self::Item) -> B + Send + 'static,
    B: Clone + Send + 'static,
  {
    ScanOp { source: self, func: f, initial }
  }

  /// Fold the values with `f` and emit the result on completion. An empty
  /// source completes without a value.
  fn reduce<F>(self, f: F) -> ReduceOp<Self, F>
  where
    F: FnMut(Self::Item, Self::Item) -> Self::Item + Send + 'static,
  {
    ReduceOp { source: self, func: f }
  }

  /// Fold the values into `initial` and emit the result on completion, also
  /// for an empty source.
  fn reduce_with<B, F>(self, initial: B, f: F) -> ReduceWithOp<Self, F, B>
  where
    F: FnMut(B, Self::Item) -> B + Send + 'static,
    B: Send + 'static,
  {
    ReduceWithOp { source: self, func: f, initial }
  }

  /// Sum of the values. An empty source emits `Item::default()`.
  #[allow(clippy::type_complexity)]
  fn sum(self) -> ReduceWithOp<Self, fn(Self::Item, Self::Item) -> Self::Item, Self::Item>
  where
    Self::Item: Default + Add<Output = Self::Item>,
  {
    let add: fn(Self::Item, Self::Item) -> Self::Item = |acc, v| acc + v;
    self.reduce_with(<Self::Item as Default>::default(), add)
  }

  /// Number of values.
  #[allow(clippy::type_complexity)]
  fn count(self) -> ReduceWithOp<Self, fn(usize, Self::Item) -> usize, usize> {
    let inc: fn(usize, Self::Item) -> usize = |acc, _| acc + 1;
    self.reduce_with(0, inc)
  }

  /// The smallest value. The first of equal values wins.
  #[allow(clippy::type_complexity)]
  fn min(self) -> ReduceOp<Self, fn(Self::Item, Self::Item) -> Self::Item>
  where
    Self::Item: Ord,
  {
    let smaller: fn(Self::Item, Self::Item) -> Self::Item = |acc, v| if v < acc { v } else { acc };
    self.reduce(smaller)
  }

  /// The largest value. The first of equal values wins.
  #[allow(clippy::type_complexity)]
  fn max(self) -> ReduceOp<Self, fn(Self::Item, Self::Item) -> Self::Item>
  where
    Self::Item: Ord,
  {
    let larger: fn(Self::Item, Self::Item) -> Self::Item = |acc, v| if v > acc { v } else { acc };
    self.reduce(larger)
  }

  // ---------------------------------------------------------------------
  // windowing
  // ---------------------------------------------------------------------

  /// Collect values into vectors of `count`; a partial buffer is emitted on
  /// completion.
  ///
  /// # Panics
  ///
  /// Panics if `count` is zero.
  fn buffer_count(self, count: usize) -> BufferCountOp<Self> {
    assert!(count > 0, "buffer_count requires a count greater than zero");
    BufferCountOp { source: self, count }
  }

  /// Collect the values of every `period` into a vector. Periods without
  /// values emit nothing.
  fn buffer_time<SD>(self, period: Duration, scheduler: SD) -> BufferTimeOp<Self, SD>
  where
    SD: Scheduler + Clone + 'static,
  {
    BufferTimeOp { source: self, period, scheduler }
  }

  /// Split the values into inner observables of `count` values each.
  ///
  /// # Panics
  ///
  /// Panics if `count` is zero.
  fn window_count(self, count: usize) -> WindowCountOp<Self> {
    assert!(count > 0, "window_count requires a count greater than zero");
    WindowCountOp { source: self, count }
  }

  /// Open a new inner observable every `period`. Periods without values
  /// still emit an (empty) window.
  fn window_time<SD>(self, period: Duration, scheduler: SD) -> WindowTimeOp<Self, SD>
  where
    SD: Scheduler + Clone + 'static,
  {
    WindowTimeOp { source: self, period, scheduler }
  }

  // ---------------------------------------------------------------------
  // combination
  // ---------------------------------------------------------------------

  /// Pair values by position. Completes once either side is exhausted.
  fn zip<S2>(self, other: S2) -> ZipOp<Self, S2>
  where
    S2: Observable<Err = Self::Err>,
  {
    ZipOp { a: self, b: other }
  }

  /// Combine the latest value of each side on every update, once both sides
  /// have emitted.
  fn combine_latest<S2, F, B>(self, other: S2, f: F) -> CombineLatestOp<Self, S2, F>
  where
    S2: Observable<Err = Self::Err>,
    F: FnMut(&Self::Item, &S2::Item) -> B + Send + 'static,
    B: Send + 'static,
  {
    CombineLatestOp { a: self, b: other, func: f }
  }

  // ---------------------------------------------------------------------
  // flattening
  // ---------------------------------------------------------------------

  /// Map every value to an inner observable and mirror only the most recent
  /// one. The previous inner is cancelled before the next is subscribed.
  fn switch_map<S2, F>(self, f: F) -> SwitchMapOp<Self, F>
  where
    F: FnMut(Self::Item) -> S2 + Send + 'static,
    S2: Observable<Err = Self::Err> + 'static,
  {
    SwitchMapOp { source: self, func: f }
  }

  /// Map every value to an inner observable and subscribe them one after
  /// another.
  fn concat_map<S2, F>(self, f: F) -> ConcatMapOp<Self, F>
  where
    F: FnMut(Self::Item) -> S2 + Send + 'static,
    S2: Observable<Err = Self::Err> + Send + 'static,
  {
    ConcatMapOp { source: self, func: f }
  }

  /// Emit all of `self`, then all of `other`.
  fn concat<S2>(self, other: S2) -> ConcatOp<Self, S2>
  where
    S2: Observable<Item = Self::Item, Err = Self::Err> + Send + 'static,
  {
    ConcatOp { first: self, second: other }
  }

  /// Map every value to an inner observable and merge them all.
  fn flat_map<S2, F>(self, f: F) -> FlatMapOp<Self, F>
  where
    F: FnMut(Self::Item) -> S2 + Send + 'static,
    S2: Observable<Err = Self::Err> + 'static,
  {
    FlatMapOp { source: self, func: f }
  }

  /// Interleave the values of `self` and `other`.
  fn merge<S2>(self, other: S2) -> MergeOp<Self, S2>
  where
    S2: Observable<Item = Self::Item, Err = Self::Err>,
  {
    MergeOp { a: self, b: other }
  }

  /// Merge a source of observables.
  #[allow(clippy::type_complexity)]
  fn merge_all(self) -> FlatMapOp<Self, fn(Self::Item) -> Self::Item>
  where
    Self::Item: Observable<Err = Self::Err>,
  {
    let identity: fn(Self::Item) -> Self::Item = |inner| inner;
    self.flat_map(identity)
  }

  // ---------------------------------------------------------------------
  // grouping
  // ---------------------------------------------------------------------

  /// Split the values into [`GroupedObservable`](crate::ops::group_by::GroupedObservable)s
  /// by key.
  fn group_by<K, F>(self, key: F) -> GroupByOp<Self, F>
  where
    F: FnMut(&Self::Item) -> K + Send + 'static,
    K: Hash + Eq + Clone + Send + Sync + 'static,
  {
    GroupByOp { source: self, key }
  }

  // ---------------------------------------------------------------------
  // error recovery
  // ---------------------------------------------------------------------

  /// On error, continue with the observable returned by `f`.
  fn on_error_resume_next<S2, F>(self, f: F) -> OnErrorResumeNextOp<Self, F>
  where
    F: FnOnce(Self::Err) -> S2 + Send + 'static,
    S2: Observable<Item = Self::Item> + 'static,
  {
    OnErrorResumeNextOp { source: self, func: f }
  }

  /// On error, emit the value returned by `f` and complete.
  fn on_error_return<F>(self, f: F) -> OnErrorReturnOp<Self, F>
  where
    F: FnOnce(Self::Err) -> Self::Item + Send + 'static,
  {
    OnErrorReturnOp { source: self, func: f }
  }

  /// Resubscribe on error as allowed by `policy`. Retry delays are ignored;
  /// see [`retry_on`](Self::retry_on).
  fn retry<P>(self, policy: P) -> RetryOp<Self, P, ImmediateScheduler>
  where
    Self: Clone + Send + 'static,
    P: RetryPolicy<Self::Err> + Send + 'static,
  {
    RetryOp { source: self, policy, scheduler: None }
  }

  /// Resubscribe on error as allowed by `policy`, waiting out the policy's
  /// delay on `scheduler`.
  fn retry_on<P, SD>(self, policy: P, scheduler: SD) -> RetryOp<Self, P, SD>
  where
    Self: Clone + Send + 'static,
    P: RetryPolicy<Self::Err> + Send + 'static,
    SD: Scheduler + Clone + 'static,
  {
    RetryOp { source: self, policy, scheduler: Some(scheduler) }
  }

  // ---------------------------------------------------------------------
  // execution context
  // ---------------------------------------------------------------------

  /// Deliver emissions on `scheduler`, in order.
  fn observe_on<SD>(self, scheduler: SD) -> ObserveOnOp<Self, SD>
  where
    SD: Scheduler + Clone + 'static,
  {
    ObserveOnOp { source: self, scheduler }
  }

  /// Subscribe to the source on `scheduler`.
  fn subscribe_on<SD>(self, scheduler: SD) -> SubscribeOnOp<Self, SD>
  where
    Self: Send + 'static,
    SD: Scheduler + Clone + 'static,
  {
    SubscribeOnOp { source: self, scheduler }
  }

  /// Shift every value and the completion later by `delay`. Errors are not
  /// delayed.
  fn delay<SD>(self, delay: Duration, scheduler: SD) -> DelayOp<Self, SD>
  where
    SD: Scheduler + Clone + 'static,
  {
    DelayOp { source: self, delay, scheduler }
  }

  /// Emit a value only after `quiet` passed without another value.
  fn debounce<SD>(self, quiet: Duration, scheduler: SD) -> DebounceOp<Self, SD>
  where
    SD: Scheduler + Clone + 'static,
  {
    DebounceOp { source: self, quiet, scheduler }
  }

  // ---------------------------------------------------------------------
  // multicast
  // ---------------------------------------------------------------------

  /// Share one activation of this source through subjects built by
  /// `factory`.
  fn multicast<F>(self, factory: F) -> ConnectableObservable<Self>
  where
    Self: Clone + Send + Sync + 'static,
    F: Fn() -> Subject<Self::Item, Self::Err> + Send + Sync + 'static,
    Self::Item: Clone,
    Self::Err: Clone,
  {
    ConnectableObservable::new(self, factory)
  }

  /// Multicast through publish subjects.
  fn publish(self) -> ConnectableObservable<Self>
  where
    Self: Clone + Send + Sync + 'static,
    Self::Item: Clone,
    Self::Err: Clone,
  {
    self.multicast(Subject::publish)
  }

  /// Multicast through replay subjects; every activation gets a fresh
  /// history.
  fn replay<SD>(self, config: ReplayConfig, scheduler: SD) -> ConnectableObservable<Self>
  where
    Self: Clone + Send + Sync + 'static,
    SD: Scheduler + Clone + 'static,
    Self::Item: Clone,
    Self::Err: Clone,
  {
    self.multicast(move || Subject::replay(config.clone(), scheduler.clone()))
  }

  /// `publish().ref_count()`.
  fn share(self) -> crate::ops::ref_count::RefCount<Self>
  where
    Self: Clone + Send + Sync + 'static,
    Self::Item: Clone,
    Self::Err: Clone,
  {
    self.publish().ref_count()
  }

  // ---------------------------------------------------------------------
  // bridges
  // ---------------------------------------------------------------------

  /// Turn this source into a demand-regulated one; values arriving without
  /// demand are handled by `policy`.
  fn to_flowable(self, policy: impl Into<OverflowPolicy<Self::Item>>) -> ObservableToFlowable<Self> {
    ObservableToFlowable { source: self, policy: policy.into() }
  }

  /// Erase the pipeline type.
  fn box_it(self) -> BoxedObservable<Self::Item, Self::Err>
  where
    Self: Send + 'static,
  {
    BoxedObservable::new(self)
  }
}

impl<T: Observable> ObservableExt for T {}

#[cfg(test)]
mod tests {
  use crate::prelude::*;

  #[test]
  fn subscribe_returns_activation_subscription() {
    let log = MutArc::own(vec![]);
    let l = log.clone();
    let subject = Subject::<i32, Infallible>::publish();
    let subscription = subject.clone().subscribe(move |v| l.rc_deref_mut().push(v));
    subject.clone().next(1);
    subscription.unsubscribe();
    assert!(subscription.is_closed());
    subject.clone().next(2);
    assert_eq!(*log.rc_deref(), vec![1]);
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[test]
  fn subscribe_all_sees_error() {
    let log = MutArc::own(vec![]);
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    observable::create(|mut emitter: Emitter<i32, &'static str>| {
      emitter.next(1);
      emitter.error("bad");
    })
    .subscribe_all(
      move |v| l1.rc_deref_mut().push(format!("{v}")),
      move |e| l2.rc_deref_mut().push(e.to_string()),
      move || l3.rc_deref_mut().push("done".to_string()),
    );
    assert_eq!(*log.rc_deref(), vec!["1".to_string(), "bad".to_string()]);
  }
}
