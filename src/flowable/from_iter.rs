use std::{
  marker::PhantomData,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;

use super::{
  subscription::{DemandCounter, FlowControl, FlowSubscription, WorkInProgress},
  FlowSubscriber, Flowable,
};
use crate::observer::Observer;

/// Pull the items of `iter` as demand arrives.
///
/// The iterator is advanced only after a unit of demand is claimed, so an
/// infinite iterator is fine. Iterators reporting an exact size complete as
/// soon as they run dry; others complete on the request after their last
/// item.
pub fn from_iter<I, Err>(iter: I) -> FlowableFromIter<I::IntoIter, Err>
where
  I: IntoIterator,
{
  FlowableFromIter { iter: iter.into_iter(), _err: PhantomData }
}

/// The `count` integers starting at `start`.
pub fn range<Err>(start: u64, count: u64) -> FlowableFromIter<std::ops::Range<u64>, Err> {
  from_iter(start..start.saturating_add(count))
}

/// Completes on subscription.
pub fn empty<Item, Err>() -> FlowableEmpty<Item, Err> { FlowableEmpty(PhantomData) }

/// Fails with `err` on subscription.
pub fn throw_err<Item, Err>(err: Err) -> FlowableThrow<Item, Err> {
  FlowableThrow { err, _item: PhantomData }
}

pub struct FlowableFromIter<I, Err> {
  iter: I,
  _err: PhantomData<fn() -> Err>,
}

impl<I: Clone, Err> Clone for FlowableFromIter<I, Err> {
  fn clone(&self) -> Self { FlowableFromIter { iter: self.iter.clone(), _err: PhantomData } }
}

impl<I, Err> Flowable for FlowableFromIter<I, Err>
where
  I: Iterator + Send + 'static,
  I::Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = I::Item;
  type Err = Err;

  fn actual_subscribe<S>(self, subscriber: S) -> FlowSubscription
  where
    S: FlowSubscriber<I::Item, Err> + Send + 'static,
  {
    let core = Arc::new(IterCore {
      iter: Mutex::new(Some(self.iter)),
      subscriber: Mutex::new(Some(subscriber)),
      demand: DemandCounter::new(),
      wip: WorkInProgress::default(),
      cancelled: AtomicBool::new(false),
      _err: PhantomData,
    });
    let subscription = FlowSubscription::from_arc(core.clone());
    if core.wip.enter() {
      if let Some(subscriber) = core.subscriber.lock().as_mut() {
        subscriber.on_subscribe(subscription.clone());
      }
      core.drain_loop();
    }
    subscription
  }
}

struct IterCore<I, Err, S> {
  iter: Mutex<Option<I>>,
  subscriber: Mutex<Option<S>>,
  demand: DemandCounter,
  wip: WorkInProgress,
  cancelled: AtomicBool,
  _err: PhantomData<fn() -> Err>,
}

impl<I, Err, S> IterCore<I, Err, S>
where
  I: Iterator,
  S: FlowSubscriber<I::Item, Err>,
{
  fn drain_loop(&self) {
    let mut missed = 1;
    loop {
      self.drain_pass();
      if !self.wip.leave(&mut missed) {
        break;
      }
    }
  }

  fn drain_pass(&self) {
    let mut slot = self.subscriber.lock();
    let mut iter = self.iter.lock();
    loop {
      let Some(subscriber) = slot.as_mut() else { return };
      if self.cancelled.load(Ordering::Acquire) || subscriber.is_closed() {
        slot.take();
        iter.take();
        return;
      }
      let exhausted = iter.as_ref().map_or(true, |iter| iter.size_hint().1 == Some(0));
      if !exhausted && !self.demand.try_claim() {
        return;
      }
      match iter.as_mut().and_then(Iterator::next) {
        Some(value) => subscriber.next(value),
        None => {
          iter.take();
          if let Some(subscriber) = slot.take() {
            subscriber.complete();
          }
          return;
        }
      }
    }
  }
}

impl<I, Err, S> FlowControl for IterCore<I, Err, S>
where
  I: Iterator + Send,
  S: FlowSubscriber<I::Item, Err> + Send,
{
  fn request(&self, n: u64) {
    self.demand.add(n);
    if self.wip.enter() {
      self.drain_loop();
    }
  }

  fn cancel(&self) {
    if !self.cancelled.swap(true, Ordering::AcqRel) && self.wip.enter() {
      self.drain_loop();
    }
  }

  fn is_cancelled(&self) -> bool { self.cancelled.load(Ordering::Acquire) }
}

pub struct FlowableEmpty<Item, Err>(PhantomData<fn() -> (Item, Err)>);

impl<Item, Err> Clone for FlowableEmpty<Item, Err> {
  fn clone(&self) -> Self { FlowableEmpty(PhantomData) }
}

impl<Item: Send + 'static, Err: Send + 'static> Flowable for FlowableEmpty<Item, Err> {
  type Item = Item;
  type Err = Err;

  fn actual_subscribe<S>(self, mut subscriber: S) -> FlowSubscription
  where
    S: FlowSubscriber<Item, Err> + Send + 'static,
  {
    let subscription = FlowSubscription::empty();
    subscriber.on_subscribe(subscription.clone());
    if !subscription.is_cancelled() {
      subscriber.complete();
    }
    subscription
  }
}

#[derive(Clone)]
pub struct FlowableThrow<Item, Err> {
  err: Err,
  _item: PhantomData<fn() -> Item>,
}

impl<Item: Send + 'static, Err: Send + 'static> Flowable for FlowableThrow<Item, Err> {
  type Item = Item;
  type Err = Err;

  fn actual_subscribe<S>(self, mut subscriber: S) -> FlowSubscription
  where
    S: FlowSubscriber<Item, Err> + Send + 'static,
  {
    let subscription = FlowSubscription::empty();
    subscriber.on_subscribe(subscription.clone());
    if !subscription.is_cancelled() {
      subscriber.error(self.err);
    }
    subscription
  }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::TestSubscriber};

  #[test]
  fn delivers_only_what_was_requested() {
    let subscriber = TestSubscriber::<i32, Infallible>::new();
    flowable::from_iter(1..=5).subscribe_with(subscriber.clone());
    assert!(subscriber.values().is_empty());

    subscriber.request(2);
    assert_eq!(subscriber.values(), vec![1, 2]);
    subscriber.request(2);
    assert_eq!(subscriber.values(), vec![1, 2, 3, 4]);
    assert!(!subscriber.is_completed());

    subscriber.request(10);
    assert_eq!(subscriber.values(), vec![1, 2, 3, 4, 5]);
    assert!(subscriber.is_completed());
  }

  #[test]
  fn infinite_iterator_is_pulled_lazily() {
    let subscriber = TestSubscriber::<u64, Infallible>::new();
    flowable::from_iter(0..).subscribe_with(subscriber.clone());
    subscriber.request(3);
    assert_eq!(subscriber.values(), vec![0, 1, 2]);
    subscriber.cancel();
    subscriber.request(3);
    assert_eq!(subscriber.values(), vec![0, 1, 2]);
  }

  #[test]
  fn range_counts_from_start() {
    let subscriber = TestSubscriber::<u64, Infallible>::with_initial_request(flowable::UNBOUNDED);
    flowable::range(5, 3).subscribe_with(subscriber.clone());
    assert_eq!(subscriber.values(), vec![5, 6, 7]);
    assert!(subscriber.is_completed());
  }

  #[test]
  fn exhausted_range_completes_without_demand() {
    let subscriber = TestSubscriber::<u64, Infallible>::new();
    flowable::range(5, 0).subscribe_with(subscriber.clone());
    assert!(subscriber.is_completed());

    let subscriber = TestSubscriber::<u64, Infallible>::new();
    flowable::range(0, 2).subscribe_with(subscriber.clone());
    subscriber.request(2);
    assert_eq!(subscriber.values(), vec![0, 1]);
    assert!(subscriber.is_completed());
  }

  #[test]
  fn unsized_iterator_completes_on_the_next_request() {
    let subscriber = TestSubscriber::<u64, Infallible>::new();
    flowable::from_iter((0..4).filter(|v| v % 2 == 0)).subscribe_with(subscriber.clone());
    subscriber.request(2);
    assert_eq!(subscriber.values(), vec![0, 2]);
    assert!(!subscriber.is_completed());
    subscriber.request(1);
    assert!(subscriber.is_completed());
  }

  #[test]
  fn request_from_inside_next_does_not_recurse() {
    let subscription = MutArc::own(None::<FlowSubscription>);
    let seen = MutArc::own(vec![]);
    let (s, c) = (subscription.clone(), seen.clone());
    struct OneByOne {
      subscription: MutArc<Option<FlowSubscription>>,
      seen: MutArc<Vec<i32>>,
    }
    impl Observer<i32, Infallible> for OneByOne {
      fn next(&mut self, value: i32) {
        self.seen.rc_deref_mut().push(value);
        let subscription = self.subscription.rc_deref().clone();
        if let Some(subscription) = subscription {
          subscription.request(1);
        }
      }
      fn error(self, _: Infallible) {}
      fn complete(self) {}
      fn is_closed(&self) -> bool { false }
    }
    impl FlowSubscriber<i32, Infallible> for OneByOne {
      fn on_subscribe(&mut self, subscription: FlowSubscription) {
        *self.subscription.rc_deref_mut() = Some(subscription.clone());
        subscription.request(1);
      }
    }

    flowable::from_iter(0..10_000).subscribe_with(OneByOne { subscription: s, seen: c });
    assert_eq!(seen.rc_deref().len(), 10_000);
    assert!(subscription.rc_deref().is_some());
  }

  #[test]
  fn empty_and_throw_need_no_demand() {
    let subscriber = TestSubscriber::<i32, &str>::new();
    flowable::empty().subscribe_with(subscriber.clone());
    assert!(subscriber.is_completed());

    let subscriber = TestSubscriber::<i32, &str>::new();
    flowable::throw_err("boom").subscribe_with(subscriber.clone());
    assert_eq!(subscriber.err(), Some("boom"));
  }
}
