//! Concurrent flattening.
//!
//! Every source (the outer one and all inners) counts as one active
//! producer; the result completes when the last producer completed. Values
//! are delivered through one serialized queue, whichever thread produces
//! them. The first error terminates the result and cancels every producer.

use std::marker::PhantomData;

use crate::{
  observable::Observable,
  observer::{Emission, Observer, Serialized},
  rc::MutArc,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

#[derive(Clone)]
pub struct MergeOp<A, B> {
  pub a: A,
  pub b: B,
}

#[derive(Clone)]
pub struct FlatMapOp<S, F> {
  pub source: S,
  pub func: F,
}

pub struct Shared<O, Item, Err> {
  active: MutArc<usize>,
  downstream: Serialized<Subscriber<O>, Item, Err>,
}

impl<O, Item, Err> Clone for Shared<O, Item, Err> {
  fn clone(&self) -> Self { Shared { active: self.active.clone(), downstream: self.downstream.clone() } }
}

impl<O, Item, Err> Shared<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  fn new(subscriber: Subscriber<O>, active: usize) -> Self {
    Shared { active: MutArc::own(active), downstream: Serialized::new(subscriber) }
  }

  fn producer_done(&self) {
    let mut active = self.active.rc_deref_mut();
    *active -= 1;
    if *active == 0 {
      self.downstream.enqueue(Emission::Complete);
    }
    drop(active);
    self.downstream.drain();
  }
}

/// Observer of one merged producer.
pub struct MergeObserver<O, Item, Err>(Shared<O, Item, Err>);

impl<O, Item, Err> Observer<Item, Err> for MergeObserver<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.0.downstream.emit(Emission::Value(value)) }

  fn error(self, err: Err) { self.0.downstream.emit(Emission::Error(err)) }

  fn complete(self) { self.0.producer_done() }

  fn is_closed(&self) -> bool { self.0.downstream.is_closed() }
}

impl<A, B> Observable for MergeOp<A, B>
where
  A: Observable,
  B: Observable<Item = A::Item, Err = A::Err>,
{
  type Item = A::Item;
  type Err = A::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<A::Item, A::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let shared = Shared::new(subscriber, 2);
    let a = MergeObserver(shared.clone());
    self.a.actual_subscribe(Subscriber::with_subscription(a, subscription.child()));
    let b = MergeObserver(shared);
    self.b.actual_subscribe(Subscriber::with_subscription(b, subscription.child()));
    subscription
  }
}

impl<S, F, S2> Observable for FlatMapOp<S, F>
where
  S: Observable,
  F: FnMut(S::Item) -> S2 + Send + 'static,
  S2: Observable<Err = S::Err> + 'static,
{
  type Item = S2::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S2::Item, S::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let observer = FlatMapObserver {
      func: self.func,
      shared: Shared::new(subscriber, 1),
      parent: subscription.clone(),
      _inner: PhantomData,
    };
    self.source.actual_subscribe(Subscriber::with_subscription(observer, subscription.child()));
    subscription
  }
}

pub struct FlatMapObserver<O, F, S2, Item, Err> {
  func: F,
  shared: Shared<O, Item, Err>,
  parent: SharedSubscription,
  _inner: PhantomData<fn() -> S2>,
}

impl<O, F, S2, OuterItem, Item, Err> Observer<OuterItem, Err> for FlatMapObserver<O, F, S2, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  F: FnMut(OuterItem) -> S2,
  S2: Observable<Item = Item, Err = Err>,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: OuterItem) {
    let inner = (self.func)(value);
    *self.shared.active.rc_deref_mut() += 1;
    let observer = MergeObserver(self.shared.clone());
    inner.actual_subscribe(Subscriber::with_subscription(observer, self.parent.child()));
  }

  fn error(self, err: Err) { self.shared.downstream.emit(Emission::Error(err)) }

  fn complete(self) { self.shared.producer_done() }

  fn is_closed(&self) -> bool { self.shared.downstream.is_closed() }
}
