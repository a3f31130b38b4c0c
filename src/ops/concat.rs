//! Strictly sequential flattening.
//!
//! `concat` subscribes the second source once the first completed.
//! `concat_map` queues the inner observables produced by the outer source and
//! subscribes each only after its predecessor completed.

use std::{collections::VecDeque, marker::PhantomData};

use crate::{
  observable::Observable,
  observer::{Emission, Observer, Serialized},
  rc::MutArc,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

#[derive(Clone)]
pub struct ConcatOp<A, B> {
  pub first: A,
  pub second: B,
}

impl<A, B> Observable for ConcatOp<A, B>
where
  A: Observable,
  B: Observable<Item = A::Item, Err = A::Err> + Send + 'static,
{
  type Item = A::Item;
  type Err = A::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<A::Item, A::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let first = subscription.child();
    let observer = ConcatObserver { downstream: subscriber, second: self.second };
    self.first.actual_subscribe(Subscriber::with_subscription(observer, first));
    subscription
  }
}

pub struct ConcatObserver<O, B> {
  downstream: Subscriber<O>,
  second: B,
}

impl<O, B> Observer<B::Item, B::Err> for ConcatObserver<O, B>
where
  O: Observer<B::Item, B::Err> + Send + 'static,
  B: Observable,
{
  fn next(&mut self, value: B::Item) { self.downstream.next(value) }

  fn error(self, err: B::Err) { self.downstream.error(err) }

  fn complete(self) { self.second.actual_subscribe(self.downstream); }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

#[derive(Clone)]
pub struct ConcatMapOp<S, F> {
  pub source: S,
  pub func: F,
}

impl<S, F, S2> Observable for ConcatMapOp<S, F>
where
  S: Observable,
  F: FnMut(S::Item) -> S2 + Send + 'static,
  S2: Observable<Err = S::Err> + Send + 'static,
{
  type Item = S2::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S2::Item, S::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let shared = Shared {
      state: MutArc::own(ConcatState { pending: VecDeque::new(), active: false, outer_done: false }),
      downstream: Serialized::new(subscriber),
      parent: subscription.clone(),
    };
    let observer = ConcatMapObserver { func: self.func, shared };
    self.source.actual_subscribe(Subscriber::with_subscription(observer, subscription.child()));
    subscription
  }
}

pub struct ConcatState<S2> {
  pending: VecDeque<S2>,
  active: bool,
  outer_done: bool,
}

pub struct Shared<O, S2, Item, Err> {
  state: MutArc<ConcatState<S2>>,
  downstream: Serialized<Subscriber<O>, Item, Err>,
  parent: SharedSubscription,
}

impl<O, S2, Item, Err> Clone for Shared<O, S2, Item, Err> {
  fn clone(&self) -> Self {
    Shared {
      state: self.state.clone(),
      downstream: self.downstream.clone(),
      parent: self.parent.clone(),
    }
  }
}

impl<O, S2, Item, Err> Shared<O, S2, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  S2: Observable<Item = Item, Err = Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn subscribe_inner(&self, inner: S2) {
    let observer = ConcatInnerObserver { shared: self.clone(), _item: PhantomData };
    inner.actual_subscribe(Subscriber::with_subscription(observer, self.parent.child()));
  }
}

pub struct ConcatMapObserver<O, F, S2, Item, Err> {
  func: F,
  shared: Shared<O, S2, Item, Err>,
}

impl<O, F, S2, OuterItem, Item, Err> Observer<OuterItem, Err>
  for ConcatMapObserver<O, F, S2, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  F: FnMut(OuterItem) -> S2,
  S2: Observable<Item = Item, Err = Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: OuterItem) {
    let inner = (self.func)(value);
    let start = {
      let mut state = self.shared.state.rc_deref_mut();
      if state.active {
        state.pending.push_back(inner);
        None
      } else {
        state.active = true;
        Some(inner)
      }
    };
    if let Some(inner) = start {
      self.shared.subscribe_inner(inner);
    }
  }

  fn error(self, err: Err) { self.shared.downstream.emit(Emission::Error(err)) }

  fn complete(self) {
    let mut state = self.shared.state.rc_deref_mut();
    state.outer_done = true;
    if !state.active {
      self.shared.downstream.enqueue(Emission::Complete);
    }
    drop(state);
    self.shared.downstream.drain();
  }

  fn is_closed(&self) -> bool { self.shared.downstream.is_closed() }
}

pub struct ConcatInnerObserver<O, S2, Item, Err> {
  shared: Shared<O, S2, Item, Err>,
  _item: PhantomData<fn() -> Item>,
}

impl<O, S2, Item, Err> Observer<Item, Err> for ConcatInnerObserver<O, S2, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  S2: Observable<Item = Item, Err = Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) { self.shared.downstream.emit(Emission::Value(value)) }

  fn error(self, err: Err) { self.shared.downstream.emit(Emission::Error(err)) }

  fn complete(self) {
    let next = {
      let mut state = self.shared.state.rc_deref_mut();
      let next = state.pending.pop_front();
      if next.is_none() {
        state.active = false;
        if state.outer_done {
          self.shared.downstream.enqueue(Emission::Complete);
        }
      }
      next
    };
    match next {
      Some(inner) => self.shared.subscribe_inner(inner),
      None => self.shared.downstream.drain(),
    }
  }

  fn is_closed(&self) -> bool { self.shared.downstream.is_closed() }
}
