use std::marker::PhantomData;

use tracing::trace;

use crate::{
  observable::Observable,
  observer::{Emission, Observer, Serialized},
  rc::MutArc,
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// Maps every value to an inner observable and mirrors only the latest one.
///
/// The previous inner is cancelled before the next is subscribed, so a
/// superseded inner never emits again. The result completes once the outer
/// source and the current inner have completed.
#[derive(Clone)]
pub struct SwitchMapOp<S, F> {
  pub source: S,
  pub func: F,
}

impl<S, F, S2> Observable for SwitchMapOp<S, F>
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
    let observer = SwitchMapObserver {
      func: self.func,
      shared: Shared {
        state: MutArc::own(SwitchState { inner: None, generation: 0, outer_done: false }),
        downstream: Serialized::new(subscriber),
        parent: subscription.clone(),
      },
      _inner: PhantomData,
    };
    self.source.actual_subscribe(Subscriber::with_subscription(observer, subscription.child()));
    subscription
  }
}

pub struct SwitchState {
  /// Subscription of the current inner, `None` when no inner is active.
  inner: Option<SharedSubscription>,
  generation: u64,
  outer_done: bool,
}

pub struct Shared<O, Item, Err> {
  state: MutArc<SwitchState>,
  downstream: Serialized<Subscriber<O>, Item, Err>,
  parent: SharedSubscription,
}

impl<O, Item, Err> Clone for Shared<O, Item, Err> {
  fn clone(&self) -> Self {
    Shared {
      state: self.state.clone(),
      downstream: self.downstream.clone(),
      parent: self.parent.clone(),
    }
  }
}

pub struct SwitchMapObserver<O, F, S2, Item, Err> {
  func: F,
  shared: Shared<O, Item, Err>,
  _inner: PhantomData<fn() -> S2>,
}

impl<O, F, S2, OuterItem, Item, Err> Observer<OuterItem, Err>
  for SwitchMapObserver<O, F, S2, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  F: FnMut(OuterItem) -> S2,
  S2: Observable<Item = Item, Err = Err>,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: OuterItem) {
    let inner = (self.func)(value);
    let shared = &self.shared;
    let (previous, child, generation) = {
      let mut state = shared.state.rc_deref_mut();
      state.generation += 1;
      let child = shared.parent.child();
      (state.inner.replace(child.clone()), child, state.generation)
    };
    if let Some(previous) = previous {
      trace!(generation, "switch_map cancelled the previous inner");
      previous.unsubscribe();
    }
    let observer = SwitchInnerObserver { shared: shared.clone(), generation };
    inner.actual_subscribe(Subscriber::with_subscription(observer, child));
  }

  fn error(self, err: Err) { self.shared.downstream.emit(Emission::Error(err)) }

  fn complete(self) {
    let mut state = self.shared.state.rc_deref_mut();
    state.outer_done = true;
    if state.inner.is_none() {
      self.shared.downstream.enqueue(Emission::Complete);
    }
    drop(state);
    self.shared.downstream.drain();
  }

  fn is_closed(&self) -> bool { self.shared.downstream.is_closed() }
}

pub struct SwitchInnerObserver<O, Item, Err> {
  shared: Shared<O, Item, Err>,
  generation: u64,
}

impl<O, Item, Err> Observer<Item, Err> for SwitchInnerObserver<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    let state = self.shared.state.rc_deref();
    if state.generation == self.generation {
      self.shared.downstream.enqueue(Emission::Value(value));
    }
    drop(state);
    self.shared.downstream.drain();
  }

  fn error(self, err: Err) {
    let state = self.shared.state.rc_deref();
    if state.generation == self.generation {
      self.shared.downstream.enqueue(Emission::Error(err));
    }
    drop(state);
    self.shared.downstream.drain();
  }

  fn complete(self) {
    let mut state = self.shared.state.rc_deref_mut();
    if state.generation == self.generation {
      state.inner = None;
      if state.outer_done {
        self.shared.downstream.enqueue(Emission::Complete);
      }
    }
    drop(state);
    self.shared.downstream.drain();
  }

  fn is_closed(&self) -> bool { self.shared.downstream.is_closed() }
}
