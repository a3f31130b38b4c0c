//! Folds emitting on completion. `sum`, `count`, `min` and `max` are built on
//! these two stages.

use crate::{
  observable::Observable, observer::Observer, subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Fold without a seed: the first value seeds the accumulator. An empty
/// source completes without a value.
#[derive(Clone)]
pub struct ReduceOp<S, F> {
  pub source: S,
  pub func: F,
}

/// Fold into an initial accumulator, emitted even for an empty source.
#[derive(Clone)]
pub struct ReduceWithOp<S, F, B> {
  pub source: S,
  pub func: F,
  pub initial: B,
}

impl<S, F> Observable for ReduceOp<S, F>
where
  S: Observable,
  F: FnMut(S::Item, S::Item) -> S::Item + Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let func = self.func;
    self.source.actual_subscribe(subscriber.map(|observer| ReduceObserver {
      observer,
      func,
      acc: None,
    }))
  }
}

impl<S, F, B> Observable for ReduceWithOp<S, F, B>
where
  S: Observable,
  F: FnMut(B, S::Item) -> B + Send + 'static,
  B: Send + 'static,
{
  type Item = B;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<B, S::Err> + Send + 'static,
  {
    let ReduceWithOp { source, func, initial } = self;
    source.actual_subscribe(subscriber.map(|observer| ReduceWithObserver {
      observer,
      func,
      acc: Some(initial),
    }))
  }
}

pub struct ReduceObserver<O, F, Item> {
  observer: O,
  func: F,
  acc: Option<Item>,
}

impl<Item, Err, O, F> Observer<Item, Err> for ReduceObserver<O, F, Item>
where
  O: Observer<Item, Err>,
  F: FnMut(Item, Item) -> Item,
{
  fn next(&mut self, value: Item) {
    self.acc = Some(match self.acc.take() {
      Some(acc) => (self.func)(acc, value),
      None => value,
    });
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(mut self) {
    if let Some(acc) = self.acc.take() {
      self.observer.next(acc);
    }
    self.observer.complete()
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

pub struct ReduceWithObserver<O, F, B> {
  observer: O,
  func: F,
  acc: Option<B>,
}

impl<Item, Err, O, F, B> Observer<Item, Err> for ReduceWithObserver<O, F, B>
where
  O: Observer<B, Err>,
  F: FnMut(B, Item) -> B,
{
  fn next(&mut self, value: Item) {
    if let Some(acc) = self.acc.take() {
      self.acc = Some((self.func)(acc, value));
    }
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(mut self) {
    if let Some(acc) = self.acc.take() {
      self.observer.next(acc);
    }
    self.observer.complete()
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}
