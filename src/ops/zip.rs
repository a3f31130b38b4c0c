//! Pairwise combination of two sources.
//!
//! Values of each side are buffered until the other side has a value at the
//! same position. The result completes as soon as a completed side has no
//! buffered values left, since no further pair can be formed.

use std::collections::VecDeque;

use crate::{
  observable::Observable,
  observer::{Emission, Observer, Serialized},
  rc::MutArc,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

#[derive(Clone)]
pub struct ZipOp<A, B> {
  pub a: A,
  pub b: B,
}

impl<A, B> Observable for ZipOp<A, B>
where
  A: Observable,
  B: Observable<Err = A::Err>,
{
  type Item = (A::Item, B::Item);
  type Err = A::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Self::Item, A::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let downstream = Serialized::new(subscriber);
    let state = MutArc::own(ZipState {
      buffer_a: VecDeque::new(),
      buffer_b: VecDeque::new(),
      completed_a: false,
      completed_b: false,
    });

    let a = ZipAObserver { state: state.clone(), downstream: downstream.clone() };
    self.a.actual_subscribe(Subscriber::with_subscription(a, subscription.child()));
    let b = ZipBObserver { state, downstream };
    self.b.actual_subscribe(Subscriber::with_subscription(b, subscription.child()));
    subscription
  }
}

pub struct ZipState<ItemA, ItemB> {
  buffer_a: VecDeque<ItemA>,
  buffer_b: VecDeque<ItemB>,
  completed_a: bool,
  completed_b: bool,
}

impl<ItemA, ItemB> ZipState<ItemA, ItemB> {
  fn exhausted(&self) -> bool {
    self.completed_a && self.buffer_a.is_empty() || self.completed_b && self.buffer_b.is_empty()
  }
}

type Downstream<O, ItemA, ItemB, Err> = Serialized<Subscriber<O>, (ItemA, ItemB), Err>;

pub struct ZipAObserver<O, ItemA, ItemB, Err> {
  state: MutArc<ZipState<ItemA, ItemB>>,
  downstream: Downstream<O, ItemA, ItemB, Err>,
}

pub struct ZipBObserver<O, ItemA, ItemB, Err> {
  state: MutArc<ZipState<ItemA, ItemB>>,
  downstream: Downstream<O, ItemA, ItemB, Err>,
}

impl<O, ItemA, ItemB, Err> Observer<ItemA, Err> for ZipAObserver<O, ItemA, ItemB, Err>
where
  O: Observer<(ItemA, ItemB), Err>,
{
  fn next(&mut self, value: ItemA) {
    let mut state = self.state.rc_deref_mut();
    match state.buffer_b.pop_front() {
      Some(b) => {
        self.downstream.enqueue(Emission::Value((value, b)));
        if state.exhausted() {
          self.downstream.enqueue(Emission::Complete);
        }
      }
      None => state.buffer_a.push_back(value),
    }
    drop(state);
    self.downstream.drain();
  }

  fn error(self, err: Err) { self.downstream.emit(Emission::Error(err)) }

  fn complete(self) {
    let mut state = self.state.rc_deref_mut();
    state.completed_a = true;
    if state.exhausted() {
      self.downstream.enqueue(Emission::Complete);
    }
    drop(state);
    self.downstream.drain();
  }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

impl<O, ItemA, ItemB, Err> Observer<ItemB, Err> for ZipBObserver<O, ItemA, ItemB, Err>
where
  O: Observer<(ItemA, ItemB), Err>,
{
  fn next(&mut self, value: ItemB) {
    let mut state = self.state.rc_deref_mut();
    match state.buffer_a.pop_front() {
      Some(a) => {
        self.downstream.enqueue(Emission::Value((a, value)));
        if state.exhausted() {
          self.downstream.enqueue(Emission::Complete);
        }
      }
      None => state.buffer_b.push_back(value),
    }
    drop(state);
    self.downstream.drain();
  }

  fn error(self, err: Err) { self.downstream.emit(Emission::Error(err)) }

  fn complete(self) {
    let mut state = self.state.rc_deref_mut();
    state.completed_b = true;
    if state.exhausted() {
      self.downstream.enqueue(Emission::Complete);
    }
    drop(state);
    self.downstream.drain();
  }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn pairs_by_position() {
    let observer = TestObserver::<(i32, char), Infallible>::new();
    observable::from_iter(1..=3)
      .zip(observable::from_iter("ab".chars()))
      .subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![(1, 'a'), (2, 'b')]);
    assert!(observer.is_completed());
  }

  #[test]
  fn completes_when_exhausted_side_is_done() {
    let a = Subject::<i32, Infallible>::publish();
    let b = Subject::<i32, Infallible>::publish();
    let observer = TestObserver::new();
    a.clone().zip(b.clone()).subscribe_with(observer.clone());

    a.try_next(1).unwrap();
    a.try_next(2).unwrap();
    a.try_complete().unwrap();
    assert!(!observer.is_completed());

    b.try_next(10).unwrap();
    assert!(!observer.is_completed());
    b.try_next(20).unwrap();
    assert_eq!(observer.values(), vec![(1, 10), (2, 20)]);
    assert!(observer.is_completed());
    assert_eq!(b.subscriber_count(), 0);
  }

  #[test]
  fn error_from_either_side() {
    let observer = TestObserver::<(i32, i32), &str>::new();
    observable::from_iter(0..3).zip(observable::throw_err("b failed")).subscribe_with(observer.clone());
    assert_eq!(observer.err(), Some("b failed"));
  }
}
