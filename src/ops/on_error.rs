//! Error recovery by substitution.

use std::marker::PhantomData;

use crate::{
  observable::Observable,
  observer::Observer,
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// On error, continue with the observable built from the error.
///
/// The failed source is unsubscribed before the fallback is subscribed.
#[derive(Clone)]
pub struct OnErrorResumeNextOp<S, F> {
  pub source: S,
  pub func: F,
}

/// On error, emit a value built from the error and complete.
#[derive(Clone)]
pub struct OnErrorReturnOp<S, F> {
  pub source: S,
  pub func: F,
}

impl<S, F, S2> Observable for OnErrorResumeNextOp<S, F>
where
  S: Observable,
  F: FnOnce(S::Err) -> S2 + Send + 'static,
  S2: Observable<Item = S::Item> + 'static,
{
  type Item = S::Item;
  type Err = S2::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S::Item, S2::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let attempt = subscription.child();
    let observer = ResumeObserver {
      downstream: subscriber,
      func: self.func,
      attempt: attempt.clone(),
      _fallback: PhantomData,
    };
    self.source.actual_subscribe(Subscriber::with_subscription(observer, attempt));
    subscription
  }
}

pub struct ResumeObserver<O, F, S2> {
  downstream: Subscriber<O>,
  func: F,
  attempt: SharedSubscription,
  _fallback: PhantomData<fn() -> S2>,
}

impl<O, F, Item, Err, S2> Observer<Item, Err> for ResumeObserver<O, F, S2>
where
  O: Observer<Item, S2::Err> + Send + 'static,
  F: FnOnce(Err) -> S2,
  S2: Observable<Item = Item>,
{
  fn next(&mut self, value: Item) { self.downstream.next(value) }

  fn error(self, err: Err) {
    self.attempt.unsubscribe();
    let fallback = (self.func)(err);
    fallback.actual_subscribe(self.downstream);
  }

  fn complete(self) { self.downstream.complete() }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

impl<S, F> Observable for OnErrorReturnOp<S, F>
where
  S: Observable,
  F: FnOnce(S::Err) -> S::Item + Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let func = self.func;
    self.source.actual_subscribe(subscriber.map(|observer| ReturnObserver { observer, func }))
  }
}

pub struct ReturnObserver<O, F> {
  observer: O,
  func: F,
}

impl<O, F, Item, Err> Observer<Item, Err> for ReturnObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnOnce(Err) -> Item,
{
  fn next(&mut self, value: Item) { self.observer.next(value) }

  fn error(mut self, err: Err) {
    self.observer.next((self.func)(err));
    self.observer.complete()
  }

  fn complete(self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}
