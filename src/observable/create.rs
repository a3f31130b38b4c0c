use std::marker::PhantomData;

use crate::{
  observable::Observable,
  observer::{BoxedObserver, Observer},
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// Build an observable from a producer closure.
///
/// The closure receives an [`Emitter`] it may use synchronously or move to
/// another thread. Emissions after a terminal or after cancellation are
/// ignored.
///
/// ```
/// use rxflow::prelude::*;
///
/// let log = MutArc::own(vec![]);
/// let l = log.clone();
/// observable::create(|mut emitter: Emitter<i32, Infallible>| {
///   emitter.next(1);
///   emitter.next(2);
///   emitter.complete();
/// })
/// .subscribe(move |v| l.rc_deref_mut().push(v));
/// assert_eq!(*log.rc_deref(), vec![1, 2]);
/// ```
pub fn create<Item, Err, F>(producer: F) -> ObservableCreate<F, Item, Err>
where
  F: FnOnce(Emitter<Item, Err>),
{
  ObservableCreate(producer, PhantomData)
}

pub struct ObservableCreate<F, Item, Err>(F, PhantomData<fn() -> (Item, Err)>);

impl<F: Clone, Item, Err> Clone for ObservableCreate<F, Item, Err> {
  fn clone(&self) -> Self { ObservableCreate(self.0.clone(), PhantomData) }
}

/// The producer side handed to [`create`].
pub struct Emitter<Item, Err> {
  observer: Option<Subscriber<BoxedObserver<Item, Err>>>,
  subscription: SharedSubscription,
}

impl<Item, Err> Emitter<Item, Err> {
  pub fn next(&mut self, value: Item) {
    if let Some(observer) = self.observer.as_mut() {
      observer.next(value)
    }
  }

  pub fn error(&mut self, err: Err) {
    if let Some(observer) = self.observer.take() {
      observer.error(err)
    }
  }

  pub fn complete(&mut self) {
    if let Some(observer) = self.observer.take() {
      observer.complete()
    }
  }

  /// `true` after a terminal or once the consumer cancelled.
  pub fn is_closed(&self) -> bool { self.observer.as_ref().map_or(true, |o| o.is_closed()) }

  /// Release a producer resource when the activation ends.
  pub fn add_teardown(&self, f: impl FnOnce() + Send + 'static) { self.subscription.add_fn(f) }

  /// Release a producer subscription when the activation ends.
  pub fn add_subscription(&self, subscription: impl SubscriptionLike + Send + Sync + 'static) {
    self.subscription.add(subscription)
  }
}

impl<F, Item, Err> Observable for ObservableCreate<F, Item, Err>
where
  F: FnOnce(Emitter<Item, Err>),
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let Subscriber { observer, subscription } = subscriber;
    let boxed: BoxedObserver<Item, Err> = Box::new(observer);
    (self.0)(Emitter {
      observer: Some(Subscriber::with_subscription(boxed, subscription.clone())),
      subscription: subscription.clone(),
    });
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{
      atomic::{AtomicBool, Ordering},
      Arc,
    },
    thread,
  };

  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn ignores_emissions_after_terminal() {
    let observer = TestObserver::<i32, &str>::new();
    observable::create(|mut emitter: Emitter<i32, &str>| {
      emitter.next(1);
      emitter.complete();
      emitter.next(2);
      emitter.error("late");
    })
    .subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![1]);
    assert!(observer.is_completed());
    assert_eq!(observer.err(), None);
  }

  #[test]
  fn teardown_runs_on_cancel() {
    let released = Arc::new(AtomicBool::new(false));
    let r = released.clone();
    let subscription = observable::create(move |emitter: Emitter<i32, Infallible>| {
      emitter.add_teardown(move || r.store(true, Ordering::SeqCst));
    })
    .subscribe(|_| {});
    assert!(!released.load(Ordering::SeqCst));
    subscription.unsubscribe();
    assert!(released.load(Ordering::SeqCst));
  }

  #[test]
  fn emitter_moves_to_producer_thread() {
    let observer = TestObserver::<usize, Infallible>::new();
    let (tx, rx) = crossbeam_channel::bounded(1);
    observable::create(move |mut emitter: Emitter<usize, Infallible>| {
      thread::spawn(move || {
        (0..3).for_each(|i| emitter.next(i));
        emitter.complete();
        tx.send(()).unwrap();
      });
    })
    .subscribe_with(observer.clone());
    rx.recv().unwrap();
    assert_eq!(observer.values(), vec![0, 1, 2]);
    assert!(observer.is_completed());
  }
}
