//! Automatic connection management for a [`ConnectableObservable`].
//!
//! The first subscriber connects the source; when the number of subscribers
//! drops back to zero the connection is unsubscribed and the subject
//! forgotten, so the next subscriber starts a fresh activation on a fresh
//! subject from the factory.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::{
  observable::{ConnectableObservable, Observable},
  observer::Observer,
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};

pub struct RefCount<S: Observable> {
  connectable: ConnectableObservable<S>,
  subscribers: Arc<Mutex<usize>>,
}

impl<S: Observable> Clone for RefCount<S> {
  fn clone(&self) -> Self {
    RefCount { connectable: self.connectable.clone(), subscribers: self.subscribers.clone() }
  }
}

impl<S> RefCount<S>
where
  S: Observable + Clone + Send + Sync + 'static,
  S::Item: Clone,
  S::Err: Clone,
{
  pub(crate) fn new(connectable: ConnectableObservable<S>) -> Self {
    RefCount { connectable, subscribers: Arc::new(Mutex::new(0)) }
  }

  /// Number of subscribers currently attached.
  pub fn subscriber_count(&self) -> usize { *self.subscribers.lock() }

  fn release(&self) {
    let connection = {
      let mut subscribers = self.subscribers.lock();
      *subscribers = subscribers.saturating_sub(1);
      if *subscribers > 0 {
        return;
      }
      self.connectable.reset()
    };
    if let Some(connection) = connection {
      debug!("last subscriber left, disconnecting");
      connection.unsubscribe();
    }
  }
}

impl<S> Observable for RefCount<S>
where
  S: Observable + Clone + Send + Sync + 'static,
  S::Item: Clone,
  S::Err: Clone,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let subscription = self.connectable.subject().actual_subscribe(subscriber);
    if subscription.is_closed() {
      return subscription;
    }
    let first = {
      let mut subscribers = self.subscribers.lock();
      *subscribers += 1;
      *subscribers == 1
    };
    let this = self.clone();
    subscription.add_fn(move || this.release());
    if first {
      self.connectable.connect();
    }
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{
      atomic::{AtomicUsize, Ordering},
      Arc,
    },
    time::Duration,
  };

  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn connects_once_for_many_subscribers() {
    let subject = Subject::<i32, Infallible>::publish();
    let shared = subject.clone().share();
    let (a, b) = (TestObserver::new(), TestObserver::new());
    let sa = shared.clone().subscribe_with(a.clone());
    let sb = shared.clone().subscribe_with(b.clone());
    assert_eq!(subject.subscriber_count(), 1);
    assert_eq!(shared.subscriber_count(), 2);

    subject.try_next(1).unwrap();
    sa.unsubscribe();
    subject.try_next(2).unwrap();
    assert_eq!(a.values(), vec![1]);
    assert_eq!(b.values(), vec![1, 2]);
    assert_eq!(subject.subscriber_count(), 1);

    sb.unsubscribe();
    assert_eq!(subject.subscriber_count(), 0);
    assert_eq!(shared.subscriber_count(), 0);
  }

  #[test]
  fn resubscribe_after_zero_starts_fresh_activation() {
    let activations = Arc::new(AtomicUsize::new(0));
    let a = activations.clone();
    let scheduler = VirtualTimeScheduler::new();
    let sched = scheduler.clone();
    let shared = observable::defer(move || {
      a.fetch_add(1, Ordering::SeqCst);
      observable::interval::<_, Infallible>(Duration::from_millis(10), sched.clone())
    })
    .share();

    let first = TestObserver::new();
    let subscription = shared.clone().subscribe_with(first.clone());
    scheduler.advance_by(Duration::from_millis(25));
    subscription.unsubscribe();
    assert_eq!(first.values(), vec![0, 1]);
    assert!(scheduler.is_empty());

    let second = TestObserver::new();
    shared.clone().subscribe_with(second.clone());
    scheduler.advance_by(Duration::from_millis(10));
    assert_eq!(second.values(), vec![0]);
    assert_eq!(activations.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn fresh_replay_history_per_activation() {
    let subject = Subject::<i32, Infallible>::publish();
    let shared = subject
      .clone()
      .replay(ReplayConfig::unbounded(), VirtualTimeScheduler::new())
      .ref_count();

    let first = TestObserver::new();
    let s = shared.clone().subscribe_with(first.clone());
    subject.try_next(1).unwrap();
    s.unsubscribe();

    let second = TestObserver::new();
    shared.clone().subscribe_with(second.clone());
    subject.try_next(2).unwrap();
    assert_eq!(first.values(), vec![1]);
    assert_eq!(second.values(), vec![2]);
  }

  #[test]
  fn synchronous_source_completes_every_activation() {
    let observer = TestObserver::<i32, Infallible>::new();
    let shared = observable::from_iter(vec![1, 2]).share();
    shared.clone().subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![1, 2]);
    assert!(observer.is_completed());

    let again = TestObserver::new();
    shared.clone().subscribe_with(again.clone());
    assert_eq!(again.values(), vec![1, 2]);
    assert_eq!(shared.subscriber_count(), 0);
  }
}
