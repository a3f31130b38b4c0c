use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  observable::{ConnectableObservable, Observable},
  observer::Observer,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Connects its [`ConnectableObservable`] when the `threshold`-th subscriber
/// attaches. Later subscribers join the running activation.
pub struct AutoConnect<S: Observable> {
  connectable: ConnectableObservable<S>,
  threshold: usize,
  subscribers: Arc<Mutex<usize>>,
}

impl<S: Observable> Clone for AutoConnect<S> {
  fn clone(&self) -> Self {
    AutoConnect {
      connectable: self.connectable.clone(),
      threshold: self.threshold,
      subscribers: self.subscribers.clone(),
    }
  }
}

impl<S> AutoConnect<S>
where
  S: Observable + Clone + Send + Sync + 'static,
  S::Item: Clone,
  S::Err: Clone,
{
  pub(crate) fn new(connectable: ConnectableObservable<S>, threshold: usize) -> Self {
    if threshold == 0 {
      connectable.connect();
    }
    AutoConnect { connectable, threshold, subscribers: Arc::new(Mutex::new(0)) }
  }
}

impl<S> Observable for AutoConnect<S>
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
    let reached = {
      let mut subscribers = self.subscribers.lock();
      *subscribers += 1;
      *subscribers == self.threshold
    };
    if reached {
      self.connectable.connect();
    }
    subscription
  }
}
