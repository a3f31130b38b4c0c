use std::marker::PhantomData;

use crate::{
  observable::Observable,
  observer::Observer,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Emit every item of `iter` in order, then complete.
///
/// The iterator is polled lazily and stops as soon as the subscriber closes,
/// so infinite iterators are fine behind `take`.
pub fn from_iter<I, Err>(iter: I) -> ObservableFromIter<I, Err>
where
  I: IntoIterator,
{
  ObservableFromIter(iter, PhantomData)
}

pub struct ObservableFromIter<I, Err>(I, PhantomData<fn() -> Err>);

impl<I: Clone, Err> Clone for ObservableFromIter<I, Err> {
  fn clone(&self) -> Self { ObservableFromIter(self.0.clone(), PhantomData) }
}

impl<I, Err> Observable for ObservableFromIter<I, Err>
where
  I: IntoIterator,
  I::Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = I::Item;
  type Err = Err;

  fn actual_subscribe<O>(self, mut subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Self::Item, Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    for v in self.0 {
      if subscriber.is_closed() {
        return subscription;
      }
      subscriber.next(v);
    }
    subscriber.complete();
    subscription
  }
}
