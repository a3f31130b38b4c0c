use crate::{
  observable::Observable,
  observer::Observer,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Build the observable at subscription time, once per subscription.
pub fn defer<F, S>(factory: F) -> ObservableDefer<F>
where
  F: FnOnce() -> S,
  S: Observable,
{
  ObservableDefer(factory)
}

#[derive(Clone)]
pub struct ObservableDefer<F>(F);

impl<F, S> Observable for ObservableDefer<F>
where
  F: FnOnce() -> S,
  S: Observable,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Self::Item, Self::Err> + Send + 'static,
  {
    (self.0)().actual_subscribe(subscriber)
  }
}
