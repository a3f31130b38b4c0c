//! Type erasure for pipelines.
//!
//! Operator chains produce deeply nested types. [`BoxedObservable`] hides the
//! concrete type behind a trait object so pipelines can be stored in struct
//! fields, returned from branches that build different chains, or kept in
//! collections.

use crate::{
  observable::Observable,
  observer::{BoxedObserver, Observer},
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Object-safe mirror of [`Observable`].
pub trait DynObservable<Item, Err> {
  fn box_subscribe(self: Box<Self>, subscriber: Subscriber<BoxedObserver<Item, Err>>)
    -> SharedSubscription;
}

impl<S> DynObservable<S::Item, S::Err> for S
where
  S: Observable,
{
  fn box_subscribe(
    self: Box<Self>, subscriber: Subscriber<BoxedObserver<S::Item, S::Err>>,
  ) -> SharedSubscription {
    (*self).actual_subscribe(subscriber)
  }
}

/// An observable of `Item`s with its concrete type erased.
pub struct BoxedObservable<Item, Err>(Box<dyn DynObservable<Item, Err> + Send>);

impl<Item, Err> BoxedObservable<Item, Err> {
  pub fn new<S>(source: S) -> Self
  where
    S: Observable<Item = Item, Err = Err> + Send + 'static,
  {
    BoxedObservable(Box::new(source))
  }
}

impl<Item, Err> Observable for BoxedObservable<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let subscriber = subscriber.map(|observer| -> BoxedObserver<Item, Err> { Box::new(observer) });
    self.0.box_subscribe(subscriber)
  }
}
