use std::marker::PhantomData;

use crate::{
  observable::Observable,
  observer::Observer,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Emit `value`, then complete.
pub fn of<Item, Err>(value: Item) -> ObservableOf<Item, Err> { ObservableOf(value, PhantomData) }

/// Complete without emitting.
pub fn empty<Item, Err>() -> ObservableEmpty<Item, Err> { ObservableEmpty(PhantomData) }

/// Never emit and never terminate.
pub fn never<Item, Err>() -> ObservableNever<Item, Err> { ObservableNever(PhantomData) }

/// Fail immediately with `err`.
pub fn throw_err<Item, Err>(err: Err) -> ThrowErr<Item, Err> { ThrowErr(err, PhantomData) }

pub struct ObservableOf<Item, Err>(Item, PhantomData<fn() -> Err>);

pub struct ObservableEmpty<Item, Err>(PhantomData<fn() -> (Item, Err)>);

pub struct ObservableNever<Item, Err>(PhantomData<fn() -> (Item, Err)>);

pub struct ThrowErr<Item, Err>(Err, PhantomData<fn() -> Item>);

impl<Item: Clone, Err> Clone for ObservableOf<Item, Err> {
  fn clone(&self) -> Self { ObservableOf(self.0.clone(), PhantomData) }
}

impl<Item, Err> Clone for ObservableEmpty<Item, Err> {
  fn clone(&self) -> Self { ObservableEmpty(PhantomData) }
}

impl<Item, Err> Clone for ObservableNever<Item, Err> {
  fn clone(&self) -> Self { ObservableNever(PhantomData) }
}

impl<Item, Err: Clone> Clone for ThrowErr<Item, Err> {
  fn clone(&self) -> Self { ThrowErr(self.0.clone(), PhantomData) }
}

impl<Item, Err> Observable for ObservableOf<Item, Err>
where
  Item: Send + 'static,
  Err: Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe<O>(self, mut subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    subscriber.next(self.0);
    subscriber.complete();
    subscription
  }
}

impl<Item, Err> Observable for ObservableEmpty<Item, Err>
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
    let subscription = subscriber.subscription.clone();
    subscriber.complete();
    subscription
  }
}

impl<Item, Err> Observable for ObservableNever<Item, Err>
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
    let Subscriber { observer, subscription } = subscriber;
    // Keep the observer alive until cancellation.
    let slot = parking_lot::Mutex::new(Some(observer));
    subscription.add_fn(move || drop(slot.lock().take()));
    subscription
  }
}

impl<Item, Err> Observable for ThrowErr<Item, Err>
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
    let subscription = subscriber.subscription.clone();
    subscriber.error(self.0);
    subscription
  }
}
