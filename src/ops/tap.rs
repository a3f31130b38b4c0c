use crate::{
  observable::Observable, observer::Observer, subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Run a side effect on every value.
#[derive(Clone)]
pub struct TapOp<S, F> {
  pub source: S,
  pub func: F,
}

impl<S, F> Observable for TapOp<S, F>
where
  S: Observable,
  F: FnMut(&S::Item) + Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let func = self.func;
    self.source.actual_subscribe(subscriber.map(|observer| TapObserver { observer, func }))
  }
}

pub struct TapObserver<O, F> {
  observer: O,
  func: F,
}

impl<Item, Err, O, F> Observer<Item, Err> for TapObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnMut(&Item),
{
  fn next(&mut self, value: Item) {
    (self.func)(&value);
    self.observer.next(value)
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}
