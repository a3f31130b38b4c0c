use crate::{
  observable::Observable, observer::Observer, subscriber::Subscriber,
  subscription::SharedSubscription,
};

#[derive(Clone)]
pub struct FilterMapOp<S, F> {
  pub source: S,
  pub func: F,
}

impl<S, F, B> Observable for FilterMapOp<S, F>
where
  S: Observable,
  F: FnMut(S::Item) -> Option<B> + Send + 'static,
  B: Send + 'static,
{
  type Item = B;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<B, S::Err> + Send + 'static,
  {
    let func = self.func;
    self.source.actual_subscribe(subscriber.map(|observer| FilterMapObserver { observer, func }))
  }
}

pub struct FilterMapObserver<O, F> {
  observer: O,
  func: F,
}

impl<Item, Err, O, F, B> Observer<Item, Err> for FilterMapObserver<O, F>
where
  O: Observer<B, Err>,
  F: FnMut(Item) -> Option<B>,
{
  fn next(&mut self, value: Item) {
    if let Some(v) = (self.func)(value) {
      self.observer.next(v)
    }
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}
