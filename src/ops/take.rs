use crate::{
  observable::Observable, observer::Observer, subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Emit only the first `count` values, then complete and cancel the source.
#[derive(Clone)]
pub struct TakeOp<S> {
  pub source: S,
  pub count: usize,
}

impl<S: Observable> Observable for TakeOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    if self.count == 0 {
      subscriber.complete();
      return subscription;
    }
    let observer = TakeObserver { observer: Some(subscriber), remaining: self.count };
    self.source.actual_subscribe(Subscriber::with_subscription(observer, subscription))
  }
}

pub struct TakeObserver<O> {
  observer: Option<Subscriber<O>>,
  remaining: usize,
}

impl<Item, Err, O> Observer<Item, Err> for TakeObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(observer) = self.observer.as_mut() {
      self.remaining -= 1;
      observer.next(value);
      if self.remaining == 0 {
        if let Some(observer) = self.observer.take() {
          observer.complete();
        }
      }
    }
  }

  fn error(self, err: Err) {
    if let Some(observer) = self.observer {
      observer.error(err)
    }
  }

  fn complete(self) {
    if let Some(observer) = self.observer {
      observer.complete()
    }
  }

  fn is_closed(&self) -> bool { self.observer.as_ref().map_or(true, |o| o.is_closed()) }
}
