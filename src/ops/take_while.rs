use crate::{
  observable::Observable, observer::Observer, subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Emit values while the predicate holds; the first failing value completes
/// the sequence.
#[derive(Clone)]
pub struct TakeWhileOp<S, F> {
  pub source: S,
  pub predicate: F,
}

impl<S, F> Observable for TakeWhileOp<S, F>
where
  S: Observable,
  F: FnMut(&S::Item) -> bool + Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let observer = TakeWhileObserver { observer: Some(subscriber), predicate: self.predicate };
    self.source.actual_subscribe(Subscriber::with_subscription(observer, subscription))
  }
}

pub struct TakeWhileObserver<O, F> {
  observer: Option<Subscriber<O>>,
  predicate: F,
}

impl<Item, Err, O, F> Observer<Item, Err> for TakeWhileObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnMut(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    let Some(observer) = self.observer.as_mut() else { return };
    if (self.predicate)(&value) {
      observer.next(value);
    } else if let Some(observer) = self.observer.take() {
      observer.complete();
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

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn stops_at_first_failure() {
    let observer = TestObserver::<i32, Infallible>::new();
    observable::from_iter(vec![1, 2, 5, 1]).take_while(|v| *v < 3).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![1, 2]);
    assert!(observer.is_completed());
  }
}
