use crate::{
  observable::Observable, observer::Observer, subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Ignore the first `count` values.
#[derive(Clone)]
pub struct SkipOp<S> {
  pub source: S,
  pub count: usize,
}

impl<S: Observable> Observable for SkipOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let count = self.count;
    self.source.actual_subscribe(subscriber.map(|observer| SkipObserver { observer, count }))
  }
}

pub struct SkipObserver<O> {
  observer: O,
  count: usize,
}

impl<Item, Err, O> Observer<Item, Err> for SkipObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.count == 0 {
      self.observer.next(value);
    } else {
      self.count -= 1;
    }
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(self) { self.observer.complete() }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

#[cfg(test)]
mod tests {
  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn skips_prefix() {
    let observer = TestObserver::<i32, Infallible>::new();
    observable::from_iter(0..5).skip(3).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![3, 4]);
    assert!(observer.is_completed());
  }

  #[test]
  fn skip_more_than_length() {
    let observer = TestObserver::<i32, Infallible>::new();
    observable::from_iter(0..2).skip(5).subscribe_with(observer.clone());
    assert!(observer.values().is_empty());
    assert!(observer.is_completed());
  }
}
