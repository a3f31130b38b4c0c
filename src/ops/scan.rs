use crate::{
  observable::Observable, observer::Observer, subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Apply an accumulator to every value and emit each intermediate result.
#[derive(Clone)]
pub struct ScanOp<S, F, B> {
  pub source: S,
  pub func: F,
  pub initial: B,
}

impl<S, F, B> Observable for ScanOp<S, F, B>
where
  S: Observable,
  F: FnMut(B, S::Item) -> B + Send + 'static,
  B: Clone + Send + 'static,
{
  type Item = B;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<B, S::Err> + Send + 'static,
  {
    let ScanOp { source, func, initial } = self;
    source.actual_subscribe(subscriber.map(|observer| ScanObserver {
      observer,
      func,
      acc: Some(initial),
    }))
  }
}

pub struct ScanObserver<O, F, B> {
  observer: O,
  func: F,
  acc: Option<B>,
}

impl<Item, Err, O, F, B> Observer<Item, Err> for ScanObserver<O, F, B>
where
  O: Observer<B, Err>,
  F: FnMut(B, Item) -> B,
  B: Clone,
{
  fn next(&mut self, value: Item) {
    if let Some(acc) = self.acc.take() {
      let acc = (self.func)(acc, value);
      self.acc = Some(acc.clone());
      self.observer.next(acc);
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
  fn running_total() {
    let observer = TestObserver::<i32, Infallible>::new();
    observable::from_iter(vec![1, 1, 1, 1]).scan(0, |acc, v| acc + v).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![1, 2, 3, 4]);
  }

  #[test]
  fn accumulator_is_per_subscription() {
    let source = observable::from_iter::<_, Infallible>(vec![1, 2]).scan(10, |acc, v| acc + v);
    let a = TestObserver::new();
    let b = TestObserver::new();
    source.clone().subscribe_with(a.clone());
    source.subscribe_with(b.clone());
    assert_eq!(a.values(), vec![11, 13]);
    assert_eq!(b.values(), vec![11, 13]);
  }
}
