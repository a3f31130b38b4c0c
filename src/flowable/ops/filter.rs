use crate::{
  flowable::{FlowSubscriber, FlowSubscription, Flowable},
  observer::Observer,
};

/// Pass only values satisfying a predicate. Every rejected value costs the
/// upstream one unit of demand, so it is replaced by a request for one more.
#[derive(Clone)]
pub struct FilterOp<S, F> {
  pub source: S,
  pub predicate: F,
}

impl<S, F> Flowable for FilterOp<S, F>
where
  S: Flowable,
  F: FnMut(&S::Item) -> bool + Send + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<Sub>(self, subscriber: Sub) -> FlowSubscription
  where
    Sub: FlowSubscriber<S::Item, S::Err> + Send + 'static,
  {
    self.source.actual_subscribe(FilterSubscriber {
      subscriber,
      predicate: self.predicate,
      upstream: None,
    })
  }
}

pub struct FilterSubscriber<Sub, F> {
  subscriber: Sub,
  predicate: F,
  upstream: Option<FlowSubscription>,
}

impl<Item, Err, Sub, F> Observer<Item, Err> for FilterSubscriber<Sub, F>
where
  Sub: Observer<Item, Err>,
  F: FnMut(&Item) -> bool,
{
  fn next(&mut self, value: Item) {
    if (self.predicate)(&value) {
      self.subscriber.next(value)
    } else if let Some(upstream) = &self.upstream {
      upstream.request(1)
    }
  }

  fn error(self, err: Err) { self.subscriber.error(err) }

  fn complete(self) { self.subscriber.complete() }

  fn is_closed(&self) -> bool { self.subscriber.is_closed() }
}

impl<Item, Err, Sub, F> FlowSubscriber<Item, Err> for FilterSubscriber<Sub, F>
where
  Sub: FlowSubscriber<Item, Err>,
  F: FnMut(&Item) -> bool,
{
  fn on_subscribe(&mut self, subscription: FlowSubscription) {
    self.upstream = Some(subscription.clone());
    self.subscriber.on_subscribe(subscription)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use crate::{prelude::*, testing::TestSubscriber};

  #[test]
  fn rejected_values_are_replaced() {
    let subscriber = TestSubscriber::<i32, Infallible>::new();
    flowable::from_iter(0..20).filter(|v| v % 5 == 0).subscribe_with(subscriber.clone());
    subscriber.request(2);
    assert_eq!(subscriber.values(), vec![0, 5]);
    subscriber.request(1);
    assert_eq!(subscriber.values(), vec![0, 5, 10]);
  }

  #[test]
  fn pulls_no_further_than_needed() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let p = pulled.clone();
    let subscriber = TestSubscriber::<i32, Infallible>::new();
    flowable::from_iter((0..100).inspect(move |_| {
      p.fetch_add(1, Ordering::SeqCst);
    }))
    .filter(|v| v % 3 == 0)
    .subscribe_with(subscriber.clone());

    subscriber.request(2);
    assert_eq!(subscriber.values(), vec![0, 3]);
    assert_eq!(pulled.load(Ordering::SeqCst), 4);
  }
}
