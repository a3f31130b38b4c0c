use crate::{
  backpressure::{OverflowPolicy, RaiseFn},
  flowable::{
    overflow::{OverflowCore, OverflowObserver},
    FlowSubscriber, FlowSubscription, Flowable, UNBOUNDED,
  },
  observer::Observer,
  subscription::SharedSubscription,
};

/// Requests everything upstream and applies an overflow policy to values
/// the subscriber has not asked for.
pub struct OnBackpressureOp<S: Flowable> {
  pub(crate) source: S,
  pub(crate) policy: OverflowPolicy<S::Item>,
  pub(crate) raise: RaiseFn<S::Err>,
}

impl<S: Flowable + Clone> Clone for OnBackpressureOp<S> {
  fn clone(&self) -> Self {
    OnBackpressureOp { source: self.source.clone(), policy: self.policy.clone(), raise: self.raise }
  }
}

impl<S: Flowable> Flowable for OnBackpressureOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<Sub>(self, subscriber: Sub) -> FlowSubscription
  where
    Sub: FlowSubscriber<S::Item, S::Err> + Send + 'static,
  {
    let upstream = SharedSubscription::new();
    let core = OverflowCore::new(subscriber, self.policy, self.raise, upstream.clone());
    let subscription = FlowSubscription::from_arc(core.clone());
    self.source.actual_subscribe(OnBackpressureSubscriber { sink: OverflowObserver(core), upstream });
    subscription
  }
}

pub struct OnBackpressureSubscriber<Item, Err, Sub> {
  sink: OverflowObserver<Item, Err, Sub>,
  upstream: SharedSubscription,
}

impl<Item, Err, Sub> Observer<Item, Err> for OnBackpressureSubscriber<Item, Err, Sub>
where
  Item: Send + 'static,
  Err: Send + 'static,
  Sub: FlowSubscriber<Item, Err> + Send + 'static,
{
  fn next(&mut self, value: Item) { self.sink.next(value) }

  fn error(self, err: Err) { self.sink.error(err) }

  fn complete(self) { self.sink.complete() }

  fn is_closed(&self) -> bool { self.sink.is_closed() }
}

impl<Item, Err, Sub> FlowSubscriber<Item, Err> for OnBackpressureSubscriber<Item, Err, Sub>
where
  Item: Send + 'static,
  Err: Send + 'static,
  Sub: FlowSubscriber<Item, Err> + Send + 'static,
{
  fn on_subscribe(&mut self, subscription: FlowSubscription) {
    self.upstream.add(subscription.clone());
    self.sink.0.start();
    subscription.request(UNBOUNDED);
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Mutex};

  use crate::{prelude::*, testing::TestSubscriber};

  #[test]
  fn buffer_queues_until_capacity() {
    let subscriber = TestSubscriber::<u64, BackpressureError>::new();
    flowable::range(0, 3).on_backpressure_buffer(4).subscribe_with(subscriber.clone());
    assert!(subscriber.values().is_empty());
    subscriber.request(5);
    assert_eq!(subscriber.values(), vec![0, 1, 2]);
    assert!(subscriber.is_completed());
  }

  #[test]
  fn buffer_overflow_is_an_error() {
    let subscriber = TestSubscriber::<u64, BackpressureError>::new();
    flowable::range(0, 10).on_backpressure_buffer(4).subscribe_with(subscriber.clone());
    assert_eq!(subscriber.err(), Some(BackpressureError::BufferOverflow { capacity: 4 }));
    assert!(subscriber.values().is_empty());
  }

  #[test]
  fn buffer_with_evicts_into_the_callback() {
    let evicted = Arc::new(Mutex::new(vec![]));
    let e = evicted.clone();
    let subscriber = TestSubscriber::<u64, Infallible>::new();
    flowable::range(0, 6)
      .on_backpressure_buffer_with(2, move |v| e.lock().unwrap().push(v))
      .subscribe_with(subscriber.clone());
    subscriber.request(10);
    assert_eq!(subscriber.values(), vec![4, 5]);
    assert_eq!(*evicted.lock().unwrap(), vec![0, 1, 2, 3]);
  }

  #[test]
  fn drop_with_reports_excess() {
    let dropped = Arc::new(Mutex::new(vec![]));
    let d = dropped.clone();
    let subscriber = TestSubscriber::<u64, Infallible>::with_initial_request(2);
    flowable::range(0, 5)
      .on_backpressure_drop_with(move |v| d.lock().unwrap().push(v))
      .subscribe_with(subscriber.clone());
    assert_eq!(subscriber.values(), vec![0, 1]);
    assert_eq!(*dropped.lock().unwrap(), vec![2, 3, 4]);
    assert!(subscriber.is_completed());
  }

  #[test]
  fn drop_discards_silently() {
    let subscriber = TestSubscriber::<u64, Infallible>::new();
    flowable::range(0, 5).on_backpressure_drop().subscribe_with(subscriber.clone());
    subscriber.request(5);
    assert!(subscriber.values().is_empty());
    assert!(subscriber.is_completed());
  }

  #[test]
  fn latest_keeps_the_last_value() {
    let subscriber = TestSubscriber::<u64, Infallible>::new();
    flowable::range(0, 5).on_backpressure_latest().subscribe_with(subscriber.clone());
    subscriber.request(1);
    assert_eq!(subscriber.values(), vec![4]);
    assert!(subscriber.is_completed());
  }

  #[test]
  fn error_on_missing_demand() {
    let subscriber = TestSubscriber::<u64, BackpressureError>::with_initial_request(1);
    flowable::range(0, 5).on_backpressure_error().subscribe_with(subscriber.clone());
    assert_eq!(subscriber.values(), vec![0]);
    assert_eq!(subscriber.err(), Some(BackpressureError::MissingDemand));
  }

  #[test]
  fn policy_from_config() {
    let strategy: BackpressureStrategy = serde_json::from_str(r#""latest""#).unwrap();
    let subscriber = TestSubscriber::<u64, BackpressureError>::new();
    flowable::range(0, 3).on_backpressure(strategy).subscribe_with(subscriber.clone());
    subscriber.request(1);
    assert_eq!(subscriber.values(), vec![2]);
  }

  #[test]
  fn cancel_reaches_the_source() {
    let subscriber = TestSubscriber::<u64, Infallible>::with_initial_request(2);
    let subscription = flowable::from_iter(0..)
      .on_backpressure_drop()
      .take(2)
      .subscribe_with(subscriber.clone());
    assert_eq!(subscriber.values(), vec![0, 1]);
    assert!(subscriber.is_completed());
    assert!(subscription.is_cancelled());
  }
}
