use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use crate::{
  flowable::{FlowControl, FlowSubscriber, FlowSubscription, Flowable},
  observer::{Emission, Observer, Serialized},
  scheduler::Scheduler,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// Deliver on `scheduler`, preserving order. Requests go upstream unchanged,
/// so nothing queues beyond the subscriber's own demand.
#[derive(Clone)]
pub struct ObserveOnOp<S, SD> {
  pub source: S,
  pub scheduler: SD,
}

impl<S, SD> Flowable for ObserveOnOp<S, SD>
where
  S: Flowable,
  SD: Scheduler + Clone + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<Sub>(self, subscriber: Sub) -> FlowSubscription
  where
    Sub: FlowSubscriber<S::Item, S::Err> + Send + 'static,
  {
    self.source.actual_subscribe(ObserveOnSubscriber {
      pending: Some(subscriber),
      queue: None,
      scheduled: Arc::new(AtomicBool::new(false)),
      scheduler: self.scheduler,
      tasks: SharedSubscription::new(),
    })
  }
}

pub struct ObserveOnSubscriber<Sub, Item, Err, SD> {
  /// The subscriber until it received its subscription.
  pending: Option<Sub>,
  queue: Option<Serialized<Sub, Item, Err>>,
  scheduled: Arc<AtomicBool>,
  scheduler: SD,
  /// Scheduled drain tasks; cancelled together with the subscription.
  tasks: SharedSubscription,
}

impl<Sub, Item, Err, SD> ObserveOnSubscriber<Sub, Item, Err, SD>
where
  Sub: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  SD: Scheduler,
{
  fn push(&self, emission: Emission<Item, Err>) {
    let Some(queue) = &self.queue else { return };
    if !queue.enqueue(emission) || self.scheduled.swap(true, Ordering::AcqRel) {
      return;
    }
    let (queue, scheduled) = (queue.clone(), self.scheduled.clone());
    let handle = self.scheduler.schedule(
      Box::new(move || {
        scheduled.store(false, Ordering::Release);
        queue.drain();
      }),
      None,
    );
    self.tasks.add(handle);
  }
}

impl<Sub, Item, Err, SD> Observer<Item, Err> for ObserveOnSubscriber<Sub, Item, Err, SD>
where
  Sub: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  SD: Scheduler,
{
  fn next(&mut self, value: Item) { self.push(Emission::Value(value)) }

  fn error(self, err: Err) { self.push(Emission::Error(err)) }

  fn complete(self) { self.push(Emission::Complete) }

  fn is_closed(&self) -> bool { self.queue.as_ref().map_or(true, |queue| queue.is_closed()) }
}

impl<Sub, Item, Err, SD> FlowSubscriber<Item, Err> for ObserveOnSubscriber<Sub, Item, Err, SD>
where
  Sub: FlowSubscriber<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  SD: Scheduler,
{
  fn on_subscribe(&mut self, subscription: FlowSubscription) {
    let Some(mut subscriber) = self.pending.take() else { return };
    let control = CancelTasks { upstream: subscription, tasks: self.tasks.clone() };
    subscriber.on_subscribe(FlowSubscription::new(control));
    let queue = Serialized::new(subscriber);
    let disposed = queue.clone();
    self.tasks.add_fn(move || disposed.dispose());
    self.queue = Some(queue);
  }
}

/// Passes requests upstream; cancelling also drops what is queued for
/// delivery.
struct CancelTasks {
  upstream: FlowSubscription,
  tasks: SharedSubscription,
}

impl FlowControl for CancelTasks {
  fn request(&self, n: u64) { self.upstream.request(n) }

  fn cancel(&self) {
    self.upstream.cancel();
    self.tasks.unsubscribe();
  }

  fn is_cancelled(&self) -> bool { self.upstream.is_cancelled() }
}

#[cfg(test)]
mod tests {
  use std::{thread, time::Duration};

  use crate::{prelude::*, testing::TestSubscriber};

  #[test]
  fn delivers_requested_values_on_flush() {
    let scheduler = VirtualTimeScheduler::new();
    let subscriber = TestSubscriber::<u64, Infallible>::new();
    flowable::range(0, 10).observe_on(scheduler.clone()).subscribe_with(subscriber.clone());

    subscriber.request(3);
    assert!(subscriber.values().is_empty());
    scheduler.flush();
    assert_eq!(subscriber.values(), vec![0, 1, 2]);
    subscriber.request(7);
    scheduler.flush();
    assert_eq!(subscriber.values(), (0..10).collect::<Vec<_>>());
    assert!(subscriber.is_completed());
  }

  #[test]
  fn cancel_drops_queued_values() {
    let scheduler = VirtualTimeScheduler::new();
    let subscriber = TestSubscriber::<u64, Infallible>::new();
    flowable::range(0, 10).observe_on(scheduler.clone()).subscribe_with(subscriber.clone());
    subscriber.request(5);
    subscriber.cancel();
    scheduler.flush();
    assert!(subscriber.values().is_empty());
    assert!(!subscriber.is_completed());
  }

  #[test]
  fn crosses_to_the_pool() {
    let pool = ThreadPoolScheduler::new(SchedulerConfig::default().pool_size(1)).unwrap();
    let subscriber = TestSubscriber::<u64, Infallible>::with_initial_request(flowable::UNBOUNDED);
    flowable::range(0, 50).observe_on(pool).subscribe_with(subscriber.clone());
    for _ in 0..200 {
      if subscriber.is_completed() {
        break;
      }
      thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(subscriber.values(), (0..50).collect::<Vec<_>>());
  }
}
