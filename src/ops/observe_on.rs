use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use crate::{
  observable::Observable,
  observer::{Emission, Observer, Serialized},
  scheduler::Scheduler,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Re-emit every emission on `scheduler`, preserving order.
///
/// Emissions are queued; one drain task at a time is scheduled to deliver
/// whatever is queued when it runs.
#[derive(Clone)]
pub struct ObserveOnOp<S, SD> {
  pub source: S,
  pub scheduler: SD,
}

impl<S, SD> Observable for ObserveOnOp<S, SD>
where
  S: Observable,
  SD: Scheduler + Clone + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let observer = ObserveOnObserver {
      queue: Serialized::new(subscriber),
      scheduled: Arc::new(AtomicBool::new(false)),
      scheduler: self.scheduler,
      subscription: subscription.clone(),
    };
    self.source.actual_subscribe(Subscriber::with_subscription(observer, subscription.child()));
    subscription
  }
}

pub struct ObserveOnObserver<O, Item, Err, SD> {
  queue: Serialized<Subscriber<O>, Item, Err>,
  scheduled: Arc<AtomicBool>,
  scheduler: SD,
  subscription: SharedSubscription,
}

impl<O, Item, Err, SD> ObserveOnObserver<O, Item, Err, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  SD: Scheduler,
{
  fn push(&self, emission: Emission<Item, Err>) {
    if !self.queue.enqueue(emission) || self.scheduled.swap(true, Ordering::AcqRel) {
      return;
    }
    let (queue, scheduled) = (self.queue.clone(), self.scheduled.clone());
    let handle = self.scheduler.schedule(
      Box::new(move || {
        scheduled.store(false, Ordering::Release);
        queue.drain();
      }),
      None,
    );
    self.subscription.add(handle);
  }
}

impl<O, Item, Err, SD> Observer<Item, Err> for ObserveOnObserver<O, Item, Err, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  SD: Scheduler,
{
  fn next(&mut self, value: Item) { self.push(Emission::Value(value)) }

  fn error(self, err: Err) { self.push(Emission::Error(err)) }

  fn complete(self) { self.push(Emission::Complete) }

  fn is_closed(&self) -> bool { self.queue.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
  };

  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn delivers_on_virtual_time_when_flushed() {
    let scheduler = VirtualTimeScheduler::new();
    let observer = TestObserver::<i32, Infallible>::new();
    observable::from_iter(0..3).observe_on(scheduler.clone()).subscribe_with(observer.clone());
    assert!(observer.values().is_empty());
    scheduler.flush();
    assert_eq!(observer.values(), vec![0, 1, 2]);
    assert!(observer.is_completed());
  }

  #[test]
  fn switches_thread_and_keeps_order() {
    let pool = ThreadPoolScheduler::new(SchedulerConfig::default().pool_size(2)).unwrap();
    let threads = Arc::new(Mutex::new(vec![]));
    let observer = TestObserver::<i32, Infallible>::new();
    let t = threads.clone();
    let caller = thread::current().id();
    observable::from_iter(0..100)
      .observe_on(pool)
      .tap(move |_| t.lock().unwrap().push(thread::current().id()))
      .subscribe_with(observer.clone());

    for _ in 0..200 {
      if observer.is_completed() {
        break;
      }
      thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(observer.values(), (0..100).collect::<Vec<_>>());
    assert!(threads.lock().unwrap().iter().all(|id| *id != caller));
  }

  #[test]
  fn unsubscribe_drops_queued_values() {
    let scheduler = VirtualTimeScheduler::new();
    let observer = TestObserver::<i32, Infallible>::new();
    let subscription =
      observable::from_iter(0..3).observe_on(scheduler.clone()).subscribe_with(observer.clone());
    subscription.unsubscribe();
    scheduler.flush();
    assert!(observer.values().is_empty());
  }
}
