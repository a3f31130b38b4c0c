use std::{marker::PhantomData, time::Duration};

use crate::{
  observable::Observable,
  observer::Observer,
  rc::MutArc,
  scheduler::{schedule_repeating, Scheduler},
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// Emit `0, 1, 2, ...` every `period` on `scheduler`, first after one
/// period. Never completes.
pub fn interval<SD, Err>(period: Duration, scheduler: SD) -> ObservableInterval<SD, Err>
where
  SD: Scheduler + Clone + 'static,
{
  ObservableInterval { period, scheduler, _err: PhantomData }
}

/// Emit `()` once after `delay` on `scheduler`, then complete.
pub fn timer<SD, Err>(delay: Duration, scheduler: SD) -> ObservableTimer<SD, Err>
where
  SD: Scheduler + Clone + 'static,
{
  ObservableTimer { delay, scheduler, _err: PhantomData }
}

#[derive(Clone)]
pub struct ObservableInterval<SD, Err> {
  period: Duration,
  scheduler: SD,
  _err: PhantomData<fn() -> Err>,
}

#[derive(Clone)]
pub struct ObservableTimer<SD, Err> {
  delay: Duration,
  scheduler: SD,
  _err: PhantomData<fn() -> Err>,
}

impl<SD, Err> Observable for ObservableInterval<SD, Err>
where
  SD: Scheduler + Clone + 'static,
  Err: Send + 'static,
{
  type Item = usize;
  type Err = Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<usize, Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let observer = MutArc::own(subscriber);
    let handle = schedule_repeating(&self.scheduler, self.period, move |tick| {
      observer.rc_deref_mut().next(tick)
    });
    subscription.add(handle);
    subscription
  }
}

impl<SD, Err> Observable for ObservableTimer<SD, Err>
where
  SD: Scheduler + Clone + 'static,
  Err: Send + 'static,
{
  type Item = ();
  type Err = Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<(), Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let mut subscriber = subscriber;
    let handle = self.scheduler.schedule(
      Box::new(move || {
        if !subscriber.subscription.is_closed() {
          subscriber.next(());
          subscriber.complete();
        }
      }),
      Some(self.delay),
    );
    subscription.add(handle);
    subscription
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn interval_ticks_until_unsubscribed() {
    let scheduler = VirtualTimeScheduler::new();
    let observer = TestObserver::<usize, Infallible>::new();
    let subscription =
      observable::interval(Duration::from_millis(10), scheduler.clone()).subscribe_with(observer.clone());

    scheduler.advance_by(Duration::from_millis(45));
    assert_eq!(observer.values(), vec![0, 1, 2, 3]);

    subscription.unsubscribe();
    scheduler.advance_by(Duration::from_millis(100));
    assert_eq!(observer.values(), vec![0, 1, 2, 3]);
    assert!(scheduler.is_empty());
  }

  #[test]
  fn timer_fires_once() {
    let scheduler = VirtualTimeScheduler::new();
    let observer = TestObserver::<(), Infallible>::new();
    observable::timer(Duration::from_secs(1), scheduler.clone()).subscribe_with(observer.clone());
    scheduler.advance_by(Duration::from_millis(999));
    assert!(observer.values().is_empty());
    scheduler.advance_by(Duration::from_millis(1));
    assert_eq!(observer.values(), vec![()]);
    assert!(observer.is_completed());
  }
}
