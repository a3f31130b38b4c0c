use std::{collections::VecDeque, time::Duration};

use crate::{
  observable::Observable,
  observer::{Emission, Observer, Serialized},
  rc::MutArc,
  scheduler::Scheduler,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Shift values and the completion later by `delay`.
///
/// Every emission gets its own timer and the emissions wait in a FIFO
/// queue, so the relative spacing and the order are kept. An error skips the
/// queue, discards the values still waiting and is delivered at once.
#[derive(Clone)]
pub struct DelayOp<S, SD> {
  pub source: S,
  pub delay: Duration,
  pub scheduler: SD,
}

impl<S, SD> Observable for DelayOp<S, SD>
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
    let observer = DelayObserver {
      downstream: Serialized::new(subscriber),
      pending: MutArc::own(VecDeque::new()),
      delay: self.delay,
      scheduler: self.scheduler,
      subscription: subscription.clone(),
    };
    self.source.actual_subscribe(Subscriber::with_subscription(observer, subscription.child()));
    subscription
  }
}

pub struct DelayObserver<O, Item, Err, SD> {
  downstream: Serialized<Subscriber<O>, Item, Err>,
  pending: MutArc<VecDeque<Emission<Item, Err>>>,
  delay: Duration,
  scheduler: SD,
  subscription: SharedSubscription,
}

impl<O, Item, Err, SD> DelayObserver<O, Item, Err, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  SD: Scheduler,
{
  fn push_later(&self, emission: Emission<Item, Err>) {
    self.pending.rc_deref_mut().push_back(emission);
    let (pending, downstream) = (self.pending.clone(), self.downstream.clone());
    let handle = self.scheduler.schedule(
      Box::new(move || {
        {
          let mut pending = pending.rc_deref_mut();
          let Some(emission) = pending.pop_front() else { return };
          downstream.enqueue(emission);
        }
        downstream.drain();
      }),
      Some(self.delay),
    );
    self.subscription.add(handle);
  }
}

impl<O, Item, Err, SD> Observer<Item, Err> for DelayObserver<O, Item, Err, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  SD: Scheduler,
{
  fn next(&mut self, value: Item) { self.push_later(Emission::Value(value)) }

  fn error(self, err: Err) {
    self.pending.rc_deref_mut().clear();
    self.downstream.emit(Emission::Error(err));
  }

  fn complete(self) { self.push_later(Emission::Complete) }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn shifts_values_and_completion() {
    let scheduler = VirtualTimeScheduler::new();
    let observer = TestObserver::<i32, Infallible>::new();
    observable::from_iter(vec![1, 2])
      .delay(Duration::from_millis(50), scheduler.clone())
      .subscribe_with(observer.clone());

    scheduler.advance_by(Duration::from_millis(49));
    assert!(observer.values().is_empty());
    scheduler.advance_by(Duration::from_millis(1));
    assert_eq!(observer.values(), vec![1, 2]);
    assert!(observer.is_completed());
  }

  #[test]
  fn keeps_spacing() {
    let scheduler = VirtualTimeScheduler::new();
    let subject = Subject::<i32, Infallible>::publish();
    let observer = TestObserver::new();
    subject
      .clone()
      .delay(Duration::from_millis(100), scheduler.clone())
      .subscribe_with(observer.clone());

    subject.try_next(1).unwrap();
    scheduler.advance_by(Duration::from_millis(30));
    subject.try_next(2).unwrap();
    scheduler.advance_by(Duration::from_millis(70));
    assert_eq!(observer.values(), vec![1]);
    scheduler.advance_by(Duration::from_millis(30));
    assert_eq!(observer.values(), vec![1, 2]);
  }

  #[test]
  fn errors_are_not_delayed() {
    let scheduler = VirtualTimeScheduler::new();
    let subject = Subject::<i32, &'static str>::publish();
    let observer = TestObserver::new();
    subject
      .clone()
      .delay(Duration::from_millis(100), scheduler.clone())
      .subscribe_with(observer.clone());

    subject.try_next(1).unwrap();
    subject.try_error("boom").unwrap();
    assert_eq!(observer.err(), Some("boom"));
    scheduler.flush();
    assert!(observer.values().is_empty());
  }

  #[test]
  fn unsubscribe_cancels_pending() {
    let scheduler = VirtualTimeScheduler::new();
    let observer = TestObserver::<i32, Infallible>::new();
    let subscription = observable::of(1)
      .delay(Duration::from_millis(10), scheduler.clone())
      .subscribe_with(observer.clone());
    subscription.unsubscribe();
    assert!(scheduler.is_empty());
    scheduler.advance_by(Duration::from_millis(10));
    assert!(observer.values().is_empty());
  }
}
