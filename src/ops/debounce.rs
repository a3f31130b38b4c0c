use std::time::Duration;

use crate::{
  observable::Observable,
  observer::{Emission, Observer, Serialized},
  rc::MutArc,
  scheduler::{Scheduler, TaskHandle},
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// Emit a value once `quiet` passed without a newer one. Completion flushes
/// the pending value; an error drops it.
#[derive(Clone)]
pub struct DebounceOp<S, SD> {
  pub source: S,
  pub quiet: Duration,
  pub scheduler: SD,
}

impl<S, SD> Observable for DebounceOp<S, SD>
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
    let observer = DebounceObserver {
      downstream: Serialized::new(subscriber),
      trailing: MutArc::own(None),
      timer: None,
      quiet: self.quiet,
      scheduler: self.scheduler,
      subscription: subscription.clone(),
    };
    self.source.actual_subscribe(Subscriber::with_subscription(observer, subscription.child()));
    subscription
  }
}

pub struct DebounceObserver<O, Item, Err, SD> {
  downstream: Serialized<Subscriber<O>, Item, Err>,
  trailing: MutArc<Option<Item>>,
  timer: Option<TaskHandle>,
  quiet: Duration,
  scheduler: SD,
  subscription: SharedSubscription,
}

impl<O, Item, Err, SD> DebounceObserver<O, Item, Err, SD> {
  fn cancel_timer(&mut self) {
    if let Some(timer) = self.timer.take() {
      timer.unsubscribe();
    }
  }
}

impl<O, Item, Err, SD> Observer<Item, Err> for DebounceObserver<O, Item, Err, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  SD: Scheduler,
{
  fn next(&mut self, value: Item) {
    self.cancel_timer();
    *self.trailing.rc_deref_mut() = Some(value);
    let (trailing, downstream) = (self.trailing.clone(), self.downstream.clone());
    let timer = self.scheduler.schedule(
      Box::new(move || {
        {
          let Some(value) = trailing.rc_deref_mut().take() else { return };
          downstream.enqueue(Emission::Value(value));
        }
        downstream.drain();
      }),
      Some(self.quiet),
    );
    self.subscription.add(timer.clone());
    self.timer = Some(timer);
  }

  fn error(mut self, err: Err) {
    self.cancel_timer();
    self.trailing.rc_deref_mut().take();
    self.downstream.emit(Emission::Error(err));
  }

  fn complete(mut self) {
    self.cancel_timer();
    {
      let trailing = self.trailing.rc_deref_mut().take();
      if let Some(value) = trailing {
        self.downstream.enqueue(Emission::Value(value));
      }
    }
    self.downstream.emit(Emission::Complete);
  }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn emits_after_quiet_period() {
    let scheduler = VirtualTimeScheduler::new();
    let subject = Subject::<i32, Infallible>::publish();
    let observer = TestObserver::new();
    subject
      .clone()
      .debounce(Duration::from_millis(30), scheduler.clone())
      .subscribe_with(observer.clone());

    subject.try_next(1).unwrap();
    scheduler.advance_by(Duration::from_millis(20));
    subject.try_next(2).unwrap();
    scheduler.advance_by(Duration::from_millis(20));
    assert!(observer.values().is_empty());
    scheduler.advance_by(Duration::from_millis(10));
    assert_eq!(observer.values(), vec![2]);

    subject.try_next(3).unwrap();
    scheduler.advance_by(Duration::from_millis(30));
    assert_eq!(observer.values(), vec![2, 3]);
  }

  #[test]
  fn completion_flushes_trailing_value() {
    let scheduler = VirtualTimeScheduler::new();
    let observer = TestObserver::<i32, Infallible>::new();
    observable::from_iter(0..10)
      .debounce(Duration::from_millis(30), scheduler.clone())
      .subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![9]);
    assert!(observer.is_completed());
    assert!(scheduler.is_empty());
  }

  #[test]
  fn error_drops_trailing_value() {
    let scheduler = VirtualTimeScheduler::new();
    let subject = Subject::<i32, &'static str>::publish();
    let observer = TestObserver::new();
    subject
      .clone()
      .debounce(Duration::from_millis(30), scheduler.clone())
      .subscribe_with(observer.clone());
    subject.try_next(1).unwrap();
    subject.try_error("bad").unwrap();
    scheduler.flush();
    assert!(observer.values().is_empty());
    assert_eq!(observer.err(), Some("bad"));
  }
}
