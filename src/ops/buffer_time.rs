use std::time::Duration;

use crate::{
  observable::Observable,
  observer::{Emission, Observer, Serialized},
  rc::MutArc,
  scheduler::{schedule_repeating, Scheduler},
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Emits the values collected during every `period`. Periods without values
/// are skipped. On completion the pending values are flushed first.
#[derive(Clone)]
pub struct BufferTimeOp<S, SD> {
  pub source: S,
  pub period: Duration,
  pub scheduler: SD,
}

impl<S, SD> Observable for BufferTimeOp<S, SD>
where
  S: Observable,
  SD: Scheduler + Clone + 'static,
{
  type Item = Vec<S::Item>;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Vec<S::Item>, S::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let downstream = Serialized::new(subscriber);
    let buffer = MutArc::own(Vec::new());

    let (c_buffer, c_downstream) = (buffer.clone(), downstream.clone());
    let handle = schedule_repeating(&self.scheduler, self.period, move |_| {
      let mut buffer = c_buffer.rc_deref_mut();
      if !buffer.is_empty() {
        c_downstream.enqueue(Emission::Value(std::mem::take(&mut *buffer)));
      }
      drop(buffer);
      c_downstream.drain();
    });
    subscription.add(handle);

    let observer = BufferTimeObserver { downstream, buffer };
    self.source.actual_subscribe(Subscriber::with_subscription(observer, subscription.child()));
    subscription
  }
}

pub struct BufferTimeObserver<O, Item, Err> {
  downstream: Serialized<Subscriber<O>, Vec<Item>, Err>,
  buffer: MutArc<Vec<Item>>,
}

impl<O, Item, Err> Observer<Item, Err> for BufferTimeObserver<O, Item, Err>
where
  O: Observer<Vec<Item>, Err>,
{
  fn next(&mut self, value: Item) { self.buffer.rc_deref_mut().push(value) }

  fn error(self, err: Err) {
    self.buffer.rc_deref_mut().clear();
    self.downstream.emit(Emission::Error(err));
  }

  fn complete(self) {
    let mut buffer = self.buffer.rc_deref_mut();
    if !buffer.is_empty() {
      self.downstream.enqueue(Emission::Value(std::mem::take(&mut *buffer)));
    }
    self.downstream.enqueue(Emission::Complete);
    drop(buffer);
    self.downstream.drain();
  }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use crate::{prelude::*, testing::TestObserver};

  #[test]
  fn groups_by_period_and_skips_empty_periods() {
    let scheduler = VirtualTimeScheduler::new();
    let subject = Subject::<i32, Infallible>::publish();
    let observer = TestObserver::new();
    subject
      .clone()
      .buffer_time(Duration::from_millis(100), scheduler.clone())
      .subscribe_with(observer.clone());

    subject.try_next(1).unwrap();
    subject.try_next(2).unwrap();
    scheduler.advance_by(Duration::from_millis(100));
    scheduler.advance_by(Duration::from_millis(100));
    subject.try_next(3).unwrap();
    scheduler.advance_by(Duration::from_millis(100));
    assert_eq!(observer.values(), vec![vec![1, 2], vec![3]]);
  }

  #[test]
  fn completion_flushes_pending_values() {
    let scheduler = VirtualTimeScheduler::new();
    let subject = Subject::<i32, Infallible>::publish();
    let observer = TestObserver::new();
    subject
      .clone()
      .buffer_time(Duration::from_millis(100), scheduler.clone())
      .subscribe_with(observer.clone());

    subject.try_next(7).unwrap();
    subject.try_complete().unwrap();
    assert_eq!(observer.values(), vec![vec![7]]);
    assert!(observer.is_completed());
    assert!(scheduler.is_empty());
  }
}
