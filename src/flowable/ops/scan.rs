use crate::{
  flowable::{FlowSubscriber, FlowSubscription, Flowable},
  observer::Observer,
};

/// Emit the running accumulation of every value.
#[derive(Clone)]
pub struct ScanOp<S, F, B> {
  pub source: S,
  pub func: F,
  pub initial: B,
}

impl<S, F, B> Flowable for ScanOp<S, F, B>
where
  S: Flowable,
  F: FnMut(B, S::Item) -> B + Send + 'static,
  B: Clone + Send + 'static,
{
  type Item = B;
  type Err = S::Err;

  fn actual_subscribe<Sub>(self, subscriber: Sub) -> FlowSubscription
  where
    Sub: FlowSubscriber<B, S::Err> + Send + 'static,
  {
    self.source.actual_subscribe(ScanSubscriber { subscriber, func: self.func, acc: self.initial })
  }
}

pub struct ScanSubscriber<Sub, F, B> {
  subscriber: Sub,
  func: F,
  acc: B,
}

impl<Item, Err, Sub, F, B> Observer<Item, Err> for ScanSubscriber<Sub, F, B>
where
  Sub: Observer<B, Err>,
  F: FnMut(B, Item) -> B,
  B: Clone,
{
  fn next(&mut self, value: Item) {
    self.acc = (self.func)(self.acc.clone(), value);
    self.subscriber.next(self.acc.clone())
  }

  fn error(self, err: Err) { self.subscriber.error(err) }

  fn complete(self) { self.subscriber.complete() }

  fn is_closed(&self) -> bool { self.subscriber.is_closed() }
}

impl<Item, Err, Sub, F, B> FlowSubscriber<Item, Err> for ScanSubscriber<Sub, F, B>
where
  Sub: FlowSubscriber<B, Err>,
  F: FnMut(B, Item) -> B,
  B: Clone,
{
  fn on_subscribe(&mut self, subscription: FlowSubscription) { self.subscriber.on_subscribe(subscription) }
}
