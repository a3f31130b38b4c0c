use crate::{
  flowable::{FlowSubscriber, FlowSubscription, Flowable},
  observer::Observer,
};

/// Transform every value. Requests pass through unchanged.
#[derive(Clone)]
pub struct MapOp<S, F> {
  pub source: S,
  pub func: F,
}

impl<S, F, B> Flowable for MapOp<S, F>
where
  S: Flowable,
  F: FnMut(S::Item) -> B + Send + 'static,
  B: Send + 'static,
{
  type Item = B;
  type Err = S::Err;

  fn actual_subscribe<Sub>(self, subscriber: Sub) -> FlowSubscription
  where
    Sub: FlowSubscriber<B, S::Err> + Send + 'static,
  {
    self.source.actual_subscribe(MapSubscriber { subscriber, func: self.func })
  }
}

pub struct MapSubscriber<Sub, F> {
  subscriber: Sub,
  func: F,
}

impl<Item, Err, Sub, F, B> Observer<Item, Err> for MapSubscriber<Sub, F>
where
  Sub: Observer<B, Err>,
  F: FnMut(Item) -> B,
{
  fn next(&mut self, value: Item) { self.subscriber.next((self.func)(value)) }

  fn error(self, err: Err) { self.subscriber.error(err) }

  fn complete(self) { self.subscriber.complete() }

  fn is_closed(&self) -> bool { self.subscriber.is_closed() }
}

impl<Item, Err, Sub, F, B> FlowSubscriber<Item, Err> for MapSubscriber<Sub, F>
where
  Sub: FlowSubscriber<B, Err>,
  F: FnMut(Item) -> B,
{
  fn on_subscribe(&mut self, subscription: FlowSubscription) { self.subscriber.on_subscribe(subscription) }
}
