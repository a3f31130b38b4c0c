use crate::{
  flowable::{FlowControl, FlowSubscriber, FlowSubscription, Flowable},
  observer::Observer,
};

/// Group values into chunks of `count`. The last chunk may be shorter.
#[derive(Clone)]
pub struct BufferCountOp<S> {
  pub source: S,
  pub count: usize,
}

impl<S: Flowable> Flowable for BufferCountOp<S> {
  type Item = Vec<S::Item>;
  type Err = S::Err;

  fn actual_subscribe<Sub>(self, subscriber: Sub) -> FlowSubscription
  where
    Sub: FlowSubscriber<Vec<S::Item>, S::Err> + Send + 'static,
  {
    self.source.actual_subscribe(BufferCountSubscriber {
      subscriber,
      count: self.count,
      buffer: Vec::with_capacity(self.count),
    })
  }
}

pub struct BufferCountSubscriber<Sub, Item> {
  subscriber: Sub,
  count: usize,
  buffer: Vec<Item>,
}

impl<Item, Err, Sub> Observer<Item, Err> for BufferCountSubscriber<Sub, Item>
where
  Sub: Observer<Vec<Item>, Err>,
{
  fn next(&mut self, value: Item) {
    self.buffer.push(value);
    if self.buffer.len() >= self.count {
      let chunk = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.count));
      self.subscriber.next(chunk);
    }
  }

  fn error(self, err: Err) { self.subscriber.error(err) }

  fn complete(mut self) {
    if !self.buffer.is_empty() {
      self.subscriber.next(self.buffer);
    }
    self.subscriber.complete()
  }

  fn is_closed(&self) -> bool { self.subscriber.is_closed() }
}

impl<Item, Err, Sub> FlowSubscriber<Item, Err> for BufferCountSubscriber<Sub, Item>
where
  Sub: FlowSubscriber<Vec<Item>, Err>,
{
  fn on_subscribe(&mut self, subscription: FlowSubscription) {
    let scaled = ScaledRequests { upstream: subscription, factor: self.count as u64 };
    self.subscriber.on_subscribe(FlowSubscription::new(scaled))
  }
}

/// Multiplies every request by `factor`, saturating at unbounded.
struct ScaledRequests {
  upstream: FlowSubscription,
  factor: u64,
}

impl FlowControl for ScaledRequests {
  fn request(&self, n: u64) { self.upstream.request(n.saturating_mul(self.factor)) }

  fn cancel(&self) { self.upstream.cancel() }

  fn is_cancelled(&self) -> bool { self.upstream.is_cancelled() }
}
