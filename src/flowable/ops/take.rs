use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
  flowable::{FlowControl, FlowSubscriber, FlowSubscription, Flowable},
  observer::Observer,
};

/// Deliver at most `count` values, then cancel upstream and complete.
#[derive(Clone)]
pub struct TakeOp<S> {
  pub source: S,
  pub count: u64,
}

impl<S: Flowable> Flowable for TakeOp<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<Sub>(self, subscriber: Sub) -> FlowSubscription
  where
    Sub: FlowSubscriber<S::Item, S::Err> + Send + 'static,
  {
    self.source.actual_subscribe(TakeSubscriber {
      subscriber: Some(subscriber),
      remaining: self.count,
      upstream: None,
    })
  }
}

pub struct TakeSubscriber<Sub> {
  subscriber: Option<Sub>,
  remaining: u64,
  upstream: Option<FlowSubscription>,
}

impl<Sub> TakeSubscriber<Sub> {
  fn stop<Item, Err>(&mut self)
  where
    Sub: Observer<Item, Err>,
  {
    if let Some(upstream) = &self.upstream {
      upstream.cancel();
    }
    if let Some(subscriber) = self.subscriber.take() {
      subscriber.complete();
    }
  }
}

impl<Item, Err, Sub> Observer<Item, Err> for TakeSubscriber<Sub>
where
  Sub: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    let Some(subscriber) = self.subscriber.as_mut() else { return };
    if self.remaining == 0 {
      return;
    }
    self.remaining -= 1;
    subscriber.next(value);
    if self.remaining == 0 {
      self.stop::<Item, Err>();
    }
  }

  fn error(self, err: Err) {
    if let Some(subscriber) = self.subscriber {
      subscriber.error(err)
    }
  }

  fn complete(self) {
    if let Some(subscriber) = self.subscriber {
      subscriber.complete()
    }
  }

  fn is_closed(&self) -> bool { self.subscriber.as_ref().map_or(true, |s| s.is_closed()) }
}

impl<Item, Err, Sub> FlowSubscriber<Item, Err> for TakeSubscriber<Sub>
where
  Sub: FlowSubscriber<Item, Err>,
{
  fn on_subscribe(&mut self, subscription: FlowSubscription) {
    self.upstream = Some(subscription.clone());
    let capped = FlowSubscription::new(CappedRequests {
      upstream: subscription,
      grantable: AtomicU64::new(self.remaining),
    });
    if let Some(subscriber) = self.subscriber.as_mut() {
      subscriber.on_subscribe(capped);
    }
    if self.remaining == 0 {
      self.stop::<Item, Err>();
    }
  }
}

/// Forwards requests until `grantable` is used up.
struct CappedRequests {
  upstream: FlowSubscription,
  grantable: AtomicU64,
}

impl FlowControl for CappedRequests {
  fn request(&self, n: u64) {
    let previous = self
      .grantable
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| (left > 0).then(|| left.saturating_sub(n)));
    if let Ok(left) = previous {
      self.upstream.request(n.min(left));
    }
  }

  fn cancel(&self) { self.upstream.cancel() }

  fn is_cancelled(&self) -> bool { self.upstream.is_cancelled() }
}
