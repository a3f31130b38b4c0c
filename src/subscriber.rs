use crate::{
  observer::Observer,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// An observer bound to the subscription of its activation.
///
/// Emissions arriving after the subscription closed are dropped, and a
/// terminal closes the subscription once it has been delivered, releasing
/// every teardown of the activation.
pub struct Subscriber<O> {
  pub observer: O,
  pub subscription: SharedSubscription,
}

impl<O> Subscriber<O> {
  pub fn new(observer: O) -> Self { Subscriber { observer, subscription: SharedSubscription::new() } }

  pub fn with_subscription(observer: O, subscription: SharedSubscription) -> Self {
    Subscriber { observer, subscription }
  }

  /// Keep the subscription, wrap the observer.
  pub fn map<P>(self, f: impl FnOnce(O) -> P) -> Subscriber<P> {
    Subscriber { observer: f(self.observer), subscription: self.subscription }
  }
}

impl<Item, Err, O> Observer<Item, Err> for Subscriber<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if !self.subscription.is_closed() {
      self.observer.next(value)
    }
  }

  fn error(self, err: Err) {
    if self.subscription.is_closed() {
      return;
    }
    self.observer.error(err);
    self.subscription.unsubscribe();
  }

  fn complete(self) {
    if self.subscription.is_closed() {
      return;
    }
    self.observer.complete();
    self.subscription.unsubscribe();
  }

  fn is_closed(&self) -> bool { self.subscription.is_closed() || self.observer.is_closed() }
}
