use super::{
  overflow::{OverflowCore, OverflowObserver},
  subscription::FlowSubscription,
  FlowSubscriber, Flowable,
};
use crate::{
  backpressure::{raise_with, OverflowPolicy},
  error::BackpressureError,
  observable::Observable,
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// A push source behind an overflow boundary. Built by
/// [`ObservableExt::to_flowable`](crate::observable::ObservableExt::to_flowable).
///
/// The observable is subscribed once the subscriber has received its
/// subscription; cancelling unsubscribes it.
pub struct ObservableToFlowable<S: Observable> {
  pub(crate) source: S,
  pub(crate) policy: OverflowPolicy<S::Item>,
}

impl<S: Observable + Clone> Clone for ObservableToFlowable<S> {
  fn clone(&self) -> Self {
    ObservableToFlowable { source: self.source.clone(), policy: self.policy.clone() }
  }
}

impl<S> Flowable for ObservableToFlowable<S>
where
  S: Observable,
  S::Err: From<BackpressureError>,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<Sub>(self, subscriber: Sub) -> FlowSubscription
  where
    Sub: FlowSubscriber<S::Item, S::Err> + Send + 'static,
  {
    let upstream = SharedSubscription::new();
    let core = OverflowCore::new(subscriber, self.policy, raise_with(), upstream.clone());
    let subscription = core.start();
    if subscription.is_cancelled() {
      upstream.unsubscribe();
    } else {
      self.source.actual_subscribe(Subscriber::with_subscription(OverflowObserver(core), upstream));
    }
    subscription
  }
}
