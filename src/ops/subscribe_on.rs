use crate::{
  observable::Observable,
  observer::Observer,
  scheduler::Scheduler,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Perform the subscription to `source` as a task on `scheduler`.
///
/// Emissions stay on whatever context the source produces them on.
/// Unsubscribing before the task ran cancels it.
#[derive(Clone)]
pub struct SubscribeOnOp<S, SD> {
  pub source: S,
  pub scheduler: SD,
}

impl<S, SD> Observable for SubscribeOnOp<S, SD>
where
  S: Observable + Send + 'static,
  SD: Scheduler,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let source = self.source;
    let handle = self.scheduler.schedule(
      Box::new(move || {
        source.actual_subscribe(subscriber);
      }),
      None,
    );
    subscription.add(handle);
    subscription
  }
}
