use crate::{
  flowable::{FlowSubscriber, FlowSubscription, Flowable, UNBOUNDED},
  observable::Observable,
  observer::Observer,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// A flowable consumed with unbounded demand, as a push source.
#[derive(Clone)]
pub struct FlowableToObservable<S> {
  pub source: S,
}

impl<S: Flowable> Observable for FlowableToObservable<S> {
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    self.source.actual_subscribe(RequestUnbounded(subscriber));
    subscription
  }
}

pub struct RequestUnbounded<O>(Subscriber<O>);

impl<Item, Err, O: Observer<Item, Err>> Observer<Item, Err> for RequestUnbounded<O> {
  fn next(&mut self, value: Item) { self.0.next(value) }

  fn error(self, err: Err) { self.0.error(err) }

  fn complete(self) { self.0.complete() }

  fn is_closed(&self) -> bool { self.0.is_closed() }
}

impl<Item, Err, O: Observer<Item, Err>> FlowSubscriber<Item, Err> for RequestUnbounded<O> {
  fn on_subscribe(&mut self, subscription: FlowSubscription) {
    self.0.subscription.add(subscription.clone());
    subscription.request(UNBOUNDED);
  }
}
