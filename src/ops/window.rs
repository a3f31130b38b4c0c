//! Split a sequence into inner observables.
//!
//! Every window is a hot source backed by a publish subject. It is emitted
//! before its first value, so a consumer that subscribes to it while handling
//! the emission sees all of its values. Errors reach both the open window and
//! the outer sequence.

use std::time::Duration;

use crate::{
  observable::Observable,
  observer::{Emission, Observer, Serialized},
  rc::MutArc,
  scheduler::{schedule_repeating, Scheduler},
  subject::Subject,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// One window of a `window_count` or `window_time` sequence.
pub struct Window<Item, Err>(Subject<Item, Err>);

impl<Item, Err> Clone for Window<Item, Err> {
  fn clone(&self) -> Self { Window(self.0.clone()) }
}

impl<Item, Err> Observable for Window<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    self.0.actual_subscribe(subscriber)
  }
}

#[derive(Clone)]
pub struct WindowCountOp<S> {
  pub source: S,
  pub count: usize,
}

#[derive(Clone)]
pub struct WindowTimeOp<S, SD> {
  pub source: S,
  pub period: Duration,
  pub scheduler: SD,
}

impl<S> Observable for WindowCountOp<S>
where
  S: Observable,
  S::Item: Clone,
  S::Err: Clone,
{
  type Item = Window<S::Item, S::Err>;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Self::Item, S::Err> + Send + 'static,
  {
    let count = self.count;
    self.source.actual_subscribe(subscriber.map(|observer| WindowCountObserver {
      observer,
      count,
      current: None,
      filled: 0,
    }))
  }
}

pub struct WindowCountObserver<O, Item, Err> {
  observer: O,
  count: usize,
  current: Option<Subject<Item, Err>>,
  filled: usize,
}

impl<O, Item, Err> Observer<Item, Err> for WindowCountObserver<O, Item, Err>
where
  O: Observer<Window<Item, Err>, Err>,
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.current.is_none() {
      let window = Subject::publish();
      self.observer.next(Window(window.clone()));
      self.current = Some(window);
    }
    if let Some(window) = self.current.as_mut() {
      window.next(value);
    }
    self.filled += 1;
    if self.filled == self.count {
      self.filled = 0;
      if let Some(window) = self.current.take() {
        window.complete();
      }
    }
  }

  fn error(self, err: Err) {
    if let Some(window) = self.current {
      window.error(err.clone());
    }
    self.observer.error(err)
  }

  fn complete(self) {
    if let Some(window) = self.current {
      window.complete();
    }
    self.observer.complete()
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}

impl<S, SD> Observable for WindowTimeOp<S, SD>
where
  S: Observable,
  S::Item: Clone,
  S::Err: Clone,
  SD: Scheduler + Clone + 'static,
{
  type Item = Window<S::Item, S::Err>;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Self::Item, S::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let downstream = Serialized::new(subscriber);
    let first = Subject::publish();
    downstream.emit(Emission::Value(Window(first.clone())));
    let current = MutArc::own(Some(first));

    let (c_current, c_downstream) = (current.clone(), downstream.clone());
    let handle = schedule_repeating(&self.scheduler, self.period, move |_| {
      let closing = {
        let mut current = c_current.rc_deref_mut();
        let Some(closing) = current.take() else { return };
        let next = Subject::publish();
        c_downstream.enqueue(Emission::Value(Window(next.clone())));
        *current = Some(next);
        closing
      };
      closing.complete();
      c_downstream.drain();
    });
    subscription.add(handle);

    let observer = WindowTimeObserver { downstream, current };
    self.source.actual_subscribe(Subscriber::with_subscription(observer, subscription.child()));
    subscription
  }
}

pub struct WindowTimeObserver<O, Item, Err> {
  downstream: Serialized<Subscriber<O>, Window<Item, Err>, Err>,
  current: MutArc<Option<Subject<Item, Err>>>,
}

impl<O, Item, Err> Observer<Item, Err> for WindowTimeObserver<O, Item, Err>
where
  O: Observer<Window<Item, Err>, Err>,
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) {
    let window = self.current.rc_deref().clone();
    if let Some(mut window) = window {
      window.next(value);
    }
  }

  fn error(self, err: Err) {
    let window = self.current.rc_deref_mut().take();
    if let Some(window) = window {
      window.error(err.clone());
    }
    self.downstream.emit(Emission::Error(err));
  }

  fn complete(self) {
    let window = self.current.rc_deref_mut().take();
    if let Some(window) = window {
      window.complete();
    }
    self.downstream.emit(Emission::Complete);
  }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}
