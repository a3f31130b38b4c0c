//! Recording consumers for tests and doc examples.
//!
//! Both helpers are cheap handles: clone one into the pipeline and keep the
//! other to inspect what arrived.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  flowable::{DemandCounter, FlowSubscriber, FlowSubscription},
  observer::Observer,
};

struct Record<Item, Err> {
  values: Vec<Item>,
  error: Option<Err>,
  completed: bool,
}

impl<Item, Err> Default for Record<Item, Err> {
  fn default() -> Self { Record { values: vec![], error: None, completed: false } }
}

/// Records every emission of an observable.
pub struct TestObserver<Item, Err>(Arc<Mutex<Record<Item, Err>>>);

impl<Item, Err> Clone for TestObserver<Item, Err> {
  fn clone(&self) -> Self { TestObserver(self.0.clone()) }
}

impl<Item, Err> Default for TestObserver<Item, Err> {
  fn default() -> Self { TestObserver(Arc::new(Mutex::new(Record::default()))) }
}

impl<Item, Err> TestObserver<Item, Err> {
  pub fn new() -> Self { Self::default() }

  pub fn values(&self) -> Vec<Item>
  where
    Item: Clone,
  {
    self.0.lock().values.clone()
  }

  pub fn err(&self) -> Option<Err>
  where
    Err: Clone,
  {
    self.0.lock().error.clone()
  }

  pub fn is_completed(&self) -> bool { self.0.lock().completed }

  pub fn is_terminated(&self) -> bool {
    let record = self.0.lock();
    record.completed || record.error.is_some()
  }
}

impl<Item, Err> Observer<Item, Err> for TestObserver<Item, Err> {
  fn next(&mut self, value: Item) { self.0.lock().values.push(value) }

  fn error(self, err: Err) { self.0.lock().error = Some(err) }

  fn complete(self) { self.0.lock().completed = true }

  fn is_closed(&self) -> bool { false }
}

struct SubscriberState<Item, Err> {
  record: Mutex<Record<Item, Err>>,
  subscription: Mutex<Option<FlowSubscription>>,
  /// Demand granted and not yet used up.
  demand: DemandCounter,
  initial_request: u64,
  strict: bool,
}

/// Records every emission of a flowable and checks it never receives more
/// values than it requested.
///
/// # Panics
///
/// A strict subscriber (the default) panics with a `protocol violation`
/// when a value arrives without outstanding demand.
pub struct TestSubscriber<Item, Err>(Arc<SubscriberState<Item, Err>>);

impl<Item, Err> Clone for TestSubscriber<Item, Err> {
  fn clone(&self) -> Self { TestSubscriber(self.0.clone()) }
}

impl<Item, Err> TestSubscriber<Item, Err> {
  fn build(initial_request: u64, strict: bool) -> Self {
    TestSubscriber(Arc::new(SubscriberState {
      record: Mutex::new(Record::default()),
      subscription: Mutex::new(None),
      demand: DemandCounter::new(),
      initial_request,
      strict,
    }))
  }

  /// A subscriber that requests nothing until told to.
  pub fn new() -> Self { Self::build(0, true) }

  /// A subscriber requesting `n` values as soon as it is subscribed.
  pub fn with_initial_request(n: u64) -> Self { Self::build(n, true) }

  /// A subscriber accepting values without demand, for the `Missing`
  /// overflow policy.
  pub fn lenient() -> Self { Self::build(0, false) }

  pub fn request(&self, n: u64) {
    self.0.demand.add(n);
    let subscription = self.0.subscription.lock().clone();
    if let Some(subscription) = subscription {
      subscription.request(n);
    }
  }

  pub fn cancel(&self) {
    let subscription = self.0.subscription.lock().clone();
    if let Some(subscription) = subscription {
      subscription.cancel();
    }
  }

  /// Demand requested and not yet delivered.
  pub fn outstanding(&self) -> u64 { self.0.demand.get() }

  pub fn values(&self) -> Vec<Item>
  where
    Item: Clone,
  {
    self.0.record.lock().values.clone()
  }

  pub fn err(&self) -> Option<Err>
  where
    Err: Clone,
  {
    self.0.record.lock().error.clone()
  }

  pub fn is_completed(&self) -> bool { self.0.record.lock().completed }

  pub fn is_terminated(&self) -> bool {
    let record = self.0.record.lock();
    record.completed || record.error.is_some()
  }
}

impl<Item, Err> Default for TestSubscriber<Item, Err> {
  fn default() -> Self { Self::new() }
}

impl<Item, Err> Observer<Item, Err> for TestSubscriber<Item, Err> {
  fn next(&mut self, value: Item) {
    if self.0.strict {
      self.0.demand.produced(1);
    }
    self.0.record.lock().values.push(value)
  }

  fn error(self, err: Err) { self.0.record.lock().error = Some(err) }

  fn complete(self) { self.0.record.lock().completed = true }

  fn is_closed(&self) -> bool { false }
}

impl<Item, Err> FlowSubscriber<Item, Err> for TestSubscriber<Item, Err> {
  fn on_subscribe(&mut self, subscription: FlowSubscription) {
    *self.0.subscription.lock() = Some(subscription);
    if self.0.initial_request > 0 {
      self.request(self.0.initial_request);
    }
  }
}
