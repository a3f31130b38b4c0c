use std::{
  iter::Peekable,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;

use crate::{
  flowable::{
    subscription::{DemandCounter, WorkInProgress},
    FlowControl, FlowSubscriber, FlowSubscription, Flowable,
  },
  observer::{Emission, Observer},
};

/// Expand each upstream value into the items of an iterator.
///
/// One upstream value is requested at a time, and only once the previous
/// iterator is exhausted and the subscriber has demand left. Upstream errors
/// are delivered right away; completion waits for the current iterator.
#[derive(Clone)]
pub struct FlatMapIterOp<S, F> {
  pub source: S,
  pub func: F,
}

impl<S, F, I> Flowable for FlatMapIterOp<S, F>
where
  S: Flowable,
  F: FnMut(S::Item) -> I + Send + 'static,
  I: IntoIterator,
  I::IntoIter: Send + 'static,
  I::Item: Send + 'static,
{
  type Item = I::Item;
  type Err = S::Err;

  fn actual_subscribe<Sub>(self, subscriber: Sub) -> FlowSubscription
  where
    Sub: FlowSubscriber<I::Item, S::Err> + Send + 'static,
  {
    let core = Arc::new(ExpandCore {
      subscriber: Mutex::new(Some(subscriber)),
      state: Mutex::new(ExpandState { current: None, awaiting: false, done: None }),
      upstream: Mutex::new(None),
      demand: DemandCounter::new(),
      wip: WorkInProgress::default(),
      cancelled: AtomicBool::new(false),
    });
    let subscription = FlowSubscription::from_arc(core.clone());
    self.source.actual_subscribe(FlatMapIterSubscriber { core, func: self.func });
    subscription
  }
}

struct ExpandState<It: Iterator, Err> {
  current: Option<Peekable<It>>,
  /// An upstream value was requested and has not arrived yet.
  awaiting: bool,
  done: Option<Emission<It::Item, Err>>,
}

struct ExpandCore<It: Iterator, Err, Sub> {
  subscriber: Mutex<Option<Sub>>,
  state: Mutex<ExpandState<It, Err>>,
  upstream: Mutex<Option<FlowSubscription>>,
  demand: DemandCounter,
  wip: WorkInProgress,
  cancelled: AtomicBool,
}

impl<It, Err, Sub> ExpandCore<It, Err, Sub>
where
  It: Iterator,
  Sub: FlowSubscriber<It::Item, Err>,
{
  fn drain(&self) {
    if self.wip.enter() {
      self.drain_loop();
    }
  }

  fn drain_loop(&self) {
    let mut missed = 1;
    loop {
      self.drain_pass();
      if !self.wip.leave(&mut missed) {
        break;
      }
    }
  }

  fn upstream(&self) -> Option<FlowSubscription> { self.upstream.lock().clone() }

  fn drain_pass(&self) {
    let mut slot = self.subscriber.lock();
    loop {
      if slot.is_none() {
        return;
      }
      if self.cancelled.load(Ordering::Acquire) {
        slot.take();
        self.state.lock().current.take();
        return;
      }
      let mut state = self.state.lock();
      if matches!(state.done, Some(Emission::Error(_))) {
        state.current.take();
        let terminal = state.done.take();
        drop(state);
        if let Some(terminal) = terminal {
          terminal.deliver(&mut *slot);
        }
        return;
      }
      if let Some(current) = state.current.as_mut() {
        if current.peek().is_none() {
          state.current = None;
          continue;
        }
        if !self.demand.try_claim() {
          return;
        }
        let value = current.next();
        drop(state);
        if let Some(value) = value {
          Emission::<It::Item, Err>::Value(value).deliver(&mut *slot);
        }
        continue;
      }
      if let Some(terminal) = state.done.take() {
        drop(state);
        terminal.deliver(&mut *slot);
        return;
      }
      if state.awaiting || self.demand.get() == 0 {
        return;
      }
      state.awaiting = true;
      drop(state);
      if let Some(upstream) = self.upstream() {
        upstream.request(1);
      }
    }
  }
}

impl<It, Err, Sub> FlowControl for ExpandCore<It, Err, Sub>
where
  It: Iterator + Send,
  It::Item: Send,
  Err: Send,
  Sub: FlowSubscriber<It::Item, Err> + Send,
{
  fn request(&self, n: u64) {
    self.demand.add(n);
    self.drain();
  }

  fn cancel(&self) {
    if self.cancelled.swap(true, Ordering::AcqRel) {
      return;
    }
    if let Some(upstream) = self.upstream() {
      upstream.cancel();
    }
    self.drain();
  }

  fn is_cancelled(&self) -> bool { self.cancelled.load(Ordering::Acquire) }
}

pub struct FlatMapIterSubscriber<It: Iterator, Err, Sub, F> {
  core: Arc<ExpandCore<It, Err, Sub>>,
  func: F,
}

impl<Item, Err, It, Sub, F, I> Observer<Item, Err> for FlatMapIterSubscriber<It, Err, Sub, F>
where
  F: FnMut(Item) -> I,
  I: IntoIterator<IntoIter = It>,
  It: Iterator,
  Sub: FlowSubscriber<It::Item, Err>,
{
  fn next(&mut self, value: Item) {
    let expanded = (self.func)(value).into_iter().peekable();
    {
      let mut state = self.core.state.lock();
      state.awaiting = false;
      state.current = Some(expanded);
    }
    self.core.drain();
  }

  fn error(self, err: Err) {
    self.core.state.lock().done = Some(Emission::Error(err));
    self.core.drain();
  }

  fn complete(self) {
    self.core.state.lock().done = Some(Emission::Complete);
    self.core.drain();
  }

  fn is_closed(&self) -> bool { self.core.cancelled.load(Ordering::Acquire) }
}

impl<Item, Err, It, Sub, F, I> FlowSubscriber<Item, Err> for FlatMapIterSubscriber<It, Err, Sub, F>
where
  F: FnMut(Item) -> I,
  I: IntoIterator<IntoIter = It>,
  It: Iterator + Send + 'static,
  It::Item: Send + 'static,
  Err: Send + 'static,
  Sub: FlowSubscriber<It::Item, Err> + Send + 'static,
{
  fn on_subscribe(&mut self, subscription: FlowSubscription) {
    *self.core.upstream.lock() = Some(subscription);
    let downstream = FlowSubscription::from_arc(self.core.clone());
    let entered = self.core.wip.enter();
    if let Some(subscriber) = self.core.subscriber.lock().as_mut() {
      subscriber.on_subscribe(downstream);
    }
    if entered {
      self.core.drain_loop();
    }
  }
}
