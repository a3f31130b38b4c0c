use std::{
  collections::VecDeque,
  pin::Pin,
  sync::Arc,
  task::{Context, Poll, Waker},
};

use futures::Stream;
use parking_lot::Mutex;

use crate::{
  flowable::{FlowSubscriber, FlowSubscription, Flowable},
  observer::Observer,
};

type Subscribe<Item, Err> = Box<dyn FnOnce(StreamSubscriber<Item, Err>) -> FlowSubscription + Send>;

struct StreamState<Item, Err> {
  queue: VecDeque<Result<Item, Err>>,
  done: bool,
  /// A value was requested and has not arrived yet.
  outstanding: bool,
  waker: Option<Waker>,
  subscription: Option<FlowSubscription>,
}

/// A flowable pulled as a [`Stream`] of `Result`s.
///
/// The flowable is subscribed on the first poll. Every poll that finds
/// nothing buffered requests one more value; dropping the stream cancels the
/// subscription.
pub struct FlowableStream<Item, Err> {
  subscribe: Option<Subscribe<Item, Err>>,
  state: Arc<Mutex<StreamState<Item, Err>>>,
}

impl<Item: Send + 'static, Err: Send + 'static> FlowableStream<Item, Err> {
  pub(crate) fn new<S>(source: S) -> Self
  where
    S: Flowable<Item = Item, Err = Err> + Send + 'static,
  {
    FlowableStream {
      subscribe: Some(Box::new(move |subscriber| source.actual_subscribe(subscriber))),
      state: Arc::new(Mutex::new(StreamState {
        queue: VecDeque::new(),
        done: false,
        outstanding: false,
        waker: None,
        subscription: None,
      })),
    }
  }
}

impl<Item, Err> Stream for FlowableStream<Item, Err> {
  type Item = Result<Item, Err>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.get_mut();
    if let Some(subscribe) = this.subscribe.take() {
      subscribe(StreamSubscriber { state: this.state.clone() });
    }
    loop {
      let subscription = {
        let mut state = this.state.lock();
        if let Some(item) = state.queue.pop_front() {
          return Poll::Ready(Some(item));
        }
        if state.done {
          return Poll::Ready(None);
        }
        state.waker = Some(cx.waker().clone());
        if state.outstanding {
          return Poll::Pending;
        }
        state.outstanding = true;
        state.subscription.clone()
      };
      match subscription {
        Some(subscription) => subscription.request(1),
        None => return Poll::Pending,
      }
    }
  }
}

impl<Item, Err> Drop for FlowableStream<Item, Err> {
  fn drop(&mut self) {
    let subscription = self.state.lock().subscription.take();
    if let Some(subscription) = subscription {
      subscription.cancel();
    }
  }
}

pub struct StreamSubscriber<Item, Err> {
  state: Arc<Mutex<StreamState<Item, Err>>>,
}

impl<Item, Err> StreamSubscriber<Item, Err> {
  fn push(&self, item: Option<Result<Item, Err>>) {
    let waker = {
      let mut state = self.state.lock();
      match item {
        Some(item) => {
          state.done |= item.is_err();
          state.queue.push_back(item);
        }
        None => state.done = true,
      }
      state.outstanding = false;
      state.waker.take()
    };
    if let Some(waker) = waker {
      waker.wake();
    }
  }
}

impl<Item, Err> Observer<Item, Err> for StreamSubscriber<Item, Err> {
  fn next(&mut self, value: Item) { self.push(Some(Ok(value))) }

  fn error(self, err: Err) { self.push(Some(Err(err))) }

  fn complete(self) { self.push(None) }

  fn is_closed(&self) -> bool { false }
}

impl<Item, Err> FlowSubscriber<Item, Err> for StreamSubscriber<Item, Err> {
  fn on_subscribe(&mut self, subscription: FlowSubscription) {
    self.state.lock().subscription = Some(subscription);
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use futures::{executor::block_on, StreamExt};

  use crate::prelude::*;

  #[test]
  fn collects_all_values() {
    let values: Vec<_> = block_on(flowable::range(0, 5).into_stream().collect());
    assert_eq!(values, (0..5).map(Ok::<u64, Infallible>).collect::<Vec<_>>());
  }

  #[test]
  fn pulls_one_value_per_poll() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let p = pulled.clone();
    let mut stream = flowable::from_iter::<_, Infallible>((0..).inspect(move |_| {
      p.fetch_add(1, Ordering::SeqCst);
    }))
    .into_stream();

    assert_eq!(block_on(stream.next()), Some(Ok(0)));
    assert_eq!(block_on(stream.next()), Some(Ok(1)));
    assert_eq!(pulled.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn error_ends_the_stream() {
    let values: Vec<_> = block_on(flowable::throw_err::<i32, _>("boom").into_stream().collect());
    assert_eq!(values, vec![Err("boom")]);
  }

  #[test]
  fn values_from_another_thread_wake_the_task() {
    let pool = ThreadPoolScheduler::new(SchedulerConfig::default().pool_size(1)).unwrap();
    let stream = flowable::range(0, 20).observe_on(pool).into_stream();
    let values: Vec<_> = block_on(stream.map(|v| v.unwrap_or_else(|e: Infallible| match e {})).collect());
    assert_eq!(values, (0..20).collect::<Vec<_>>());
  }
}
