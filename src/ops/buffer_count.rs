use crate::{
  observable::Observable, observer::Observer, subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Collects values into a `Vec` until `count` is reached, then emits the
/// buffer. A partial buffer is emitted when the source completes and
/// discarded when it errors.
#[derive(Clone)]
pub struct BufferCountOp<S> {
  pub source: S,
  pub count: usize,
}

impl<S: Observable> Observable for BufferCountOp<S> {
  type Item = Vec<S::Item>;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Vec<S::Item>, S::Err> + Send + 'static,
  {
    let count = self.count;
    self.source.actual_subscribe(subscriber.map(|observer| BufferCountObserver {
      observer,
      buffer: Vec::with_capacity(count),
      count,
    }))
  }
}

pub struct BufferCountObserver<O, Item> {
  observer: O,
  buffer: Vec<Item>,
  count: usize,
}

impl<O, Item, Err> Observer<Item, Err> for BufferCountObserver<O, Item>
where
  O: Observer<Vec<Item>, Err>,
{
  fn next(&mut self, value: Item) {
    self.buffer.push(value);
    if self.buffer.len() >= self.count {
      let full = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.count));
      self.observer.next(full);
    }
  }

  fn error(self, err: Err) { self.observer.error(err) }

  fn complete(mut self) {
    if !self.buffer.is_empty() {
      self.observer.next(std::mem::take(&mut self.buffer));
    }
    self.observer.complete();
  }

  fn is_closed(&self) -> bool { self.observer.is_closed() }
}
