//! Serialized delivery into a single observer.
//!
//! Fan-in points (merge, zip, subjects, schedulers hopping threads) may emit
//! from several threads at once, or re-enter while a delivery is still on
//! the stack. `Serialized` queues every emission and lets exactly one caller
//! drain the queue into the observer; everybody else only enqueues and
//! returns. A delivery never overlaps another delivery and never deadlocks on
//! re-entrance.

use std::{
  collections::VecDeque,
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;

use super::{Emission, Observer};

struct Drain<Item, Err> {
  queue: VecDeque<Emission<Item, Err>>,
  draining: bool,
  /// A terminal has been enqueued; later emissions are dropped.
  terminated: bool,
}

struct Inner<O, Item, Err> {
  drain: Mutex<Drain<Item, Err>>,
  /// Only ever locked by the current drainer.
  observer: Mutex<Option<O>>,
  closed: AtomicBool,
}

/// A cloneable handle serializing emissions into one observer.
pub struct Serialized<O, Item, Err>(Arc<Inner<O, Item, Err>>);

impl<O, Item, Err> Clone for Serialized<O, Item, Err> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<O, Item, Err> Serialized<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  pub fn new(observer: O) -> Self {
    Self(Arc::new(Inner {
      drain: Mutex::new(Drain { queue: VecDeque::new(), draining: false, terminated: false }),
      observer: Mutex::new(Some(observer)),
      closed: AtomicBool::new(false),
    }))
  }

  /// Queue an emission without delivering it.
  ///
  /// Returns `false` if the emission was dropped because a terminal was
  /// already queued or the observer is gone.
  pub fn enqueue(&self, emission: Emission<Item, Err>) -> bool {
    if self.is_closed() {
      return false;
    }
    let mut drain = self.0.drain.lock();
    if drain.terminated {
      return false;
    }
    drain.terminated = emission.is_terminal();
    drain.queue.push_back(emission);
    true
  }

  /// Deliver queued emissions until the queue is empty, unless another caller
  /// is already doing so.
  pub fn drain(&self) {
    {
      let mut drain = self.0.drain.lock();
      if drain.draining {
        return;
      }
      drain.draining = true;
    }
    loop {
      let next = {
        let mut drain = self.0.drain.lock();
        match drain.queue.pop_front() {
          Some(emission) => emission,
          None => {
            drain.draining = false;
            break;
          }
        }
      };
      let mut observer = self.0.observer.lock();
      if self.0.closed.load(Ordering::Acquire) {
        observer.take();
        self.0.drain.lock().queue.clear();
        continue;
      }
      let terminal = next.is_terminal();
      if terminal {
        self.0.closed.store(true, Ordering::Release);
      }
      next.deliver(&mut *observer);
      if !terminal && observer.as_ref().map_or(true, |o| o.is_closed()) {
        self.0.closed.store(true, Ordering::Release);
      }
    }
    if self.is_closed() {
      if let Some(mut observer) = self.0.observer.try_lock() {
        observer.take();
      }
    }
  }

  /// Enqueue then drain.
  pub fn emit(&self, emission: Emission<Item, Err>) {
    if self.enqueue(emission) {
      self.drain();
    }
  }

  /// Returns `true` once a terminal was delivered, the observer closed
  /// itself, or the handle was disposed.
  pub fn is_closed(&self) -> bool { self.0.closed.load(Ordering::Acquire) }

  /// Drop the observer and everything still queued. Nothing is delivered
  /// after this returns, except an emission already on the drainer's stack.
  pub fn dispose(&self) {
    self.0.closed.store(true, Ordering::Release);
    {
      let mut drain = self.0.drain.lock();
      drain.terminated = true;
      drain.queue.clear();
    }
    // The drainer may hold the slot on this very stack; it drops the
    // observer itself once it sees the flag.
    if let Some(mut observer) = self.0.observer.try_lock() {
      observer.take();
    }
  }
}

impl<O, Item, Err> Observer<Item, Err> for Serialized<O, Item, Err>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) { self.emit(Emission::Value(value)) }

  fn error(self, err: Err) { self.emit(Emission::Error(err)) }

  fn complete(self) { self.emit(Emission::Complete) }

  fn is_closed(&self) -> bool { Serialized::is_closed(self) }
}
