//! Multicast subjects.
//!
//! A [`Subject`] is both a sink ([`Observer`]) and a hot source
//! ([`Observable`]): every value pushed into it is delivered to all current
//! subscribers. Its retention discipline decides what late subscribers see:
//!
//! | Constructor | Late subscriber receives |
//! |---|---|
//! | [`Subject::publish`] | live values only |
//! | [`Subject::behavior`] | the latest value (or the seed), then live values |
//! | [`Subject::replay`] | the retained history, then live values |
//! | [`Subject::async_subject`] | the last value and completion, once completed |
//!
//! Pushing into a terminated subject is refused with
//! [`SubjectError::Terminated`]. Subscribers arriving after the terminal
//! receive the retained history (replay only) followed by the stored
//! terminal.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::warn;

use crate::{
  error::SubjectError,
  observable::Observable,
  observer::{BoxedObserver, Emission, Observer, Serialized},
  scheduler::Scheduler,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

mod retention;
mod subscribers;

pub use retention::ReplayConfig;
use retention::Retention;
use subscribers::{Slot, Subscribers};

#[derive(Clone)]
enum Terminal<Err> {
  Error(Err),
  Complete,
}

impl<Err> Terminal<Err> {
  fn emission<Item>(&self) -> Emission<Item, Err>
  where
    Err: Clone,
  {
    match self {
      Terminal::Error(e) => Emission::Error(e.clone()),
      Terminal::Complete => Emission::Complete,
    }
  }
}

struct State<Item, Err> {
  subscribers: Subscribers<Item, Err>,
  retention: Retention<Item>,
  terminal: Option<Terminal<Err>>,
}

/// A multicast sink and source. Clones share the same state.
pub struct Subject<Item, Err>(Arc<Mutex<State<Item, Err>>>);

impl<Item, Err> Clone for Subject<Item, Err> {
  fn clone(&self) -> Self { Subject(self.0.clone()) }
}

impl<Item, Err> Subject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn with_retention(retention: Retention<Item>) -> Self {
    Subject(Arc::new(Mutex::new(State {
      subscribers: Subscribers::default(),
      retention,
      terminal: None,
    })))
  }

  /// Subscribers only see values pushed after they subscribed.
  pub fn publish() -> Self { Self::with_retention(Retention::Publish) }

  /// Subscribers first see the latest value, `seed` until the first push.
  pub fn behavior(seed: Item) -> Self { Self::with_retention(Retention::Behavior(Some(seed))) }

  /// A behavior subject without a seed.
  pub fn behavior_empty() -> Self { Self::with_retention(Retention::Behavior(None)) }

  /// Subscribers first see the retained history. Age bounds are measured on
  /// `scheduler`'s clock.
  pub fn replay<SD>(config: ReplayConfig, scheduler: SD) -> Self
  where
    SD: Scheduler + 'static,
  {
    Self::with_retention(Retention::Replay {
      history: Default::default(),
      config,
      clock: Arc::new(scheduler),
    })
  }

  /// Emits only the last value, and only on completion.
  pub fn async_subject() -> Self { Self::with_retention(Retention::Async(None)) }

  /// Push a value to every subscriber.
  pub fn try_next(&self, value: Item) -> Result<(), SubjectError> {
    let pending = {
      let mut state = self.0.lock();
      if state.terminal.is_some() {
        return Err(SubjectError::Terminated);
      }
      if !state.retention.record(&value) {
        return Ok(());
      }
      state.subscribers.broadcast_value(value)
    };
    pending.iter().for_each(Serialized::drain);
    Ok(())
  }

  /// Terminate every subscriber with `err`.
  pub fn try_error(&self, err: Err) -> Result<(), SubjectError> {
    self.terminate(Terminal::Error(err))
  }

  /// Complete every subscriber.
  pub fn try_complete(&self) -> Result<(), SubjectError> { self.terminate(Terminal::Complete) }

  fn terminate(&self, terminal: Terminal<Err>) -> Result<(), SubjectError> {
    let pending = {
      let mut state = self.0.lock();
      if state.terminal.is_some() {
        return Err(SubjectError::Terminated);
      }
      let last = match &terminal {
        Terminal::Complete => state.retention.on_complete(),
        Terminal::Error(_) => {
          state.retention.on_error();
          None
        }
      };
      let pending = state.subscribers.broadcast_terminal(last, || terminal.emission());
      state.terminal = Some(terminal);
      pending
    };
    pending.iter().for_each(Serialized::drain);
    Ok(())
  }

  pub fn subscriber_count(&self) -> usize { self.0.lock().subscribers.len() }

  pub fn is_terminated(&self) -> bool { self.0.lock().terminal.is_some() }

  /// The current value of a behavior subject.
  pub fn value(&self) -> Option<Item> { self.0.lock().retention.current() }

  fn remove(state: &Weak<Mutex<State<Item, Err>>>, id: u64) {
    let Some(state) = state.upgrade() else { return };
    let removed = state.lock().subscribers.remove(id);
    if let Some(slot) = removed {
      slot.dispose();
    }
  }
}

impl<Item, Err> Observer<Item, Err> for Subject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) {
    if self.try_next(value).is_err() {
      warn!("value pushed into a terminated subject was dropped");
    }
  }

  fn error(self, err: Err) {
    if self.try_error(err).is_err() {
      warn!("error pushed into a terminated subject was dropped");
    }
  }

  fn complete(self) {
    if self.try_complete().is_err() {
      warn!("completion pushed into a terminated subject was dropped");
    }
  }

  fn is_closed(&self) -> bool { self.is_terminated() }
}

impl<Item, Err> Observable for Subject<Item, Err>
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
    let subscription = subscriber.subscription.clone();
    let boxed: BoxedObserver<Item, Err> = Box::new(subscriber);
    let slot: Slot<Item, Err> = Serialized::new(boxed);

    let id = {
      let mut guard = self.0.lock();
      let state = &mut *guard;
      let completed = matches!(state.terminal, Some(Terminal::Complete));
      let replayed = match state.retention {
        Retention::Behavior(_) if state.terminal.is_some() => vec![],
        _ => state.retention.snapshot(completed),
      };
      replayed.into_iter().for_each(|v| {
        slot.enqueue(Emission::Value(v));
      });
      match &state.terminal {
        Some(terminal) => {
          slot.enqueue(terminal.emission());
          None
        }
        None => Some(state.subscribers.add(slot.clone())),
      }
    };

    if let Some(id) = id {
      let state = Arc::downgrade(&self.0);
      subscription.add_fn(move || Self::remove(&state, id));
    }
    slot.drain();
    subscription
  }
}
