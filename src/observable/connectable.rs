//! Manual control over a shared activation.
//!
//! A [`ConnectableObservable`] sits between a cold source and the subjects
//! produced by its factory. Subscribing only attaches to the current subject;
//! the source runs once [`connect`](ConnectableObservable::connect) is called,
//! and every subscriber shares that one activation.
//!
//! ```
//! use rxflow::prelude::*;
//!
//! let published = observable::from_iter::<_, Infallible>(1..=3).publish();
//! let log = MutArc::own(vec![]);
//! let (a, b) = (log.clone(), log.clone());
//! published.clone().subscribe(move |v| a.rc_deref_mut().push(("a", v)));
//! published.clone().subscribe(move |v| b.rc_deref_mut().push(("b", v)));
//! assert!(log.rc_deref().is_empty());
//!
//! published.connect();
//! assert_eq!(log.rc_deref().len(), 6);
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::{
  observable::Observable,
  observer::Observer,
  ops::{auto_connect::AutoConnect, ref_count::RefCount},
  subject::Subject,
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};

type SubjectFactory<Item, Err> = Box<dyn Fn() -> Subject<Item, Err> + Send + Sync>;

struct State<Item, Err> {
  subject: Option<Subject<Item, Err>>,
  connection: Option<SharedSubscription>,
}

struct Inner<S: Observable> {
  source: S,
  factory: SubjectFactory<S::Item, S::Err>,
  state: Mutex<State<S::Item, S::Err>>,
}

/// A source whose single activation is started explicitly and multicast
/// through a subject. Clones share the connection.
pub struct ConnectableObservable<S: Observable>(Arc<Inner<S>>);

impl<S: Observable> Clone for ConnectableObservable<S> {
  fn clone(&self) -> Self { ConnectableObservable(self.0.clone()) }
}

impl<S> ConnectableObservable<S>
where
  S: Observable + Clone + Send + Sync + 'static,
  S::Item: Clone,
  S::Err: Clone,
{
  pub fn new<F>(source: S, factory: F) -> Self
  where
    F: Fn() -> Subject<S::Item, S::Err> + Send + Sync + 'static,
  {
    ConnectableObservable(Arc::new(Inner {
      source,
      factory: Box::new(factory),
      state: Mutex::new(State { subject: None, connection: None }),
    }))
  }

  /// Start the shared activation.
  ///
  /// While a connection is open this returns it unchanged. A new connection
  /// after the previous one terminated starts on a fresh subject.
  /// Unsubscribing the returned handle disconnects.
  pub fn connect(&self) -> SharedSubscription {
    let (subject, connection) = {
      let mut state = self.0.state.lock();
      if let Some(connection) = state.connection.as_ref().filter(|c| !c.is_closed()) {
        return connection.clone();
      }
      let subject = match state.subject.clone().filter(|s| !s.is_terminated()) {
        Some(subject) => subject,
        None => {
          let subject = (self.0.factory)();
          state.subject = Some(subject.clone());
          subject
        }
      };
      let connection = SharedSubscription::new();
      state.connection = Some(connection.clone());
      (subject, connection)
    };
    debug!("connectable observable connected");
    self
      .0
      .source
      .clone()
      .actual_subscribe(Subscriber::with_subscription(subject, connection.clone()));
    connection
  }

  /// Connect on the first subscriber and disconnect when the last one
  /// leaves. Subscribing again afterwards starts a fresh activation.
  pub fn ref_count(self) -> RefCount<S> { RefCount::new(self) }

  /// Connect once `count` subscribers attached. `0` connects immediately.
  /// The connection is never dropped automatically.
  pub fn auto_connect(self, count: usize) -> AutoConnect<S> { AutoConnect::new(self, count) }

  pub fn is_connected(&self) -> bool {
    self.0.state.lock().connection.as_ref().map_or(false, |c| !c.is_closed())
  }

  /// The subject new subscribers attach to, created on demand.
  pub(crate) fn subject(&self) -> Subject<S::Item, S::Err> {
    let mut state = self.0.state.lock();
    let connected_once = state.connection.is_some();
    match state.subject.clone().filter(|s| connected_once || !s.is_terminated()) {
      Some(subject) => subject,
      None => {
        let subject = (self.0.factory)();
        state.subject = Some(subject.clone());
        subject
      }
    }
  }

  /// Forget the subject and hand out the connection for unsubscribing.
  pub(crate) fn reset(&self) -> Option<SharedSubscription> {
    let mut state = self.0.state.lock();
    state.subject = None;
    state.connection.take()
  }
}

impl<S> Observable for ConnectableObservable<S>
where
  S: Observable + Clone + Send + Sync + 'static,
  S::Item: Clone,
  S::Err: Clone,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    self.subject().actual_subscribe(subscriber)
  }
}
