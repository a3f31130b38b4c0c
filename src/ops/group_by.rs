use std::{
  collections::{HashMap, VecDeque},
  hash::Hash,
  sync::Arc,
};

use parking_lot::Mutex;
use tracing::debug;

use crate::{
  observable::Observable,
  observer::Observer,
  subject::Subject,
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// The values of one key of a `group_by` sequence.
///
/// Values arriving before the group's first subscriber are held and
/// delivered to that subscriber on attach. The upstream stays subscribed
/// while the outer sequence or any group still has a subscriber, so
/// consumers can leave the outer sequence and keep their groups.
pub struct GroupedObservable<K, Item, Err> {
  pub key: K,
  group: Arc<Group<Item, Err>>,
}

impl<K: Clone, Item, Err> Clone for GroupedObservable<K, Item, Err> {
  fn clone(&self) -> Self { GroupedObservable { key: self.key.clone(), group: self.group.clone() } }
}

impl<K, Item, Err> GroupedObservable<K, Item, Err> {
  pub fn key(&self) -> &K { &self.key }
}

impl<K, Item, Err> Observable for GroupedObservable<K, Item, Err>
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
    self.group.attach(subscriber)
  }
}

/// Upstream subscription shared by the outer sequence and every group
/// subscriber. Unsubscribed when the last holder leaves.
struct Holders {
  count: Mutex<usize>,
  upstream: SharedSubscription,
}

impl Holders {
  fn acquire(self: &Arc<Self>, subscription: &SharedSubscription) {
    *self.count.lock() += 1;
    let this = self.clone();
    subscription.add_fn(move || this.release());
  }

  fn release(&self) {
    let last = {
      let mut count = self.count.lock();
      *count = count.saturating_sub(1);
      *count == 0
    };
    if last {
      debug!("group_by has no subscribers left, releasing upstream");
      self.upstream.unsubscribe();
    }
  }
}

struct GroupState<Item, Err> {
  /// Values waiting for the first subscriber, or pushed while that
  /// subscriber is still being caught up.
  held: VecDeque<Item>,
  terminal: Option<Result<(), Err>>,
  attached: bool,
  catching_up: bool,
}

struct Group<Item, Err> {
  subject: Subject<Item, Err>,
  state: Mutex<GroupState<Item, Err>>,
  holders: Arc<Holders>,
}

impl<Item, Err> Group<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn new(holders: Arc<Holders>) -> Self {
    Group {
      subject: Subject::publish(),
      state: Mutex::new(GroupState {
        held: VecDeque::new(),
        terminal: None,
        attached: false,
        catching_up: false,
      }),
      holders,
    }
  }

  fn push(&self, value: Item) {
    {
      let mut state = self.state.lock();
      if !state.attached || state.catching_up {
        state.held.push_back(value);
        return;
      }
    }
    let _ = self.subject.try_next(value);
  }

  fn finish(&self, terminal: Result<(), Err>) {
    {
      let mut state = self.state.lock();
      if !state.attached || state.catching_up {
        state.terminal = Some(terminal);
        return;
      }
    }
    self.terminate(terminal);
  }

  fn terminate(&self, terminal: Result<(), Err>) {
    let _ = match terminal {
      Ok(()) => self.subject.try_complete(),
      Err(err) => self.subject.try_error(err),
    };
  }

  fn attach<O>(&self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    let first = {
      let mut state = self.state.lock();
      let first = !state.attached;
      state.attached = true;
      state.catching_up |= first;
      first
    };
    let subscription = self.subject.clone().actual_subscribe(subscriber);
    if !subscription.is_closed() {
      self.holders.acquire(&subscription);
    }
    if first {
      self.catch_up();
    }
    subscription
  }

  /// Replay held values to the first subscriber, including values that
  /// arrive while doing so, then switch to direct delivery.
  fn catch_up(&self) {
    loop {
      let next = {
        let mut state = self.state.lock();
        match state.held.pop_front() {
          Some(value) => Ok(value),
          None => {
            state.catching_up = false;
            Err(state.terminal.take())
          }
        }
      };
      match next {
        Ok(value) => {
          let _ = self.subject.try_next(value);
        }
        Err(terminal) => {
          if let Some(terminal) = terminal {
            self.terminate(terminal);
          }
          return;
        }
      }
    }
  }
}

#[derive(Clone)]
pub struct GroupByOp<S, F> {
  pub source: S,
  pub key: F,
}

impl<S, F, K> Observable for GroupByOp<S, F>
where
  S: Observable,
  S::Item: Clone,
  S::Err: Clone,
  F: FnMut(&S::Item) -> K + Send + 'static,
  K: Hash + Eq + Clone + Send + Sync + 'static,
{
  type Item = GroupedObservable<K, S::Item, S::Err>;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Self::Item, S::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let upstream = SharedSubscription::new();
    let holders = Arc::new(Holders { count: Mutex::new(0), upstream: upstream.clone() });
    holders.acquire(&subscription);
    let observer =
      GroupByObserver { downstream: subscriber, key: self.key, groups: HashMap::new(), holders };
    self.source.actual_subscribe(Subscriber::with_subscription(observer, upstream));
    subscription
  }
}

pub struct GroupByObserver<O, F, K, Item, Err> {
  downstream: Subscriber<O>,
  key: F,
  groups: HashMap<K, Arc<Group<Item, Err>>>,
  holders: Arc<Holders>,
}

impl<O, F, K, Item, Err> Observer<Item, Err> for GroupByObserver<O, F, K, Item, Err>
where
  O: Observer<GroupedObservable<K, Item, Err>, Err>,
  F: FnMut(&Item) -> K,
  K: Hash + Eq + Clone,
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) {
    let key = (self.key)(&value);
    let group = match self.groups.get(&key) {
      Some(group) => group.clone(),
      None => {
        if self.downstream.subscription.is_closed() {
          return;
        }
        let group = Arc::new(Group::new(self.holders.clone()));
        self.groups.insert(key.clone(), group.clone());
        self.downstream.next(GroupedObservable { key, group: group.clone() });
        group
      }
    };
    group.push(value);
  }

  fn error(self, err: Err) {
    for group in self.groups.into_values() {
      group.finish(Err(err.clone()));
    }
    self.downstream.error(err)
  }

  fn complete(self) {
    for group in self.groups.into_values() {
      group.finish(Ok(()));
    }
    self.downstream.complete()
  }

  fn is_closed(&self) -> bool { false }
}
