use std::{
  collections::VecDeque,
  sync::Arc,
  time::{Duration, Instant},
};

use crate::scheduler::Scheduler;

/// Bounds of a replay subject's history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayConfig {
  pub max_size: Option<usize>,
  pub max_age: Option<Duration>,
}

impl ReplayConfig {
  /// Keep everything.
  pub fn unbounded() -> Self { Self::default() }

  /// Keep at most the last `max_size` values.
  pub fn with_max_size(mut self, max_size: usize) -> Self {
    self.max_size = Some(max_size);
    self
  }

  /// Drop values older than `max_age`, measured on the subject's scheduler.
  pub fn with_max_age(mut self, max_age: Duration) -> Self {
    self.max_age = Some(max_age);
    self
  }
}

/// What a subject keeps for subscribers arriving later.
pub(crate) enum Retention<Item> {
  Publish,
  Behavior(Option<Item>),
  Replay { history: VecDeque<(Instant, Item)>, config: ReplayConfig, clock: Arc<dyn Scheduler> },
  Async(Option<Item>),
}

impl<Item: Clone> Retention<Item> {
  /// Remember `value`. Returns `false` if live subscribers must not see it
  /// yet.
  pub fn record(&mut self, value: &Item) -> bool {
    match self {
      Retention::Publish => true,
      Retention::Behavior(last) => {
        *last = Some(value.clone());
        true
      }
      Retention::Replay { history, config, clock } => {
        let now = clock.now();
        history.push_back((now, value.clone()));
        if let Some(max) = config.max_size {
          while history.len() > max {
            history.pop_front();
          }
        }
        trim_age(history, config, now);
        true
      }
      Retention::Async(last) => {
        *last = Some(value.clone());
        false
      }
    }
  }

  /// Values a new subscriber receives before live ones. An async subject
  /// only hands out its value once `completed`.
  pub fn snapshot(&mut self, completed: bool) -> Vec<Item> {
    match self {
      Retention::Publish => vec![],
      Retention::Behavior(last) => last.iter().cloned().collect(),
      Retention::Replay { history, config, clock } => {
        trim_age(history, config, clock.now());
        history.iter().map(|(_, v)| v.clone()).collect()
      }
      Retention::Async(last) if completed => last.iter().cloned().collect(),
      Retention::Async(_) => vec![],
    }
  }

  /// The value to emit ahead of completion.
  pub fn on_complete(&self) -> Option<Item> {
    match self {
      Retention::Async(last) => last.clone(),
      _ => None,
    }
  }

  /// An errored async subject forgets its value.
  pub fn on_error(&mut self) {
    if let Retention::Async(last) = self {
      last.take();
    }
  }

  pub fn current(&self) -> Option<Item> {
    match self {
      Retention::Behavior(last) => last.clone(),
      _ => None,
    }
  }
}

fn trim_age<Item>(history: &mut VecDeque<(Instant, Item)>, config: &ReplayConfig, now: Instant) {
  if let Some(max_age) = config.max_age {
    while history.front().map_or(false, |(at, _)| now.saturating_duration_since(*at) > max_age) {
      history.pop_front();
    }
  }
}
