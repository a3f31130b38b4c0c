//! Resubscription on error.
//!
//! A [`RetryPolicy`] decides, per error, whether another attempt is made and
//! how long to wait before it. `usize` is the simplest policy (retry at most
//! that many times, immediately); [`RetryConfig`] adds a delay, exponential
//! backoff and resetting the attempt counter after a successful value.
//!
//! ```
//! use std::sync::{
//!   atomic::{AtomicUsize, Ordering},
//!   Arc,
//! };
//!
//! use rxflow::prelude::*;
//!
//! let attempts = Arc::new(AtomicUsize::new(0));
//! let a = attempts.clone();
//! let source = observable::defer(move || {
//!   let attempt = a.fetch_add(1, Ordering::SeqCst);
//!   observable::create(move |mut emitter: Emitter<usize, &'static str>| {
//!     if attempt < 2 {
//!       emitter.error("flaky");
//!     } else {
//!       emitter.next(attempt);
//!       emitter.complete();
//!     }
//!   })
//! });
//!
//! let values = MutArc::own(vec![]);
//! let v = values.clone();
//! source.retry(3).subscribe_err(move |x| v.rc_deref_mut().push(x), |_| {});
//! assert_eq!(*values.rc_deref(), vec![2]);
//! ```

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tracing::debug;

use crate::{
  observable::Observable,
  observer::Observer,
  scheduler::Scheduler,
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike},
};

/// Decides whether an error is retried.
pub trait RetryPolicy<Err> {
  /// The delay before the next attempt, or `None` to give up and forward
  /// `err`. `attempt` counts the retries already made, starting at 0.
  fn should_retry(&self, err: &Err, attempt: usize) -> Option<Duration>;

  /// Reset the attempt counter whenever the source emits a value.
  fn reset_on_success(&self) -> bool { false }
}

impl<Err> RetryPolicy<Err> for usize {
  fn should_retry(&self, _err: &Err, attempt: usize) -> Option<Duration> {
    if attempt < *self {
      Some(Duration::ZERO)
    } else {
      None
    }
  }
}

/// Builder for a count, delay and backoff based retry policy.
///
/// ```
/// use std::time::Duration;
///
/// use rxflow::ops::retry::RetryConfig;
///
/// let config = RetryConfig::new()
///   .count(5)
///   .delay(Duration::from_millis(100))
///   .backoff(2.0)
///   .max_delay(Duration::from_secs(2))
///   .reset_on_success();
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
  count: Option<usize>,
  delay: Duration,
  backoff: f64,
  max_delay: Option<Duration>,
  reset_on_success: bool,
}

impl RetryConfig {
  /// Retry forever, immediately.
  pub fn new() -> Self {
    RetryConfig {
      count: None,
      delay: Duration::ZERO,
      backoff: 1.0,
      max_delay: None,
      reset_on_success: false,
    }
  }

  /// Allow at most `count` retries, `count + 1` attempts in total.
  pub fn count(mut self, count: usize) -> Self {
    self.count = Some(count);
    self
  }

  /// Wait `delay` before the first retry.
  pub fn delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  /// Multiply the delay by `factor` after every retry.
  pub fn backoff(mut self, factor: f64) -> Self {
    self.backoff = factor;
    self
  }

  /// Upper bound of the grown delay.
  pub fn max_delay(mut self, max_delay: Duration) -> Self {
    self.max_delay = Some(max_delay);
    self
  }

  pub fn reset_on_success(mut self) -> Self {
    self.reset_on_success = true;
    self
  }
}

impl Default for RetryConfig {
  fn default() -> Self { Self::new() }
}

impl<Err> RetryPolicy<Err> for RetryConfig {
  fn should_retry(&self, _err: &Err, attempt: usize) -> Option<Duration> {
    if self.count.map_or(false, |count| attempt >= count) {
      return None;
    }
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let nanos = self.delay.as_nanos() as f64 * self.backoff.max(0.0).powi(exponent);
    // saturating cast
    let delay = Duration::from_nanos(nanos.round() as u64);
    Some(self.max_delay.map_or(delay, |max| delay.min(max)))
  }

  fn reset_on_success(&self) -> bool { self.reset_on_success }
}

/// Resubscribe to `source` on error as long as `policy` allows.
///
/// Without a scheduler retries happen immediately and policy delays are
/// ignored.
#[derive(Clone)]
pub struct RetryOp<S, P, SD> {
  pub source: S,
  pub policy: P,
  pub scheduler: Option<SD>,
}

impl<S, P, SD> Observable for RetryOp<S, P, SD>
where
  S: Observable + Clone + Send + 'static,
  P: RetryPolicy<S::Err> + Send + 'static,
  SD: Scheduler + Clone + 'static,
{
  type Item = S::Item;
  type Err = S::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<S::Item, S::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let attempt = subscription.child();
    let observer = RetryObserver {
      source: self.source.clone(),
      policy: self.policy,
      scheduler: self.scheduler,
      downstream: subscriber,
      attempts: 0,
      current: attempt.clone(),
      retries: Arc::new(Mutex::new(Retries { running: false, parked: None })),
    };
    self.source.actual_subscribe(Subscriber::with_subscription(observer, attempt));
    subscription
  }
}

pub struct RetryObserver<S, P, SD, O> {
  source: S,
  policy: P,
  scheduler: Option<SD>,
  downstream: Subscriber<O>,
  attempts: usize,
  current: SharedSubscription,
  retries: Arc<Mutex<Retries<RetryObserver<S, P, SD, O>>>>,
}

/// Resubscriptions are run in a loop by whoever arrives first. A source that
/// fails while being subscribed parks its observer here instead of nesting
/// another subscribe call.
struct Retries<T> {
  running: bool,
  parked: Option<T>,
}

impl<S, P, SD, O> RetryObserver<S, P, SD, O>
where
  S: Observable + Clone + Send + 'static,
  P: RetryPolicy<S::Err> + Send + 'static,
  SD: Scheduler + Clone + 'static,
  O: Observer<S::Item, S::Err> + Send + 'static,
{
  fn resubscribe(self) {
    let retries = self.retries.clone();
    {
      let mut state = retries.lock();
      state.parked = Some(self);
      if state.running {
        return;
      }
      state.running = true;
    }
    loop {
      let next = {
        let mut state = retries.lock();
        match state.parked.take() {
          Some(next) => next,
          None => {
            state.running = false;
            return;
          }
        }
      };
      next.subscribe_attempt();
    }
  }

  fn subscribe_attempt(mut self) {
    if self.downstream.subscription.is_closed() {
      return;
    }
    let attempt = self.downstream.subscription.child();
    self.current = attempt.clone();
    self.source.clone().actual_subscribe(Subscriber::with_subscription(self, attempt));
  }
}

impl<S, P, SD, O> Observer<S::Item, S::Err> for RetryObserver<S, P, SD, O>
where
  S: Observable + Clone + Send + 'static,
  P: RetryPolicy<S::Err> + Send + 'static,
  SD: Scheduler + Clone + 'static,
  O: Observer<S::Item, S::Err> + Send + 'static,
{
  fn next(&mut self, value: S::Item) {
    if self.policy.reset_on_success() {
      self.attempts = 0;
    }
    self.downstream.next(value)
  }

  fn error(mut self, err: S::Err) {
    self.current.unsubscribe();
    let Some(delay) = self.policy.should_retry(&err, self.attempts) else {
      debug!(attempts = self.attempts, "retry policy gave up");
      self.downstream.error(err);
      return;
    };
    self.attempts += 1;
    debug!(attempt = self.attempts, ?delay, "retrying after error");
    match self.scheduler.clone() {
      Some(scheduler) => {
        let parent = self.downstream.subscription.clone();
        let handle = scheduler.schedule(Box::new(move || self.resubscribe()), Some(delay));
        parent.add(handle);
      }
      None => self.resubscribe(),
    }
  }

  fn complete(self) { self.downstream.complete() }

  fn is_closed(&self) -> bool { self.downstream.is_closed() }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{
      atomic::{AtomicUsize, Ordering},
      Arc,
    },
    time::Duration,
  };

  use super::*;
  use crate::{observer::ObserverAll, prelude::*, testing::TestObserver};

  fn failing_source(
    subscriptions: Arc<AtomicUsize>, fail_times: usize,
  ) -> impl Observable<Item = usize, Err = &'static str> + Clone + Send + 'static {
    observable::defer(move || {
      let n = subscriptions.fetch_add(1, Ordering::SeqCst);
      observable::create(move |mut emitter: Emitter<usize, &'static str>| {
        emitter.next(n);
        if n < fail_times {
          emitter.error("failed");
        } else {
          emitter.complete();
        }
      })
    })
  }

  #[test]
  fn count_policy() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let observer = TestObserver::new();
    failing_source(subscriptions.clone(), 10).retry(2).subscribe_with(observer.clone());
    assert_eq!(subscriptions.load(Ordering::SeqCst), 3);
    assert_eq!(observer.values(), vec![0, 1, 2]);
    assert_eq!(observer.err(), Some("failed"));
  }

  #[test]
  fn succeeds_within_budget() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let observer = TestObserver::new();
    failing_source(subscriptions.clone(), 1).retry(3).subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![0, 1]);
    assert!(observer.is_completed());
  }

  #[test]
  fn delayed_retries_on_scheduler() {
    let scheduler = VirtualTimeScheduler::new();
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let observer = TestObserver::new();
    let policy = RetryConfig::new().count(2).delay(Duration::from_millis(100)).backoff(2.0);
    failing_source(subscriptions.clone(), 10)
      .retry_on(policy, scheduler.clone())
      .subscribe_with(observer.clone());

    assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
    scheduler.advance_by(Duration::from_millis(100));
    assert_eq!(subscriptions.load(Ordering::SeqCst), 2);
    scheduler.advance_by(Duration::from_millis(199));
    assert_eq!(subscriptions.load(Ordering::SeqCst), 2);
    scheduler.advance_by(Duration::from_millis(1));
    assert_eq!(subscriptions.load(Ordering::SeqCst), 3);
    assert_eq!(observer.err(), Some("failed"));
  }

  #[test]
  fn unsubscribe_cancels_pending_retry() {
    let scheduler = VirtualTimeScheduler::new();
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let observer = TestObserver::new();
    let subscription = failing_source(subscriptions.clone(), 10)
      .retry_on(RetryConfig::new().delay(Duration::from_millis(10)), scheduler.clone())
      .subscribe_with(observer.clone());
    subscription.unsubscribe();
    scheduler.advance_by(Duration::from_millis(100));
    assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn config_delays() {
    let config = RetryConfig::new()
      .count(4)
      .delay(Duration::from_millis(10))
      .backoff(3.0)
      .max_delay(Duration::from_millis(50));
    let delays: Vec<_> = (0..5).map(|i| RetryPolicy::<()>::should_retry(&config, &(), i)).collect();
    assert_eq!(
      delays,
      vec![
        Some(Duration::from_millis(10)),
        Some(Duration::from_millis(30)),
        Some(Duration::from_millis(50)),
        Some(Duration::from_millis(50)),
        None,
      ]
    );
  }

  #[test]
  fn reset_on_success_allows_more_failures() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let observer = TestObserver::new();
    failing_source(subscriptions.clone(), 4)
      .retry(RetryConfig::new().count(1).reset_on_success())
      .subscribe_with(observer.clone());
    assert_eq!(observer.values(), vec![0, 1, 2, 3, 4]);
    assert!(observer.is_completed());
  }

  #[test]
  fn synchronous_failures_retry_without_nesting() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let observer = TestObserver::new();
    failing_source(subscriptions.clone(), 3_000)
      .retry(100_000usize)
      .subscribe_with(observer.clone());
    assert_eq!(subscriptions.load(Ordering::SeqCst), 3_001);
    assert_eq!(observer.values().len(), 3_001);
    assert!(observer.is_completed());
  }

  #[test]
  fn retries_stop_once_downstream_leaves() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let subscription = SharedSubscription::new();
    let handle = subscription.clone();
    let observer = ObserverAll::new(
      move |n: usize| {
        if n == 4 {
          handle.unsubscribe();
        }
      },
      |_: &str| {},
      || {},
    );
    failing_source(subscriptions.clone(), 100)
      .retry(1_000usize)
      .actual_subscribe(Subscriber::with_subscription(observer, subscription));
    assert_eq!(subscriptions.load(Ordering::SeqCst), 5);
  }
}
