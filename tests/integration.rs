//! Integration tests for rxflow
//!
//! Operator chains, subjects, connectable control and threading behavior,
//! exercised through the public API only.

use std::{
  sync::{Arc, Mutex},
  thread,
  time::Duration,
};

use rxflow::{
  observer::ObserverAll,
  prelude::*,
  testing::{TestObserver, TestSubscriber},
};
use tracing_subscriber::EnvFilter;

fn init_logging() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

fn wait_until(done: impl Fn() -> bool) {
  for _ in 0..400 {
    if done() {
      return;
    }
    thread::sleep(Duration::from_millis(5));
  }
}

#[test]
fn basic_chain() {
  let observer = TestObserver::<i32, Infallible>::new();
  observable::from_iter(1..=10)
    .map(|x| x * 2)
    .filter(|&x| x > 10)
    .take(3)
    .subscribe_with(observer.clone());
  assert_eq!(observer.values(), vec![12, 14, 16]);
  assert!(observer.is_completed());
}

#[test]
fn chain_with_accumulation() {
  let observer = TestObserver::<i32, Infallible>::new();
  observable::from_iter(1..=20)
    .filter(|&x| x % 2 == 0)
    .map(|x| x * x)
    .scan(0, |acc, v| acc + v)
    .take_while(|&x| x < 100)
    .skip(2)
    .subscribe_with(observer.clone());
  // running sums of even squares: 4, 20, 56, 120, ...
  assert_eq!(observer.values(), vec![56]);
}

#[test]
fn zip_stops_at_the_shortest_input() {
  let observer = TestObserver::<(i32, &str), Infallible>::new();
  observable::from_iter(vec![1, 2, 3])
    .zip(observable::from_iter(vec!["x", "y"]))
    .subscribe_with(observer.clone());
  assert_eq!(observer.values(), vec![(1, "x"), (2, "y")]);
  assert!(observer.is_completed());
}

#[test]
fn combine_latest_after_both_emitted() {
  let a = Subject::<i32, Infallible>::publish();
  let b = Subject::<&'static str, Infallible>::publish();
  let observer = TestObserver::<String, Infallible>::new();
  a.clone()
    .combine_latest(b.clone(), |n, s| format!("{n}{s}"))
    .subscribe_with(observer.clone());

  a.try_next(1).unwrap();
  a.try_next(2).unwrap();
  b.try_next("a").unwrap();
  a.try_next(3).unwrap();
  b.try_next("b").unwrap();
  assert_eq!(observer.values(), vec!["2a", "3a", "3b"]);
}

#[test]
fn subject_broadcasting() {
  let subject = Subject::<i32, Infallible>::publish();
  let mapped = TestObserver::<i32, Infallible>::new();
  let direct = TestObserver::<i32, Infallible>::new();
  subject.clone().map(|x| x * 10).filter(|&x| x > 50).subscribe_with(mapped.clone());
  subject.clone().subscribe_with(direct.clone());

  for v in 1..=8 {
    subject.try_next(v).unwrap();
  }
  subject.try_complete().unwrap();

  assert_eq!(mapped.values(), vec![60, 70, 80]);
  assert_eq!(direct.values(), (1..=8).collect::<Vec<_>>());
  assert!(mapped.is_completed() && direct.is_completed());
  assert_eq!(subject.try_next(9), Err(SubjectError::Terminated));
}

#[test]
fn behavior_late_subscriber_sees_latest_first() {
  let subject = Subject::<i32, Infallible>::behavior(0);
  subject.try_next(1).unwrap();
  subject.try_next(2).unwrap();

  let late = TestObserver::new();
  subject.clone().subscribe_with(late.clone());
  subject.try_next(3).unwrap();
  assert_eq!(late.values(), vec![2, 3]);
  assert_eq!(subject.value(), Some(3));
}

#[test]
fn replay_of_size_two_delivers_the_last_two() {
  let subject = Subject::<&str, Infallible>::replay(
    ReplayConfig::unbounded().with_max_size(2),
    VirtualTimeScheduler::new(),
  );
  for v in ["A", "B", "C", "D"] {
    subject.try_next(v).unwrap();
  }
  let late = TestObserver::new();
  subject.clone().subscribe_with(late.clone());
  assert_eq!(late.values(), vec!["C", "D"]);
}

#[test]
fn switch_map_cancels_slow_inner_before_subscribing_the_next() {
  init_logging();
  let scheduler = VirtualTimeScheduler::new();
  let outer = Subject::<i32, Infallible>::publish();
  let log = Arc::new(Mutex::new(vec![]));
  let observer = TestObserver::<i32, Infallible>::new();
  let (l, sched) = (log.clone(), scheduler.clone());
  outer
    .clone()
    .switch_map(move |n| {
      let (log, sched) = (l.clone(), sched.clone());
      observable::create(move |mut emitter: Emitter<i32, Infallible>| {
        log.lock().unwrap().push(format!("subscribe {n}"));
        let timer = SharedSubscription::new();
        let l = log.clone();
        emitter.add_teardown(move || l.lock().unwrap().push(format!("cancel {n}")));
        emitter.add_subscription(timer.clone());
        let handle = sched.schedule(
          Box::new(move || {
            emitter.next(n);
            emitter.complete();
          }),
          Some(Duration::from_millis(50)),
        );
        timer.add(handle);
      })
    })
    .subscribe_with(observer.clone());

  outer.try_next(1).unwrap();
  scheduler.advance_by(Duration::from_millis(10));
  outer.try_next(2).unwrap();
  outer.try_complete().unwrap();
  assert_eq!(*log.lock().unwrap(), vec!["subscribe 1", "cancel 1", "subscribe 2"]);

  scheduler.advance_by(Duration::from_millis(100));
  assert_eq!(observer.values(), vec![2]);
  assert!(observer.is_completed());
  assert_eq!(scheduler.pending_count(), 0);
}

#[test]
fn cancelling_inside_next_stops_delivery() {
  let seen = Arc::new(Mutex::new(vec![]));
  let subscription = SharedSubscription::new();
  let (s, handle) = (seen.clone(), subscription.clone());
  let observer = ObserverAll::new(
    move |v: i32| {
      s.lock().unwrap().push(v);
      if v == 2 {
        handle.unsubscribe();
      }
    },
    |_: Infallible| {},
    || {},
  );
  observable::from_iter(0..10)
    .map(|v| v)
    .actual_subscribe(Subscriber::with_subscription(observer, subscription.clone()));
  assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
  assert!(subscription.is_closed());
}

#[test]
fn merge_serializes_concurrent_producers() {
  init_logging();
  let pool = ThreadPoolScheduler::new(SchedulerConfig::default().pool_size(4)).unwrap();
  let observer = TestObserver::<usize, Infallible>::new();
  let a = observable::from_iter(0..100).subscribe_on(pool.clone());
  let b = observable::from_iter(100..200).subscribe_on(pool);
  a.merge(b).subscribe_with(observer.clone());

  wait_until(|| observer.is_completed());
  let mut values = observer.values();
  values.sort_unstable();
  assert_eq!(values, (0..200).collect::<Vec<_>>());
}

#[test]
fn share_connects_once_and_reconnects_after_zero() {
  init_logging();
  let scheduler = VirtualTimeScheduler::new();
  let shared =
    observable::interval::<_, Infallible>(Duration::from_millis(10), scheduler.clone()).share();
  let first = TestObserver::new();
  let second = TestObserver::new();

  let s1 = shared.clone().subscribe_with(first.clone());
  scheduler.advance_by(Duration::from_millis(20));
  let s2 = shared.clone().subscribe_with(second.clone());
  scheduler.advance_by(Duration::from_millis(10));
  assert_eq!(first.values(), vec![0, 1, 2]);
  assert_eq!(second.values(), vec![2]);

  s1.into_inner().unsubscribe();
  s2.into_inner().unsubscribe();
  assert!(scheduler.is_empty());

  let again = TestObserver::new();
  shared.subscribe_with(again.clone());
  scheduler.advance_by(Duration::from_millis(10));
  assert_eq!(again.values(), vec![0]);
}

#[test]
fn retry_then_recover() {
  init_logging();
  let attempts = Arc::new(Mutex::new(0));
  let a = attempts.clone();
  let observer = TestObserver::<i32, &str>::new();
  observable::defer(move || {
    *a.lock().unwrap() += 1;
    observable::throw_err::<i32, _>("down")
  })
  .retry(2)
  .on_error_return(|_| -1)
  .subscribe_with(observer.clone());
  assert_eq!(*attempts.lock().unwrap(), 3);
  assert_eq!(observer.values(), vec![-1]);
  assert!(observer.is_completed());
}

#[test]
fn group_into_demand_regulated_streams() {
  init_logging();
  let odds = TestSubscriber::<u32, BackpressureError>::with_initial_request(2);
  let sink = odds.clone();
  observable::from_iter(1..=9u32).group_by(|v| v % 2).subscribe_err(
    move |group| {
      if *group.key() == 1 {
        group.to_flowable(OverflowPolicy::buffer(8)).subscribe_with(sink.clone());
      }
    },
    |_| {},
  );
  assert_eq!(odds.values(), vec![1, 3]);
  odds.request(5);
  assert_eq!(odds.values(), vec![1, 3, 5, 7, 9]);
  assert!(odds.is_completed());
}

#[test]
fn subscription_cleanup_releases_subject_slots() {
  let subject = Subject::<i32, Infallible>::publish();
  let subscriptions: Vec<_> =
    (0..10).map(|_| subject.clone().map(|v| v + 1).subscribe(|_| {}).into_inner()).collect();
  assert_eq!(subject.subscriber_count(), 10);
  subscriptions.iter().for_each(|s| s.unsubscribe());
  assert_eq!(subject.subscriber_count(), 0);
}
