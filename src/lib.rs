//! # rxflow: reactive streams with backpressure
//!
//! Two kinds of sources share one operator vocabulary:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observable`] | push based, emits as fast as it produces |
//! | [`Flowable`] | demand regulated, emits only what the subscriber requested |
//! | [`Subject`] | multicast sink and source: publish, behavior, replay, async |
//! | [`Scheduler`] | where and when work runs: immediate, trampoline, thread pool, virtual time |
//!
//! ## Quick Start
//!
//! ```rust
//! use rxflow::prelude::*;
//!
//! let sum = MutArc::own(0);
//! let s = sum.clone();
//! observable::from_iter(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(move |v| *s.rc_deref_mut() += v);
//! assert_eq!(*sum.rc_deref(), 40);
//! ```
//!
//! A push source meets a slower consumer through an overflow policy:
//!
//! ```rust
//! use rxflow::prelude::*;
//! use rxflow::testing::TestSubscriber;
//!
//! let subscriber = TestSubscriber::<i32, BackpressureError>::with_initial_request(2);
//! observable::from_iter(1..=5)
//!   .to_flowable(OverflowPolicy::latest())
//!   .subscribe_with(subscriber.clone());
//! subscriber.request(1);
//! assert_eq!(subscriber.values(), vec![1, 2, 5]);
//! ```
//!
//! ## Feature Flags
//!
//! - **`tokio-scheduler`**: a [`Scheduler`] backed by a tokio runtime handle
//!
//! [`Observable`]: observable::Observable
//! [`Flowable`]: flowable::Flowable
//! [`Subject`]: subject::Subject
//! [`Scheduler`]: scheduler::Scheduler

pub mod backpressure;
pub mod config;
pub mod error;
pub mod flowable;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod subject;
pub mod subscriber;
pub mod subscription;
pub mod testing;

pub use prelude::*;

#[cfg(doctest)]
mod readme {
  #![doc = include_str!("../README.md")]
}
