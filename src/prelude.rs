//! Commonly used types and traits in one import.

pub use std::convert::Infallible;

pub use crate::{
  backpressure::{BackpressureStrategy, OverflowPolicy},
  config::{EngineConfig, SchedulerConfig},
  error::{BackpressureError, ConfigError, SchedulerError, SubjectError},
  flowable::{
    self, FlowEmitter, FlowSubscriber, FlowSubscription, Flowable, FlowableExt,
  },
  observable::{self, ConnectableObservable, Emitter, Observable, ObservableExt},
  observer::{Emission, Observer},
  ops::{
    box_it::BoxedObservable,
    group_by::GroupedObservable,
    retry::{RetryConfig, RetryPolicy},
    window::Window,
  },
  rc::MutArc,
  scheduler::{
    ImmediateScheduler, Scheduler, TaskHandle, ThreadPoolScheduler, TrampolineScheduler,
    VirtualTimeScheduler,
  },
  subject::{ReplayConfig, Subject},
  subscriber::Subscriber,
  subscription::{SharedSubscription, SubscriptionLike, SubscriptionWrapper},
};
