//! Overflow policies applied where a producer outruns demand.
//!
//! | Strategy | When demand is exhausted |
//! |---|---|
//! | `Buffer { capacity }` | queue up to `capacity` values; beyond that evict the oldest to the callback, or fail with [`BackpressureError::BufferOverflow`] when there is none |
//! | `Drop` | discard the new value, handing it to the callback |
//! | `Latest` | keep only the newest undelivered value |
//! | `Error` | fail with [`BackpressureError::MissingDemand`] |
//! | `Missing` | deliver anyway; the consumer must cope |
//!
//! [`BackpressureStrategy`] is the plain, configurable part. An
//! [`OverflowPolicy`] pairs it with an optional callback that receives the
//! values the strategy discards.

use std::{
  fmt::{Debug, Formatter},
  sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::error::{BackpressureError, ConfigError};

/// What a demand-regulated boundary does with values nobody asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressureStrategy {
  Buffer { capacity: usize },
  Drop,
  Latest,
  Error,
  Missing,
}

impl Default for BackpressureStrategy {
  fn default() -> Self { BackpressureStrategy::Buffer { capacity: 128 } }
}

impl BackpressureStrategy {
  pub fn validate(&self) -> Result<(), ConfigError> {
    match self {
      BackpressureStrategy::Buffer { capacity: 0 } => Err(ConfigError::ZeroBufferCapacity),
      _ => Ok(()),
    }
  }
}

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A [`BackpressureStrategy`] plus the callback receiving discarded values.
pub struct OverflowPolicy<T> {
  strategy: BackpressureStrategy,
  callback: Option<Callback<T>>,
}

impl<T> OverflowPolicy<T> {
  pub fn buffer(capacity: usize) -> Self { BackpressureStrategy::Buffer { capacity }.into() }

  /// Buffer up to `capacity` values, evicting the oldest into `on_evict`
  /// once full.
  pub fn buffer_with(capacity: usize, on_evict: impl Fn(T) + Send + Sync + 'static) -> Self {
    Self::buffer(capacity).with_callback(on_evict)
  }

  pub fn drop() -> Self { BackpressureStrategy::Drop.into() }

  pub fn drop_with(on_drop: impl Fn(T) + Send + Sync + 'static) -> Self {
    Self::drop().with_callback(on_drop)
  }

  pub fn latest() -> Self { BackpressureStrategy::Latest.into() }

  pub fn error() -> Self { BackpressureStrategy::Error.into() }

  pub fn missing() -> Self { BackpressureStrategy::Missing.into() }

  /// Hand every value the strategy discards to `callback`.
  pub fn with_callback(mut self, callback: impl Fn(T) + Send + Sync + 'static) -> Self {
    self.callback = Some(Arc::new(callback));
    self
  }

  pub fn strategy(&self) -> &BackpressureStrategy { &self.strategy }

  /// Whether applying this policy can terminate the subscription with a
  /// [`BackpressureError`].
  pub fn can_fail(&self) -> bool {
    match self.strategy {
      BackpressureStrategy::Buffer { .. } => self.callback.is_none(),
      BackpressureStrategy::Error => true,
      _ => false,
    }
  }

  pub(crate) fn discard(&self, value: T) {
    if let Some(callback) = &self.callback {
      callback(value)
    }
  }

  pub(crate) fn has_callback(&self) -> bool { self.callback.is_some() }
}

impl<T> From<BackpressureStrategy> for OverflowPolicy<T> {
  fn from(strategy: BackpressureStrategy) -> Self { OverflowPolicy { strategy, callback: None } }
}

impl<T> Clone for OverflowPolicy<T> {
  fn clone(&self) -> Self {
    OverflowPolicy { strategy: self.strategy.clone(), callback: self.callback.clone() }
  }
}

impl<T> Debug for OverflowPolicy<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OverflowPolicy")
      .field("strategy", &self.strategy)
      .field("callback", &self.callback.is_some())
      .finish()
  }
}

/// Converts overflow failures into the pipeline error type. `None` for
/// boundaries whose policy cannot fail.
pub(crate) type RaiseFn<Err> = Option<fn(BackpressureError) -> Err>;

pub(crate) fn raise_with<Err: From<BackpressureError>>() -> RaiseFn<Err> {
  Some(<Err as From<BackpressureError>>::from)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strategy_from_json() {
    let strategy: BackpressureStrategy = serde_json::from_str(r#"{"buffer":{"capacity":16}}"#).unwrap();
    assert_eq!(strategy, BackpressureStrategy::Buffer { capacity: 16 });
    let strategy: BackpressureStrategy = serde_json::from_str(r#""latest""#).unwrap();
    assert_eq!(strategy, BackpressureStrategy::Latest);
    assert_eq!(serde_json::to_string(&BackpressureStrategy::Missing).unwrap(), r#""missing""#);
  }

  #[test]
  fn zero_capacity_is_rejected() {
    assert_eq!(
      BackpressureStrategy::Buffer { capacity: 0 }.validate(),
      Err(ConfigError::ZeroBufferCapacity)
    );
    assert!(BackpressureStrategy::default().validate().is_ok());
  }

  #[test]
  fn which_policies_can_fail() {
    assert!(OverflowPolicy::<i32>::buffer(4).can_fail());
    assert!(!OverflowPolicy::<i32>::buffer_with(4, |_| {}).can_fail());
    assert!(OverflowPolicy::<i32>::error().can_fail());
    assert!(!OverflowPolicy::<i32>::drop().can_fail());
    assert!(!OverflowPolicy::<i32>::latest().can_fail());
    assert!(!OverflowPolicy::<i32>::missing().can_fail());
  }
}
