//! Caller supplied configuration.
//!
//! The engine reads no files and no environment; callers build these values
//! (directly or through `serde`) and hand them to the scheduler and
//! backpressure constructors.

use serde::{Deserialize, Serialize};

use crate::{backpressure::BackpressureStrategy, error::ConfigError};

/// Sizing of a [`ThreadPoolScheduler`](crate::scheduler::ThreadPoolScheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
  /// Worker thread count.
  pub pool_size: usize,
  /// Bound on the pending work queue. Scheduling onto a full queue blocks the
  /// scheduling thread until a worker frees a slot.
  pub queue_capacity: usize,
  /// Prefix of the worker thread names.
  pub thread_name: String,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    let pool_size = std::thread::available_parallelism().map_or(4, |n| n.get());
    Self { pool_size, queue_capacity: 1024, thread_name: "rxflow-worker".to_owned() }
  }
}

impl SchedulerConfig {
  pub fn pool_size(mut self, pool_size: usize) -> Self {
    self.pool_size = pool_size;
    self
  }

  pub fn queue_capacity(mut self, queue_capacity: usize) -> Self {
    self.queue_capacity = queue_capacity;
    self
  }

  pub fn thread_name(mut self, name: impl Into<String>) -> Self {
    self.thread_name = name.into();
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.pool_size == 0 {
      return Err(ConfigError::ZeroPoolSize);
    }
    if self.queue_capacity == 0 {
      return Err(ConfigError::ZeroQueueCapacity);
    }
    Ok(())
  }
}

/// The full set of recognized engine options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub pool_size: usize,
  pub queue_capacity: usize,
  pub overflow_policy: BackpressureStrategy,
}

impl Default for EngineConfig {
  fn default() -> Self {
    let scheduler = SchedulerConfig::default();
    Self {
      pool_size: scheduler.pool_size,
      queue_capacity: scheduler.queue_capacity,
      overflow_policy: BackpressureStrategy::default(),
    }
  }
}

impl EngineConfig {
  pub fn scheduler(&self) -> SchedulerConfig {
    SchedulerConfig::default().pool_size(self.pool_size).queue_capacity(self.queue_capacity)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.scheduler().validate()?;
    self.overflow_policy.validate()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_zero_sizes() {
    assert_eq!(SchedulerConfig::default().pool_size(0).validate(), Err(ConfigError::ZeroPoolSize));
    assert_eq!(
      SchedulerConfig::default().queue_capacity(0).validate(),
      Err(ConfigError::ZeroQueueCapacity)
    );
    assert!(SchedulerConfig::default().validate().is_ok());
  }

  #[test]
  fn engine_config_from_json() {
    let config: EngineConfig = serde_json::from_str(
      r#"{ "pool_size": 2, "queue_capacity": 8, "overflow_policy": { "buffer": { "capacity": 16 } } }"#,
    )
    .unwrap();
    assert_eq!(config.pool_size, 2);
    assert_eq!(config.scheduler().queue_capacity, 8);
    assert_eq!(config.overflow_policy, BackpressureStrategy::Buffer { capacity: 16 });
    assert!(config.validate().is_ok());

    let config: EngineConfig = serde_json::from_str(r#"{ "overflow_policy": "drop" }"#).unwrap();
    assert_eq!(config.overflow_policy, BackpressureStrategy::Drop);

    let config: EngineConfig =
      serde_json::from_str(r#"{ "overflow_policy": { "buffer": { "capacity": 0 } } }"#).unwrap();
    assert_eq!(config.validate(), Err(ConfigError::ZeroBufferCapacity));
  }
}
