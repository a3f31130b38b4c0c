//! Error types raised by the engine itself.
//!
//! Domain errors flowing through a pipeline are the user's `Err` type; the
//! types below only cover failures the engine produces: overflow at a
//! backpressure boundary, pushes into a terminated subject, and invalid
//! configuration.

use thiserror::Error;

/// Raised at a demand-regulated boundary when a producer outruns demand.
///
/// Policies that can fail require the pipeline error type to implement
/// `From<BackpressureError>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackpressureError {
  #[error("buffer overflow: more than {capacity} values pending without demand")]
  BufferOverflow { capacity: usize },

  #[error("missing demand: a value was produced with no outstanding request")]
  MissingDemand,
}

/// A subject refused a push.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectError {
  #[error("subject already terminated")]
  Terminated,
}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("pool_size must be greater than zero")]
  ZeroPoolSize,

  #[error("queue_capacity must be greater than zero")]
  ZeroQueueCapacity,

  #[error("buffer capacity must be greater than zero")]
  ZeroBufferCapacity,
}

/// Failure to build an execution context.
#[derive(Debug, Error)]
pub enum SchedulerError {
  #[error("invalid scheduler configuration: {0}")]
  Config(#[from] ConfigError),

  #[error("failed to spawn thread `{name}`: {source}")]
  Spawn {
    name: String,
    #[source]
    source: std::io::Error,
  },
}
