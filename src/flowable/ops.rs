//! Operator implementations behind [`FlowableExt`](super::FlowableExt).
//!
//! Each operator subscribes its upstream with a subscriber that translates
//! downstream requests into upstream requests: one to one for `map` and
//! `scan`, scaled for `buffer_count`, capped for `take`, topped up for
//! `filter`.

pub mod buffer_count;
pub mod filter;
pub mod flat_map_iter;
pub mod into_stream;
pub mod map;
pub mod observe_on;
pub mod on_backpressure;
pub mod scan;
pub mod take;
pub mod to_observable;
