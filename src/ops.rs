//! Operator implementations behind [`ObservableExt`](crate::observable::ObservableExt).
//!
//! Every operator is a plain struct holding its upstream and parameters;
//! subscribing it subscribes the upstream with an observer that carries the
//! operator's per-activation state.

pub mod auto_connect;
pub mod box_it;
pub mod buffer_count;
pub mod buffer_time;
pub mod combine_latest;
pub mod concat;
pub mod debounce;
pub mod delay;
pub mod filter;
pub mod filter_map;
pub mod group_by;
pub mod map;
pub mod merge;
pub mod observe_on;
pub mod on_error;
pub mod reduce;
pub mod ref_count;
pub mod retry;
pub mod scan;
pub mod skip;
pub mod subscribe_on;
pub mod switch_map;
pub mod take;
pub mod take_while;
pub mod tap;
pub mod window;
pub mod zip;
