//! Shared mutable state used by operators and subjects.
//!
//! Every piece of per-subscription state that more than one party touches
//! (an operator's observer and its timer task, a subject and its
//! subscriptions) lives behind a `MutArc`.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

/// A reference counted, lock protected value.
#[derive(Default)]
pub struct MutArc<T>(Arc<Mutex<T>>);

impl<T> MutArc<T> {
  pub fn own(t: T) -> Self { Self(Arc::new(Mutex::new(t))) }

  #[inline]
  pub fn rc_deref(&self) -> MutexGuard<'_, T> { self.0.lock() }

  #[inline]
  pub fn rc_deref_mut(&self) -> MutexGuard<'_, T> { self.0.lock() }

  /// Returns `true` if both handles point to the same value.
  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl<T> Clone for MutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> From<T> for MutArc<T> {
  fn from(t: T) -> Self { Self::own(t) }
}
