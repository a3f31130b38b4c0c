//! Cancellation handles of push sources.
//!
//! Every activation owns one [`SharedSubscription`]. Operators that hold
//! resources of their own (timers, inner subscriptions, subject slots) add
//! them as teardowns, and unsubscribing the root releases the whole tree.

use std::{
  any::Any,
  fmt::{Debug, Formatter},
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;
use smallvec::SmallVec;

/// A handle that can be cancelled.
pub trait SubscriptionLike {
  /// Stop the activation. Idempotent.
  fn unsubscribe(&self);

  fn is_closed(&self) -> bool;
}

type BoxedTeardown = Box<dyn SubscriptionLike + Send + Sync>;

impl Debug for dyn SubscriptionLike + Send + Sync {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("dyn SubscriptionLike").field("is_closed", &self.is_closed()).finish()
  }
}

impl<T: SubscriptionLike + ?Sized> SubscriptionLike for Box<T> {
  #[inline]
  fn unsubscribe(&self) { (**self).unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

impl<T: SubscriptionLike + ?Sized> SubscriptionLike for Arc<T> {
  #[inline]
  fn unsubscribe(&self) { (**self).unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).is_closed() }
}

#[derive(Default)]
struct Inner {
  closed: AtomicBool,
  teardown: Mutex<SmallVec<[BoxedTeardown; 1]>>,
}

/// A thread safe subscription with a list of teardowns.
#[derive(Clone, Default)]
pub struct SharedSubscription(Arc<Inner>);

impl SharedSubscription {
  pub fn new() -> Self { Self::default() }

  /// Attach a teardown. If this subscription is already closed the teardown
  /// runs immediately.
  pub fn add<S: SubscriptionLike + Send + Sync + 'static>(&self, subscription: S) {
    if self.is_same(&subscription) {
      return;
    }
    {
      let mut teardown = self.0.teardown.lock();
      if !self.0.closed.load(Ordering::Acquire) {
        teardown.retain(|t| !t.is_closed());
        teardown.push(Box::new(subscription));
        return;
      }
    }
    subscription.unsubscribe();
  }

  /// Attach a closure to run on unsubscribe.
  pub fn add_fn(&self, f: impl FnOnce() + Send + 'static) { self.add(Teardown::new(f)) }

  /// Create a subscription that is closed together with this one, but can
  /// also be closed on its own.
  pub fn child(&self) -> SharedSubscription {
    let child = SharedSubscription::new();
    self.add(child.clone());
    child
  }

  pub fn teardown_size(&self) -> usize { self.0.teardown.lock().len() }

  fn is_same(&self, other: &dyn Any) -> bool {
    other.downcast_ref::<Self>().map_or(false, |other| Arc::ptr_eq(&self.0, &other.0))
  }
}

impl SubscriptionLike for SharedSubscription {
  fn unsubscribe(&self) {
    if self.0.closed.swap(true, Ordering::AcqRel) {
      return;
    }
    let teardown = std::mem::take(&mut *self.0.teardown.lock());
    for t in teardown {
      t.unsubscribe();
    }
  }

  #[inline]
  fn is_closed(&self) -> bool { self.0.closed.load(Ordering::Acquire) }
}

impl Debug for SharedSubscription {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SharedSubscription")
      .field("is_closed", &self.is_closed())
      .field("teardown_size", &self.teardown_size())
      .finish()
  }
}

/// A closure run once on unsubscribe.
pub struct Teardown(Mutex<Option<Box<dyn FnOnce() + Send>>>);

impl Teardown {
  pub fn new(f: impl FnOnce() + Send + 'static) -> Self { Teardown(Mutex::new(Some(Box::new(f)))) }
}

impl SubscriptionLike for Teardown {
  fn unsubscribe(&self) {
    let f = self.0.lock().take();
    if let Some(f) = f {
      f()
    }
  }

  fn is_closed(&self) -> bool { self.0.lock().is_none() }
}

/// Returned by `subscribe*`. Unsubscribing is explicit; see
/// [`SubscriptionWrapper::unsubscribe_when_dropped`] for scope bound
/// activations.
#[derive(Clone, Debug)]
#[must_use = "dropping the wrapper does not cancel the subscription; call `unsubscribe` or \
              `unsubscribe_when_dropped`"]
pub struct SubscriptionWrapper<T: SubscriptionLike>(pub(crate) T);

impl<T: SubscriptionLike> SubscriptionWrapper<T> {
  pub fn new(subscription: T) -> Self { SubscriptionWrapper(subscription) }

  /// Cancel the activation when the returned guard goes out of scope.
  pub fn unsubscribe_when_dropped(self) -> SubscriptionGuard<T> { SubscriptionGuard(self.0) }

  pub fn into_inner(self) -> T { self.0 }
}

impl<T: SubscriptionLike> SubscriptionLike for SubscriptionWrapper<T> {
  #[inline]
  fn unsubscribe(&self) { self.0.unsubscribe() }

  #[inline]
  fn is_closed(&self) -> bool { self.0.is_closed() }
}

/// Unsubscribes its subscription on drop.
#[derive(Debug)]
#[must_use]
pub struct SubscriptionGuard<T: SubscriptionLike>(T);

impl<T: SubscriptionLike> SubscriptionGuard<T> {
  pub fn new(subscription: T) -> Self { SubscriptionGuard(subscription) }
}

impl<T: SubscriptionLike> Drop for SubscriptionGuard<T> {
  fn drop(&mut self) { self.0.unsubscribe() }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::AtomicUsize;

  use super::*;

  #[test]
  fn teardowns_run_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let subscription = SharedSubscription::new();
    let h = hits.clone();
    subscription.add_fn(move || {
      h.fetch_add(1, Ordering::SeqCst);
    });
    subscription.unsubscribe();
    subscription.unsubscribe();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(subscription.is_closed());
  }

  #[test]
  fn add_after_close_runs_immediately() {
    let subscription = SharedSubscription::new();
    subscription.unsubscribe();
    let child = SharedSubscription::new();
    subscription.add(child.clone());
    assert!(child.is_closed());
  }

  #[test]
  fn add_self_is_ignored() {
    let subscription = SharedSubscription::new();
    subscription.add(subscription.clone());
    assert_eq!(subscription.teardown_size(), 0);
  }

  #[test]
  fn closed_teardowns_are_pruned() {
    let subscription = SharedSubscription::new();
    let a = subscription.child();
    let _b = subscription.child();
    assert_eq!(subscription.teardown_size(), 2);
    a.unsubscribe();
    let _c = subscription.child();
    assert_eq!(subscription.teardown_size(), 2);
    assert!(!subscription.is_closed());
  }

  #[test]
  fn guard_unsubscribes_on_drop() {
    let subscription = SharedSubscription::new();
    {
      let _guard = SubscriptionWrapper::new(subscription.clone()).unsubscribe_when_dropped();
    }
    assert!(subscription.is_closed());
  }
}
