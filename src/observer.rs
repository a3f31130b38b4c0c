//! Observer trait and implementations
//!
//! The Observer trait defines the consumer of data in the reactive pattern.
//! It provides three methods: next (for values), error (for errors), and
//! complete (for stream completion).

use std::convert::Infallible;

use crate::rc::MutArc;

pub mod serialized;

pub use serialized::Serialized;

/// The consumer of a sequence.
///
/// `error` and `complete` consume the observer, so at most one terminal
/// emission can ever reach it.
pub trait Observer<Item, Err> {
  /// Receive the next value.
  fn next(&mut self, value: Item);

  /// Receive the terminal error.
  fn error(self, err: Err);

  /// Receive the completion signal.
  fn complete(self);

  /// Returns `true` once the observer accepts no more values.
  ///
  /// Sources check this between emissions so that a downstream `take` or a
  /// cancellation stops them early.
  fn is_closed(&self) -> bool;
}

/// One emission of a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission<Item, Err> {
  Value(Item),
  Error(Err),
  Complete,
}

impl<Item, Err> Emission<Item, Err> {
  pub fn is_terminal(&self) -> bool { !matches!(self, Emission::Value(_)) }

  /// Hand the emission to `observer`, taking it out of the slot on a
  /// terminal.
  pub fn deliver<O: Observer<Item, Err>>(self, observer: &mut Option<O>) {
    match self {
      Emission::Value(v) => {
        if let Some(o) = observer.as_mut() {
          o.next(v)
        }
      }
      Emission::Error(e) => {
        if let Some(o) = observer.take() {
          o.error(e)
        }
      }
      Emission::Complete => {
        if let Some(o) = observer.take() {
          o.complete()
        }
      }
    }
  }
}

// ============================================================================
// DynObserver - object-safe Observer
// ============================================================================

/// Object-safe mirror of [`Observer`], so observers can be boxed.
pub trait DynObserver<Item, Err> {
  fn box_next(&mut self, value: Item);
  fn box_error(self: Box<Self>, err: Err);
  fn box_complete(self: Box<Self>);
  fn box_is_closed(&self) -> bool;
}

impl<T, Item, Err> DynObserver<Item, Err> for T
where
  T: Observer<Item, Err>,
{
  fn box_next(&mut self, value: Item) { self.next(value); }
  fn box_error(self: Box<Self>, err: Err) { self.error(err); }
  fn box_complete(self: Box<Self>) { self.complete(); }
  fn box_is_closed(&self) -> bool { self.is_closed() }
}

/// A type erased observer that can cross threads.
pub type BoxedObserver<Item, Err> = Box<dyn DynObserver<Item, Err> + Send>;

impl<Item, Err> Observer<Item, Err> for Box<dyn DynObserver<Item, Err> + Send> {
  #[inline]
  fn next(&mut self, value: Item) { (**self).box_next(value) }

  #[inline]
  fn error(self, err: Err) { self.box_error(err) }

  #[inline]
  fn complete(self) { self.box_complete() }

  #[inline]
  fn is_closed(&self) -> bool { (**self).box_is_closed() }
}

// ============================================================================
// Closure observers
// ============================================================================

/// Observer built from a single `next` closure.
///
/// Only usable with sources that cannot fail, so no error is ever dropped.
#[derive(Clone)]
pub struct FnMutObserver<F>(pub F);

impl<Item, F> Observer<Item, Infallible> for FnMutObserver<F>
where
  F: FnMut(Item),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.0)(value) }

  fn error(self, err: Infallible) { match err {} }

  fn complete(self) {}

  fn is_closed(&self) -> bool { false }
}

/// Observer built from `next`, `error` and `complete` closures.
pub struct ObserverAll<N, E, C> {
  next: N,
  error: E,
  complete: C,
}

impl<N, E, C> ObserverAll<N, E, C> {
  pub fn new(next: N, error: E, complete: C) -> Self { ObserverAll { next, error, complete } }
}

impl<Item, Err, N, E, C> Observer<Item, Err> for ObserverAll<N, E, C>
where
  N: FnMut(Item),
  E: FnOnce(Err),
  C: FnOnce(),
{
  #[inline]
  fn next(&mut self, value: Item) { (self.next)(value) }

  fn error(self, err: Err) { (self.error)(err) }

  fn complete(self) { (self.complete)() }

  fn is_closed(&self) -> bool { false }
}

// ============================================================================
// Wrappers
// ============================================================================

/// An observer slot that is emptied by the first terminal.
impl<Item, Err, O> Observer<Item, Err> for Option<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(o) = self.as_mut() {
      o.next(value)
    }
  }

  fn error(self, err: Err) {
    if let Some(o) = self {
      o.error(err)
    }
  }

  fn complete(self) {
    if let Some(o) = self {
      o.complete()
    }
  }

  fn is_closed(&self) -> bool { self.as_ref().map_or(true, |o| o.is_closed()) }
}

/// A shared observer slot. The terminal takes the observer out of the slot
/// and runs it outside the lock.
impl<Item, Err, O> Observer<Item, Err> for MutArc<Option<O>>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(o) = self.rc_deref_mut().as_mut() {
      o.next(value)
    }
  }

  fn error(self, err: Err) {
    let observer = self.rc_deref_mut().take();
    if let Some(o) = observer {
      o.error(err)
    }
  }

  fn complete(self) {
    let observer = self.rc_deref_mut().take();
    if let Some(o) = observer {
      o.complete()
    }
  }

  fn is_closed(&self) -> bool { self.rc_deref().as_ref().map_or(true, |o| o.is_closed()) }
}
