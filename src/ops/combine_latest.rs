use crate::{
  observable::Observable,
  observer::{Emission, Observer, Serialized},
  rc::MutArc,
  subscriber::Subscriber,
  subscription::SharedSubscription,
};

/// Emits `func(latest_a, latest_b)` whenever either side emits, once both
/// sides have a value.
///
/// Completes when both sides completed, or as soon as one side completes
/// without ever emitting, since no combination can be formed anymore.
#[derive(Clone)]
pub struct CombineLatestOp<A, B, F> {
  pub a: A,
  pub b: B,
  pub func: F,
}

impl<A, B, F, Out> Observable for CombineLatestOp<A, B, F>
where
  A: Observable,
  B: Observable<Err = A::Err>,
  F: FnMut(&A::Item, &B::Item) -> Out + Send + 'static,
  Out: Send + 'static,
{
  type Item = Out;
  type Err = A::Err;

  fn actual_subscribe<O>(self, subscriber: Subscriber<O>) -> SharedSubscription
  where
    O: Observer<Out, A::Err> + Send + 'static,
  {
    let subscription = subscriber.subscription.clone();
    let shared = Shared {
      state: MutArc::own(CombineState {
        latest_a: None,
        latest_b: None,
        completed_a: false,
        completed_b: false,
        func: self.func,
      }),
      downstream: Serialized::new(subscriber),
    };

    let a = CombineAObserver(shared.clone());
    self.a.actual_subscribe(Subscriber::with_subscription(a, subscription.child()));
    let b = CombineBObserver(shared);
    self.b.actual_subscribe(Subscriber::with_subscription(b, subscription.child()));
    subscription
  }
}

pub struct CombineState<ItemA, ItemB, F> {
  latest_a: Option<ItemA>,
  latest_b: Option<ItemB>,
  completed_a: bool,
  completed_b: bool,
  func: F,
}

impl<ItemA, ItemB, F> CombineState<ItemA, ItemB, F> {
  fn finished(&self) -> bool {
    self.completed_a && self.completed_b
      || self.completed_a && self.latest_a.is_none()
      || self.completed_b && self.latest_b.is_none()
  }
}

pub struct Shared<O, ItemA, ItemB, F, Out, Err> {
  state: MutArc<CombineState<ItemA, ItemB, F>>,
  downstream: Serialized<Subscriber<O>, Out, Err>,
}

impl<O, ItemA, ItemB, F, Out, Err> Clone for Shared<O, ItemA, ItemB, F, Out, Err> {
  fn clone(&self) -> Self {
    Shared { state: self.state.clone(), downstream: self.downstream.clone() }
  }
}

impl<O, ItemA, ItemB, F, Out, Err> Shared<O, ItemA, ItemB, F, Out, Err>
where
  O: Observer<Out, Err>,
  F: FnMut(&ItemA, &ItemB) -> Out,
{
  fn update(&self, store: impl FnOnce(&mut CombineState<ItemA, ItemB, F>)) {
    let mut guard = self.state.rc_deref_mut();
    let state = &mut *guard;
    store(state);
    if let (Some(a), Some(b)) = (&state.latest_a, &state.latest_b) {
      self.downstream.enqueue(Emission::Value((state.func)(a, b)));
    }
    drop(guard);
    self.downstream.drain();
  }

  fn finish(&self, mark: impl FnOnce(&mut CombineState<ItemA, ItemB, F>)) {
    let finished = {
      let mut state = self.state.rc_deref_mut();
      mark(&mut state);
      state.finished()
    };
    if finished {
      self.downstream.emit(Emission::Complete);
    }
  }
}

pub struct CombineAObserver<O, ItemA, ItemB, F, Out, Err>(Shared<O, ItemA, ItemB, F, Out, Err>);

pub struct CombineBObserver<O, ItemA, ItemB, F, Out, Err>(Shared<O, ItemA, ItemB, F, Out, Err>);

impl<O, ItemA, ItemB, F, Out, Err> Observer<ItemA, Err>
  for CombineAObserver<O, ItemA, ItemB, F, Out, Err>
where
  O: Observer<Out, Err>,
  F: FnMut(&ItemA, &ItemB) -> Out,
{
  fn next(&mut self, value: ItemA) { self.0.update(|state| state.latest_a = Some(value)) }

  fn error(self, err: Err) { self.0.downstream.emit(Emission::Error(err)) }

  fn complete(self) { self.0.finish(|state| state.completed_a = true) }

  fn is_closed(&self) -> bool { self.0.downstream.is_closed() }
}

impl<O, ItemA, ItemB, F, Out, Err> Observer<ItemB, Err>
  for CombineBObserver<O, ItemA, ItemB, F, Out, Err>
where
  O: Observer<Out, Err>,
  F: FnMut(&ItemA, &ItemB) -> Out,
{
  fn next(&mut self, value: ItemB) { self.0.update(|state| state.latest_b = Some(value)) }

  fn error(self, err: Err) { self.0.downstream.emit(Emission::Error(err)) }

  fn complete(self) { self.0.finish(|state| state.completed_b = true) }

  fn is_closed(&self) -> bool { self.0.downstream.is_closed() }
}
