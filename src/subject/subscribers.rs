use crate::observer::{BoxedObserver, Emission, Serialized};

/// One subscriber slot: emissions are queued under the subject lock and
/// delivered after it is released.
pub(crate) type Slot<Item, Err> = Serialized<BoxedObserver<Item, Err>, Item, Err>;

/// The fan-out set of a subject, keyed by subscription id.
pub(crate) struct Subscribers<Item, Err> {
  next_id: u64,
  entries: Vec<(u64, Slot<Item, Err>)>,
}

impl<Item, Err> Default for Subscribers<Item, Err> {
  fn default() -> Self { Self { next_id: 0, entries: Vec::new() } }
}

impl<Item, Err> Subscribers<Item, Err> {
  pub fn add(&mut self, slot: Slot<Item, Err>) -> u64 {
    let id = self.next_id;
    self.next_id += 1;
    self.entries.push((id, slot));
    id
  }

  pub fn remove(&mut self, id: u64) -> Option<Slot<Item, Err>> {
    let idx = self.entries.iter().position(|(i, _)| *i == id)?;
    Some(self.entries.remove(idx).1)
  }

  pub fn len(&self) -> usize { self.entries.len() }

  /// Queue `value` on every slot; the last one gets the moved value. Returns
  /// the slots to drain once the subject lock is released.
  pub fn broadcast_value(&mut self, value: Item) -> Vec<Slot<Item, Err>>
  where
    Item: Clone,
  {
    self.entries.retain(|(_, slot)| !slot.is_closed());
    let mut iter = self.entries.iter().peekable();
    let mut pending = Vec::with_capacity(self.entries.len());
    while let Some((_, slot)) = iter.next() {
      if iter.peek().is_some() {
        slot.enqueue(Emission::Value(value.clone()));
      } else {
        slot.enqueue(Emission::Value(value));
        pending.push(slot.clone());
        break;
      }
      pending.push(slot.clone());
    }
    pending
  }

  /// Queue `last` (if any) followed by a terminal on every slot and empty
  /// the set.
  pub fn broadcast_terminal(
    &mut self, last: Option<Item>, terminal: impl Fn() -> Emission<Item, Err>,
  ) -> Vec<Slot<Item, Err>>
  where
    Item: Clone,
  {
    self
      .entries
      .drain(..)
      .map(|(_, slot)| {
        if let Some(v) = last.as_ref() {
          slot.enqueue(Emission::Value(v.clone()));
        }
        slot.enqueue(terminal());
        slot
      })
      .collect()
  }
}
