//! Sparse, server-sized collection of slots.

use std::ops::Range;

/// Ordered slots of length `total`; `None` is a hole (not fetched yet).
///
/// After every merge the length equals the total last reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseCollection<T> {
  slots: Vec<Option<T>>,
}

impl<T> Default for SparseCollection<T> {
  fn default() -> Self {
    Self { slots: Vec::new() }
  }
}

impl<T> SparseCollection<T> {
  pub fn new() -> Self {
    Self::default()
  }

  /// All-holes collection of `total` slots.
  pub fn with_holes(total: usize) -> Self {
    let mut slots = Vec::with_capacity(total);
    slots.resize_with(total, || None);
    Self { slots }
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }

  pub fn holes(&self) -> usize {
    self.slots.iter().filter(|s| s.is_none()).count()
  }

  /// True when no slot is a hole.
  pub fn is_complete(&self) -> bool {
    self.slots.iter().all(Option::is_some)
  }

  /// Grow with holes or truncate to `total`.
  pub fn resize(&mut self, total: usize) {
    self.slots.resize_with(total, || None);
  }

  /// Size the collection to `total` and write `rows` starting at `offset`.
  /// Rows that fall past `total` are dropped.
  pub fn splice_page(&mut self, offset: usize, rows: Vec<T>, total: usize) {
    self.resize(total);
    for (slot, row) in self.slots.iter_mut().skip(offset).zip(rows) {
      *slot = Some(row);
    }
  }

  pub fn push(&mut self, item: T) {
    self.slots.push(Some(item));
  }

  /// Remove one slot, shifting later slots left.
  pub fn remove_at(&mut self, index: usize) -> Option<T> {
    if index < self.slots.len() {
      self.slots.remove(index)
    } else {
      None
    }
  }

  pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
    self.slots.get_mut(index).and_then(Option::as_mut)
  }

  /// Index of the first materialized slot matching `pred`.
  pub fn position(&self, mut pred: impl FnMut(&T) -> bool) -> Option<usize> {
    self
      .slots
      .iter()
      .position(|slot| slot.as_ref().is_some_and(&mut pred))
  }

  pub fn slots(&self) -> &[Option<T>] {
    &self.slots
  }

  /// Materialized items in slot order.
  pub fn materialized(&self) -> impl Iterator<Item = &T> {
    self.slots.iter().flatten()
  }

  /// True when every slot of `range` (clipped to the length) is filled.
  pub fn is_range_materialized(&self, range: Range<usize>) -> bool {
    let end = range.end.min(self.slots.len());
    let start = range.start.min(end);
    self.slots[start..end].iter().all(Option::is_some)
  }

  /// Items of a fully materialized collection, or the collection unchanged.
  pub fn into_complete(self) -> Result<Vec<T>, Self> {
    if self.is_complete() {
      Ok(self.slots.into_iter().flatten().collect())
    } else {
      Err(self)
    }
  }
}

impl<T: Clone> SparseCollection<T> {
  /// Clones of the materialized items of `range`.
  pub fn slice(&self, range: Range<usize>) -> Vec<T> {
    let end = range.end.min(self.slots.len());
    let start = range.start.min(end);
    self.slots[start..end].iter().flatten().cloned().collect()
  }
}

impl<T> From<Vec<T>> for SparseCollection<T> {
  fn from(items: Vec<T>) -> Self {
    Self {
      slots: items.into_iter().map(Some).collect(),
    }
  }
}
