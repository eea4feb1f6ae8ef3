//! Foreign references and their `{valor, display}` projection.

use serde::{Deserialize, Serialize};

/// A domain object other records point at (a person, a role, a workflow...).
pub trait Reference: Clone + Send + Sync + 'static {
  /// Placeholder for a reference known only by id.
  fn from_id(id: i64) -> Self;

  fn id(&self) -> i64;

  /// Human label; empty when the object is only a placeholder.
  fn label(&self) -> String;
}

/// A foreign-key field as the server sends it: either a bare id or the
/// already-hydrated object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
  Id(i64),
  Hydrated(T),
}

impl<T: Reference> Ref<T> {
  pub fn id(&self) -> i64 {
    match self {
      Ref::Id(id) => *id,
      Ref::Hydrated(obj) => obj.id(),
    }
  }

  pub fn into_object(self) -> T {
    match self {
      Ref::Id(id) => T::from_id(id),
      Ref::Hydrated(obj) => obj,
    }
  }
}

/// `{valor, display}` pair for a foreign reference.
///
/// `display` is always render-safe: an absent reference yields `""`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Labeled<T> {
  pub valor: Option<T>,
  pub display: String,
}

impl<T> Default for Labeled<T> {
  fn default() -> Self {
    Self {
      valor: None,
      display: String::new(),
    }
  }
}

impl<T: Reference> Labeled<T> {
  /// Project using the object's own label.
  pub fn from_ref(reference: Option<Ref<T>>) -> Self {
    Self::from_ref_with(reference, T::label)
  }

  /// Project with a field-specific label rule.
  pub fn from_ref_with(reference: Option<Ref<T>>, label: impl Fn(&T) -> String) -> Self {
    match reference {
      Some(r) => {
        let obj = r.into_object();
        Self {
          display: label(&obj),
          valor: Some(obj),
        }
      }
      None => Self::default(),
    }
  }

  /// Project, hydrating bare ids through `lookup` when it knows them.
  pub fn resolve(reference: Option<Ref<T>>, lookup: impl Fn(i64) -> Option<T>) -> Self {
    let hydrated = reference.map(|r| match r {
      Ref::Id(id) => lookup(id).map_or(Ref::Id(id), Ref::Hydrated),
      other => other,
    });
    Self::from_ref(hydrated)
  }

  pub fn id(&self) -> Option<i64> {
    self.valor.as_ref().map(Reference::id)
  }
}
