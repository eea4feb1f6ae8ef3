//! Local sort and filter over resident entities.
//!
//! Only trusted when the whole collection is resident; the cache decides that.

use serde_json::Value;
use std::cmp::Ordering;

use super::query::{Direction, Filter, SortOrder};
use super::traits::Record;
use crate::project::Entity;

/// Equality that treats `42` and `42.0` as the same value.
pub fn values_equal(a: &Value, b: &Value) -> bool {
  match (a, b) {
    (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
    _ => a == b,
  }
}

fn type_rank(value: &Value) -> u8 {
  match value {
    Value::Null => 0,
    Value::Bool(_) => 1,
    Value::Number(_) => 2,
    Value::String(_) => 3,
    Value::Array(_) => 4,
    Value::Object(_) => 5,
  }
}

/// Ascending comparison of two field values.
///
/// Strings compare case-insensitively, other scalars by raw value, missing
/// values first.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  let a = a.unwrap_or(&Value::Null);
  let b = b.unwrap_or(&Value::Null);
  match (a, b) {
    (Value::String(x), Value::String(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
    (Value::Number(x), Value::Number(y)) => {
      let x = x.as_f64().unwrap_or(f64::NAN);
      let y = y.as_f64().unwrap_or(f64::NAN);
      x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    }
    (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
    _ => type_rank(a).cmp(&type_rank(b)),
  }
}

/// Stable sort by `order.field`; ties keep their prior relative order.
pub fn sort_entities<T: Record>(entities: &mut [Entity<T>], order: &SortOrder) {
  entities.sort_by(|a, b| {
    let ord = compare_values(
      a.field(&order.field).as_ref(),
      b.field(&order.field).as_ref(),
    );
    match order.direction {
      Direction::Asc => ord,
      Direction::Desc => ord.reverse(),
    }
  });
}

fn field_matches(field: &Value, wanted: &Value) -> bool {
  match (field, wanted) {
    (Value::Null, _) => false,
    (Value::Array(items), _) => items.iter().any(|item| field_matches(item, wanted)),
    (Value::String(have), Value::String(want)) => {
      have.to_lowercase().contains(&want.to_lowercase())
    }
    (Value::Number(_) | Value::Bool(_), Value::String(want)) => {
      field.to_string().eq_ignore_ascii_case(want.trim())
    }
    _ => values_equal(field, wanted),
  }
}

/// Whether `entity` satisfies every active key of `filter`.
pub fn matches_filter<T: Record>(entity: &Entity<T>, filter: &Filter) -> bool {
  filter.active().all(|(key, wanted)| {
    entity
      .field(key)
      .is_some_and(|field| field_matches(&field, wanted))
  })
}
