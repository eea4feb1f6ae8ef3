//! Change detection for sort/filter proposals.
//!
//! Used at call sites to avoid firing a request when the user repeats an
//! identical search or re-selects the same sort column, and by the cache to
//! decide whether a supplied filter replaces the remembered one.

use serde_json::Value;

use super::local::values_equal;
use super::query::{Filter, QueryState, SortOrder};

/// Classifies a proposed `(order, filter)` pair against a remembered one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
  /// Whether `proposed` needs a round-trip given `previous`.
  ///
  /// Returns `false` only when both the order and the filter are unchanged.
  /// Omitted parts of the proposal count as unchanged.
  pub fn should_query(previous: &QueryState, proposed: &QueryState) -> bool {
    let order_changed = proposed
      .order
      .as_ref()
      .is_some_and(|order| !Self::order_matches(order, previous.order.as_ref()));

    let filter_changed = proposed
      .filter
      .as_ref()
      .is_some_and(|filter| !Self::filter_matches(filter, previous.filter.as_ref()));

    order_changed || filter_changed
  }

  /// Full-tuple equality on `(field, direction)`.
  pub fn order_matches(proposed: &SortOrder, previous: Option<&SortOrder>) -> bool {
    previous == Some(proposed)
  }

  /// Subset match: every key present in `proposed` must equal the same key in
  /// `previous`. Keys only present in `previous` are ignored. A missing key on
  /// either side reads as `null`, so an explicitly cleared key matches an
  /// absent one but not a set one.
  pub fn filter_matches(proposed: &Filter, previous: Option<&Filter>) -> bool {
    proposed.entries().all(|(key, value)| {
      let remembered = previous.and_then(|f| f.get(key)).unwrap_or(&Value::Null);
      values_equal(value, remembered)
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn state(order: Option<SortOrder>, filter: Option<Filter>) -> QueryState {
    QueryState { order, filter }
  }

  #[test]
  fn test_identical_proposal_is_suppressed() {
    let previous = state(
      Some(SortOrder::asc("nombre")),
      Some(Filter::new().with("estado", "pendiente")),
    );
    assert!(!ChangeDetector::should_query(&previous, &previous.clone()));
  }

  #[test]
  fn test_empty_proposal_is_suppressed() {
    let previous = state(Some(SortOrder::asc("nombre")), None);
    assert!(!ChangeDetector::should_query(&previous, &QueryState::default()));
  }

  #[test]
  fn test_order_direction_change_queries() {
    let previous = state(Some(SortOrder::asc("nombre")), None);
    let proposed = state(Some(SortOrder::desc("nombre")), None);
    assert!(ChangeDetector::should_query(&previous, &proposed));

    let proposed = state(Some(SortOrder::asc("fecha")), None);
    assert!(ChangeDetector::should_query(&previous, &proposed));
  }

  #[test]
  fn test_omitted_filter_keys_are_tolerated() {
    let previous = state(
      None,
      Some(
        Filter::new()
          .with("estado", "pendiente")
          .with("solicitante", 42),
      ),
    );
    let proposed = state(None, Some(Filter::new().with("estado", "pendiente")));
    assert!(!ChangeDetector::should_query(&previous, &proposed));
  }

  #[test]
  fn test_tightening_filter_queries() {
    let previous = state(None, Some(Filter::new().with("estado", "pendiente")));
    let proposed = state(
      None,
      Some(
        Filter::new()
          .with("estado", "pendiente")
          .with("solicitante", 42),
      ),
    );
    assert!(ChangeDetector::should_query(&previous, &proposed));
  }

  #[test]
  fn test_loosening_filter_queries() {
    let previous = state(
      None,
      Some(
        Filter::new()
          .with("estado", "pendiente")
          .with("solicitante", 42),
      ),
    );
    let proposed = state(
      None,
      Some(
        Filter::new()
          .with("estado", "pendiente")
          .with("solicitante", Value::Null),
      ),
    );
    assert!(ChangeDetector::should_query(&previous, &proposed));
  }

  #[test]
  fn test_cleared_key_matches_absent_key() {
    let previous = state(None, Some(Filter::new().with("estado", "pendiente")));
    let proposed = state(
      None,
      Some(
        Filter::new()
          .with("estado", "pendiente")
          .with("solicitante", Value::Null),
      ),
    );
    assert!(!ChangeDetector::should_query(&previous, &proposed));
  }

  #[test]
  fn test_numeric_values_compare_by_value() {
    let previous = state(None, Some(Filter::new().with("solicitante", json!(42))));
    let proposed = state(None, Some(Filter::new().with("solicitante", json!(42.0))));
    assert!(!ChangeDetector::should_query(&previous, &proposed));
  }
}
