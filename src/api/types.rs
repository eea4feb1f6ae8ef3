//! Wire types of the collection endpoint contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{Filter, PageWindow, SortOrder};

/// Parameters of one page request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
  pub page_number: usize,
  /// 0 means "all in one page"
  pub page_size: usize,
  /// Signed sort field (`-field` for descending)
  pub sort_field: Option<String>,
  pub filter: Filter,
}

impl PageRequest {
  pub fn new(window: PageWindow, order: Option<&SortOrder>, filter: Option<&Filter>) -> Self {
    Self {
      page_number: window.page_number,
      page_size: window.page_size,
      sort_field: order.map(SortOrder::to_param),
      filter: filter.map(Filter::normalized).unwrap_or_default(),
    }
  }

  /// Query-string pairs; filter keys are merged in next to the paging keys.
  pub fn query_pairs(&self) -> Vec<(String, String)> {
    let mut pairs = vec![
      ("pageNumber".to_string(), self.page_number.to_string()),
      ("pageSize".to_string(), self.page_size.to_string()),
    ];
    if let Some(sort) = &self.sort_field {
      pairs.push(("sortField".to_string(), sort.clone()));
    }
    for (key, value) in self.filter.active() {
      pairs.push((key.to_string(), param_value(value)));
    }
    pairs
  }
}

fn param_value(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Array(items) => items
      .iter()
      .map(param_value)
      .collect::<Vec<_>>()
      .join(","),
    other => other.to_string(),
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
  #[serde(rename = "cantidadTotal", default)]
  pub cantidad_total: usize,
}

/// `{data, metadata: {cantidadTotal}}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageResponse<R> {
  #[serde(default = "Vec::new")]
  pub data: Vec<R>,
  #[serde(default)]
  pub metadata: Metadata,
}

impl<R> PageResponse<R> {
  pub fn new(data: Vec<R>, total: usize) -> Self {
    Self {
      data,
      metadata: Metadata {
        cantidad_total: total,
      },
    }
  }

  pub fn total(&self) -> usize {
    self.metadata.cantidad_total
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_query_pairs() {
    let filter = Filter::new()
      .with("estado", "pendiente")
      .with("solicitante", 42)
      .with("flujo", Value::Null);
    let order = SortOrder::desc("fecha");
    let request = PageRequest::new(PageWindow::new(2, 10), Some(&order), Some(&filter));

    assert_eq!(
      request.query_pairs(),
      vec![
        ("pageNumber".to_string(), "2".to_string()),
        ("pageSize".to_string(), "10".to_string()),
        ("sortField".to_string(), "-fecha".to_string()),
        ("estado".to_string(), "pendiente".to_string()),
        ("solicitante".to_string(), "42".to_string()),
      ]
    );
  }

  #[test]
  fn test_response_parses_total() {
    let body = r#"{"data": [1, 2, 3], "metadata": {"cantidadTotal": 25}}"#;
    let response: PageResponse<i64> = serde_json::from_str(body).unwrap();
    assert_eq!(response.data, vec![1, 2, 3]);
    assert_eq!(response.total(), 25);
  }

  #[test]
  fn test_response_defaults() {
    let response: PageResponse<i64> = serde_json::from_str("{}").unwrap();
    assert!(response.data.is_empty());
    assert_eq!(response.total(), 0);
  }
}
