//! Query state types: sort order, filters, page windows and page requests.

use color_eyre::{eyre::eyre, Report, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Asc,
  Desc,
}

/// Active sort column and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
  pub field: String,
  pub direction: Direction,
}

impl SortOrder {
  pub fn asc(field: impl Into<String>) -> Self {
    Self {
      field: field.into(),
      direction: Direction::Asc,
    }
  }

  pub fn desc(field: impl Into<String>) -> Self {
    Self {
      field: field.into(),
      direction: Direction::Desc,
    }
  }

  /// Signed field string sent to the server (`-field` for descending).
  pub fn to_param(&self) -> String {
    match self.direction {
      Direction::Asc => self.field.clone(),
      Direction::Desc => format!("-{}", self.field),
    }
  }
}

impl fmt::Display for SortOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_param())
  }
}

impl FromStr for SortOrder {
  type Err = Report;

  fn from_str(s: &str) -> Result<Self> {
    let s = s.trim();
    let (field, direction) = match s.strip_prefix('-') {
      Some(rest) => (rest, Direction::Desc),
      None => (s.strip_prefix('+').unwrap_or(s), Direction::Asc),
    };
    if field.is_empty() {
      return Err(eyre!("Sort field is empty: '{}'", s));
    }
    Ok(Self {
      field: field.to_string(),
      direction,
    })
  }
}

/// Filter criteria keyed by wire field name.
///
/// A key holding `Value::Null` is an explicit "cleared" value: it takes part
/// in change detection but never in matching or in request parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(BTreeMap<String, Value>);

impl Filter {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style insert.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.0.insert(key.into(), value.into());
    self
  }

  pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
    self.0.insert(key.into(), value.into());
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  /// All keys, including explicitly cleared ones.
  pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }

  /// Keys with a non-null value.
  pub fn active(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.entries().filter(|(_, v)| !v.is_null())
  }

  /// True when no key carries a non-null value.
  pub fn is_empty(&self) -> bool {
    self.active().next().is_none()
  }

  /// Copy with cleared keys dropped.
  pub fn normalized(&self) -> Self {
    Self(
      self
        .active()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect(),
    )
  }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filter {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(
      iter
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
    )
  }
}

/// Remembered (or proposed) sort and filter.
///
/// When used as a proposal, `None` means "not supplied".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
  pub order: Option<SortOrder>,
  pub filter: Option<Filter>,
}

/// A page of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
  /// 1-based page number
  pub page_number: usize,
  /// Rows per page, 0 means the whole collection in one page
  pub page_size: usize,
}

impl PageWindow {
  pub fn new(page_number: usize, page_size: usize) -> Self {
    Self {
      page_number: page_number.max(1),
      page_size,
    }
  }

  /// Index of the first slot of this page.
  pub fn offset(&self) -> usize {
    if self.page_size == 0 {
      0
    } else {
      (self.page_number - 1) * self.page_size
    }
  }

  /// Slot range of this page clipped to a collection of `total` rows.
  pub fn range(&self, total: usize) -> Range<usize> {
    if self.page_size == 0 {
      return 0..total;
    }
    let start = self.offset().min(total);
    let end = (self.offset() + self.page_size).min(total);
    start..end
  }
}

/// What a page request does with the remembered filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FilterArg {
  /// Reuse the remembered filter
  #[default]
  Keep,
  /// Drop the remembered filter (always counts as a change)
  Clear,
  /// Replace the remembered filter unless it matches
  Set(Filter),
}

/// Arguments of `PaginatedCache::get_page`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageQuery {
  pub page: usize,
  pub order: Option<SortOrder>,
  pub filter: FilterArg,
  pub page_size: Option<usize>,
  pub force_refresh: bool,
}

impl PageQuery {
  /// Request `page` keeping the current order and filter.
  pub fn page(page: usize) -> Self {
    Self {
      page: page.max(1),
      order: None,
      filter: FilterArg::Keep,
      page_size: None,
      force_refresh: false,
    }
  }

  pub fn order(mut self, order: SortOrder) -> Self {
    self.order = Some(order);
    self
  }

  pub fn filter(mut self, filter: Filter) -> Self {
    self.filter = FilterArg::Set(filter);
    self
  }

  pub fn clear_filter(mut self) -> Self {
    self.filter = FilterArg::Clear;
    self
  }

  pub fn page_size(mut self, page_size: usize) -> Self {
    self.page_size = Some(page_size);
    self
  }

  pub fn force_refresh(mut self) -> Self {
    self.force_refresh = true;
    self
  }
}
