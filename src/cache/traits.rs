//! Core traits and types for the paginated cache.

use color_eyre::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;

use super::query::PageWindow;
use crate::api::{PageRequest, PageResponse};
use crate::project::Entity;

/// Display-ready record held by the cache.
pub trait Record: Clone + Send + Sync + 'static {
  /// Field value by wire name, used for local sort and filter.
  fn field(&self, name: &str) -> Option<Value>;

  /// Write shape sent to the server (references reduced to ids).
  fn payload(&self) -> Value;
}

/// A paginated collection endpoint plus its mutation endpoints.
///
/// Errors carrying a backend status are `crate::error::ApiError` reports.
pub trait CollectionEndpoint: Send + Sync + 'static {
  type Raw: DeserializeOwned + Send + 'static;

  fn list(
    &self,
    request: &PageRequest,
  ) -> impl Future<Output = Result<PageResponse<Self::Raw>>> + Send;

  fn fetch(&self, id: i64) -> impl Future<Output = Result<Self::Raw>> + Send;

  fn create(&self, payload: &Value) -> impl Future<Output = Result<Self::Raw>> + Send;

  fn update(&self, id: i64, payload: &Value) -> impl Future<Output = Result<Self::Raw>> + Send;

  fn delete(&self, id: i64) -> impl Future<Output = Result<()>> + Send;
}

/// A page served by the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
  pub entities: Vec<Entity<T>>,
  pub window: PageWindow,
  /// Row count of the view the page was cut from
  pub total: usize,
  pub source: PageSource,
  /// Collection generation after serving this page
  pub generation: u64,
}

/// Where a page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
  /// Fetched and merged
  Network,
  /// Already materialized, served as is
  Resident,
  /// Re-sorted or re-filtered from the complete resident collection
  Local,
  /// Fetched under a query that was replaced or reset meanwhile; not merged
  Superseded,
}

/// Whether an edited entity is still on the page the caller was viewing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
  Visible(usize),
  /// Saved, but its new sort position is on another page
  Moved,
}

impl Placement {
  /// Page number, or `-1` when the entity moved off the page.
  pub fn page(&self) -> i64 {
    match self {
      Placement::Visible(page) => *page as i64,
      Placement::Moved => -1,
    }
  }
}

/// Result of `PaginatedCache::edit`.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome<T> {
  pub entity: Entity<T>,
  pub placement: Placement,
  pub page_entities: Vec<Entity<T>>,
}
