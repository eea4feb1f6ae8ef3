//! Client-side sparse paginated cache.
//!
//! This module mirrors a server-side paginated, sortable, filterable
//! collection:
//! - Keeps a sparse array sized to the server-reported total, with holes for
//!   rows not fetched yet
//! - Serves repeated pages from resident data, and re-sorts/re-filters locally
//!   only when the whole collection is resident
//! - Patches itself after create/edit/delete without a full reload
//! - Discards responses overtaken by newer requests or a reset

mod detector;
mod layer;
mod local;
mod query;
mod sparse;
mod traits;

#[cfg(test)]
pub(crate) mod fixtures;

pub use detector::ChangeDetector;
pub use layer::PaginatedCache;
pub use local::{compare_values, matches_filter, sort_entities, values_equal};
pub use query::{Direction, Filter, FilterArg, PageQuery, PageWindow, QueryState, SortOrder};
pub use sparse::SparseCollection;
pub use traits::{
  CollectionEndpoint, EditOutcome, PageResult, PageSource, Placement, Record,
};
