//! Paginated cache that mirrors a server-side sortable, filterable collection.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::detector::ChangeDetector;
use super::local::{matches_filter, sort_entities};
use super::query::{Filter, FilterArg, PageQuery, PageWindow, QueryState, SortOrder};
use super::sparse::SparseCollection;
use super::traits::{
  CollectionEndpoint, EditOutcome, PageResult, PageSource, Placement, Record,
};
use crate::api::PageRequest;
use crate::error::is_not_found;
use crate::project::{DisplayOptions, Entity, Projector};

/// How a page request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
  /// Nothing changed and the page is materialized
  Resident,
  /// The whole collection is resident; re-sort/re-filter it locally
  Local,
  Server,
}

#[derive(Debug)]
struct Plan {
  order: Option<SortOrder>,
  filter: Option<Filter>,
  order_changed: bool,
  filter_changed: bool,
  route: Route,
}

impl Plan {
  fn query_state(&self) -> QueryState {
    QueryState {
      order: self.order.clone(),
      filter: self.filter.clone(),
    }
  }
}

struct State<T> {
  collection: SparseCollection<Entity<T>>,
  /// Locally filtered view of a complete collection
  search: Option<Vec<Entity<T>>>,
  order: Option<SortOrder>,
  filter: Option<Filter>,
  /// Filter the canonical collection was fetched under
  server_filter: Option<Filter>,
  /// At least one response has been merged since the last reset
  loaded: bool,
  /// Last sequence number handed out
  issued: u64,
  /// Bumped whenever a request goes out under a different order/filter, and
  /// on reset. Only responses of the current epoch are merged.
  epoch: u64,
  /// Order and filter of the newest request or local re-sort
  issued_query: QueryState,
  generation: u64,
}

impl<T> Default for State<T> {
  fn default() -> Self {
    Self {
      collection: SparseCollection::new(),
      search: None,
      order: None,
      filter: None,
      server_filter: None,
      loaded: false,
      issued: 0,
      epoch: 0,
      issued_query: QueryState::default(),
      generation: 0,
    }
  }
}

impl<T: Record> State<T> {
  fn plan(&self, query: &PageQuery, window: PageWindow) -> Plan {
    let order_changed = query
      .order
      .as_ref()
      .is_some_and(|o| !ChangeDetector::order_matches(o, self.order.as_ref()));
    let order = query.order.clone().or_else(|| self.order.clone());

    let (filter, filter_changed) = match &query.filter {
      FilterArg::Keep => (self.filter.clone(), false),
      FilterArg::Clear => (None, true),
      FilterArg::Set(f) if ChangeDetector::filter_matches(f, self.filter.as_ref()) => {
        (self.filter.clone(), false)
      }
      FilterArg::Set(f) => {
        let f = f.normalized();
        ((!f.is_empty()).then_some(f), true)
      }
    };

    let unchanged = !order_changed && !filter_changed;
    let route = if !query.force_refresh && unchanged && self.has_page(window) {
      Route::Resident
    } else if !query.force_refresh && self.locally_servable(window, filter_changed) {
      Route::Local
    } else {
      Route::Server
    };

    Plan {
      order,
      filter,
      order_changed,
      filter_changed,
      route,
    }
  }

  fn has_page(&self, window: PageWindow) -> bool {
    if self.search.is_some() {
      return true;
    }
    let range = window.range(self.collection.len());
    self.loaded && self.collection.is_range_materialized(range)
  }

  /// The whole result set fits in one page and is resident. A filter change
  /// additionally needs a canonical collection fetched without a filter.
  fn locally_servable(&self, window: PageWindow, filter_changed: bool) -> bool {
    let len = self.collection.len();
    self.loaded
      && len > 0
      && (window.page_size == 0 || len <= window.page_size)
      && self.collection.is_complete()
      && (!filter_changed || self.server_filter.is_none())
  }

  fn view_len(&self) -> usize {
    self
      .search
      .as_ref()
      .map_or(self.collection.len(), Vec::len)
  }

  fn view_page(&self, window: PageWindow) -> Vec<Entity<T>> {
    let range = window.range(self.view_len());
    match &self.search {
      Some(search) => search[range].to_vec(),
      None => self.collection.slice(range),
    }
  }

  fn apply_local(&mut self, plan: &Plan) {
    if plan.order_changed {
      if let Some(order) = &plan.order {
        let collection = std::mem::take(&mut self.collection);
        self.collection = match collection.into_complete() {
          Ok(mut items) => {
            sort_entities(&mut items, order);
            SparseCollection::from(items)
          }
          Err(partial) => partial,
        };
      }
    }
    self.order = plan.order.clone();
    self.filter = plan.filter.clone();
    self.epoch_for(plan);

    self.search = self.filter.as_ref().map(|filter| {
      self
        .collection
        .materialized()
        .filter(|e| matches_filter(e, filter))
        .cloned()
        .collect()
    });

    if plan.order_changed || plan.filter_changed {
      self.generation += 1;
    }
  }

  /// Epoch a request for `plan` belongs to. Requests under the same order
  /// and filter share an epoch, so their responses all merge in any order.
  fn epoch_for(&mut self, plan: &Plan) -> u64 {
    let query = plan.query_state();
    if query != self.issued_query {
      self.epoch += 1;
      self.issued_query = query;
    }
    self.epoch
  }

  /// Whether a response issued in `epoch` may still be merged.
  fn accepts(&self, epoch: u64) -> bool {
    epoch == self.epoch
  }

  fn merge(&mut self, plan: &Plan, window: PageWindow, rows: Vec<Entity<T>>, total: usize) {
    // Slot identity only holds under the order and filter it was fetched with.
    let invalidated =
      !self.loaded || plan.order != self.order || plan.filter != self.server_filter;
    if invalidated {
      self.collection = SparseCollection::with_holes(total);
    }
    self.collection.splice_page(window.offset(), rows, total);

    self.order = plan.order.clone();
    self.filter = plan.filter.clone();
    self.server_filter = plan.filter.clone();
    self.search = None;
    self.loaded = true;
    self.generation += 1;
  }

  fn index_of(&self, id: i64) -> Option<usize> {
    self.collection.position(|e| e.id == id)
  }

  fn replace(&mut self, entity: &Entity<T>) -> bool {
    let mut replaced = false;
    if let Some(slot) = self
      .index_of(entity.id)
      .and_then(|i| self.collection.get_mut(i))
    {
      *slot = entity.clone();
      replaced = true;
    }
    if let Some(search) = &mut self.search {
      if let Some(slot) = search.iter_mut().find(|e| e.id == entity.id) {
        *slot = entity.clone();
      }
    }
    if replaced {
      self.generation += 1;
    }
    replaced
  }

  fn remove(&mut self, id: i64) -> bool {
    let removed = match self.index_of(id) {
      Some(index) => self.collection.remove_at(index).is_some(),
      None => false,
    };
    if let Some(search) = &mut self.search {
      search.retain(|e| e.id != id);
    }
    if removed {
      self.generation += 1;
    }
    removed
  }

  fn append(&mut self, entity: Entity<T>) {
    if let (Some(search), Some(filter)) = (&mut self.search, &self.filter) {
      if matches_filter(&entity, filter) {
        search.push(entity.clone());
      }
    }
    self.collection.push(entity);
    self.generation += 1;
  }
}

/// Client-side mirror of one paginated collection endpoint.
///
/// Clones share the same canonical collection, so a mutation made through one
/// handle is visible to every other consumer. No lock is held across a
/// request. Concurrent page requests under one order and filter all merge,
/// later arrivals overwriting earlier slots; a response issued under a query
/// that has since been replaced, or before a reset, is discarded.
pub struct PaginatedCache<P: Projector, E> {
  inner: Arc<Inner<P, E>>,
}

struct Inner<P: Projector, E> {
  endpoint: E,
  projector: P,
  display: DisplayOptions,
  page_size: usize,
  state: Mutex<State<P::Output>>,
  generation_tx: watch::Sender<u64>,
}

impl<P, E> PaginatedCache<P, E>
where
  P: Projector,
  E: CollectionEndpoint<Raw = P::Raw>,
{
  pub fn new(endpoint: E, projector: P) -> Self {
    let (generation_tx, _) = watch::channel(0);
    Self {
      inner: Arc::new(Inner {
        endpoint,
        projector,
        display: DisplayOptions::default(),
        page_size: 10,
        state: Mutex::new(State::default()),
        generation_tx,
      }),
    }
  }

  /// Default page size for requests that don't name one.
  pub fn with_page_size(self, page_size: usize) -> Self {
    self.reconfigure(|inner| inner.page_size = page_size)
  }

  pub fn with_display(self, display: DisplayOptions) -> Self {
    self.reconfigure(|inner| inner.display = display)
  }

  fn reconfigure(self, apply: impl FnOnce(&mut Inner<P, E>)) -> Self {
    match Arc::try_unwrap(self.inner) {
      Ok(mut inner) => {
        apply(&mut inner);
        Self {
          inner: Arc::new(inner),
        }
      }
      // Already shared: settings are fixed once consumers hold a handle.
      Err(inner) => Self { inner },
    }
  }

  pub fn endpoint(&self) -> &E {
    &self.inner.endpoint
  }

  pub fn page_size(&self) -> usize {
    self.inner.page_size
  }

  fn state(&self) -> Result<MutexGuard<'_, State<P::Output>>> {
    self
      .inner
      .state
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  fn publish(&self, generation: u64) {
    self.inner.generation_tx.send_replace(generation);
  }

  /// Receiver notified with the new generation whenever the collection changes.
  pub fn subscribe(&self) -> watch::Receiver<u64> {
    self.inner.generation_tx.subscribe()
  }

  /// Get a page, from resident data when possible.
  ///
  /// 1. Unchanged order/filter with the page materialized: served as is
  /// 2. Complete collection that fits in one page: sorted/filtered locally
  /// 3. Otherwise fetched and merged at the page offset
  ///
  /// A failed fetch leaves the cache untouched.
  pub async fn get_page(&self, query: PageQuery) -> Result<PageResult<P::Output>> {
    let window = PageWindow::new(query.page, query.page_size.unwrap_or(self.inner.page_size));

    let (plan, seq, epoch) = {
      let mut state = self.state()?;
      let plan = state.plan(&query, window);
      debug!(
        page = window.page_number,
        page_size = window.page_size,
        route = ?plan.route,
        order_changed = plan.order_changed,
        filter_changed = plan.filter_changed,
        "page request classified"
      );

      match plan.route {
        Route::Resident => {
          return Ok(PageResult {
            entities: state.view_page(window),
            window,
            total: state.view_len(),
            source: PageSource::Resident,
            generation: state.generation,
          });
        }
        Route::Local => {
          state.apply_local(&plan);
          let generation = state.generation;
          let result = PageResult {
            entities: state.view_page(window),
            window,
            total: state.view_len(),
            source: PageSource::Local,
            generation,
          };
          drop(state);
          if plan.order_changed || plan.filter_changed {
            self.publish(generation);
          }
          return Ok(result);
        }
        Route::Server => {
          state.issued += 1;
          let epoch = state.epoch_for(&plan);
          (plan, state.issued, epoch)
        }
      }
    };

    let request = PageRequest::new(window, plan.order.as_ref(), plan.filter.as_ref());
    debug!(seq, epoch, ?request, "fetching page");
    let response = self.inner.endpoint.list(&request).await?;

    let total = response.total();
    let ctx = self.inner.display.context();
    let entities: Vec<Entity<P::Output>> = response
      .data
      .into_iter()
      .map(|raw| self.inner.projector.project(raw, &ctx))
      .collect();

    let mut state = self.state()?;
    if !state.accepts(epoch) {
      warn!(seq, epoch, current = state.epoch, "discarding superseded page response");
      return Ok(PageResult {
        entities,
        window,
        total,
        source: PageSource::Superseded,
        generation: state.generation,
      });
    }

    state.merge(&plan, window, entities.clone(), total);
    let generation = state.generation;
    let holes = state.collection.holes();
    drop(state);
    self.publish(generation);
    debug!(seq, total, holes, rows = entities.len(), generation, "merged page");

    Ok(PageResult {
      entities,
      window,
      total,
      source: PageSource::Network,
      generation,
    })
  }

  fn check(&self, id: Option<i64>, payload: &Value) -> Result<()> {
    let state = self.state()?;
    let resident: Vec<&Entity<P::Output>> = state.collection.materialized().collect();
    self.inner.projector.validate(id, payload, &resident)?;
    Ok(())
  }

  /// Create on the server and append the projected row.
  ///
  /// The new row is not placed at its sorted position; re-query the page if
  /// placement matters.
  pub async fn create(&self, payload: Value) -> Result<Entity<P::Output>> {
    self.check(None, &payload)?;

    let raw = self.inner.endpoint.create(&payload).await?;
    let entity = self.inner.projector.project(raw, &self.inner.display.context());

    let generation = {
      let mut state = self.state()?;
      state.append(entity.clone());
      state.generation
    };
    self.publish(generation);
    debug!(id = entity.id, "appended created entity");

    Ok(entity)
  }

  /// Update on the server, then re-fetch the window the caller was viewing
  /// (page number and page size) to find out whether the entity is still on it.
  ///
  /// A 404 purges the entity locally and is still returned as an error. Any
  /// other rejection leaves the cache untouched.
  pub async fn edit(
    &self,
    entity: &Entity<P::Output>,
    viewing: PageWindow,
  ) -> Result<EditOutcome<P::Output>> {
    let payload = entity.data.payload();
    self.check(Some(entity.id), &payload)?;

    let raw = match self.inner.endpoint.update(entity.id, &payload).await {
      Ok(raw) => raw,
      Err(e) => {
        if is_not_found(&e) {
          self.purge(entity.id)?;
        }
        return Err(e);
      }
    };

    let updated = self.inner.projector.project(raw, &self.inner.display.context());
    let generation = {
      let mut state = self.state()?;
      state.replace(&updated);
      state.generation
    };
    self.publish(generation);

    let query = PageQuery::page(viewing.page_number)
      .page_size(viewing.page_size)
      .force_refresh();
    let page = self.get_page(query).await?;

    let placement = if page.entities.iter().any(|e| e.id == updated.id) {
      Placement::Visible(page.window.page_number)
    } else {
      info!(
        id = updated.id,
        page = page.window.page_number,
        "edited entity moved off page"
      );
      Placement::Moved
    };

    Ok(EditOutcome {
      entity: updated,
      placement,
      page_entities: page.entities,
    })
  }

  /// Delete on the server and splice the slot out.
  ///
  /// A 404 means the entity is already gone: it is removed the same way and
  /// no error is returned.
  pub async fn delete(&self, entity: &Entity<P::Output>) -> Result<()> {
    match self.inner.endpoint.delete(entity.id).await {
      Ok(()) => {}
      Err(e) if is_not_found(&e) => {
        warn!(id = entity.id, "entity already deleted on server");
      }
      Err(e) => return Err(e),
    }
    self.purge(entity.id)?;
    Ok(())
  }

  /// Fetch one entity by id and refresh its resident slot.
  ///
  /// A 404 purges the entity locally and is still returned as an error.
  pub async fn fetch(&self, id: i64) -> Result<Entity<P::Output>> {
    let raw = match self.inner.endpoint.fetch(id).await {
      Ok(raw) => raw,
      Err(e) => {
        if is_not_found(&e) {
          self.purge(id)?;
        }
        return Err(e);
      }
    };

    let entity = self.inner.projector.project(raw, &self.inner.display.context());
    let generation = {
      let mut state = self.state()?;
      state.replace(&entity).then_some(state.generation)
    };
    if let Some(generation) = generation {
      self.publish(generation);
    }
    Ok(entity)
  }

  fn purge(&self, id: i64) -> Result<()> {
    let generation = {
      let mut state = self.state()?;
      if !state.remove(id) {
        debug!(id, "purged entity was not resident");
      }
      state.generation
    };
    self.publish(generation);
    Ok(())
  }

  /// Drop everything: collection, order and filter. Responses still in
  /// flight will not be merged.
  pub fn reset(&self) -> Result<()> {
    let generation = {
      let mut state = self.state()?;
      let (issued, epoch) = (state.issued, state.epoch + 1);
      let generation = state.generation + 1;
      *state = State {
        issued,
        epoch,
        generation,
        ..State::default()
      };
      generation
    };
    self.publish(generation);
    info!(generation, "cache reset");
    Ok(())
  }

  /// Row count reported by the last server response (plus local mutations).
  pub fn total(&self) -> Result<usize> {
    Ok(self.state()?.collection.len())
  }

  pub fn generation(&self) -> Result<u64> {
    Ok(self.state()?.generation)
  }

  /// Remembered order and filter.
  pub fn query_state(&self) -> Result<QueryState> {
    let state = self.state()?;
    Ok(QueryState {
      order: state.order.clone(),
      filter: state.filter.clone(),
    })
  }

  /// Snapshot of the canonical slots; `None` marks a hole.
  pub fn resident(&self) -> Result<Vec<Option<Entity<P::Output>>>> {
    Ok(self.state()?.collection.slots().to_vec())
  }

  pub fn find(&self, id: i64) -> Result<Option<Entity<P::Output>>> {
    let state = self.state()?;
    let found = state.collection.materialized().find(|e| e.id == id).cloned();
    Ok(found)
  }
}

impl<P: Projector, E> Clone for PaginatedCache<P, E> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}
