//! In-memory endpoint and a small record type for cache tests.

use color_eyre::{Report, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::local::{matches_filter, sort_entities};
use super::query::SortOrder;
use super::traits::{CollectionEndpoint, Record};
use crate::api::{PageRequest, PageResponse};
use crate::error::{ApiError, ValidationError};
use crate::project::{DisplayOptions, Entity, Policy, ProjectionContext, Projector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
  pub id: i64,
  pub nombre: String,
  pub orden: i64,
  pub grupo: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
  pub nombre: String,
  pub orden: i64,
  pub grupo: i64,
}

impl Record for Item {
  fn field(&self, name: &str) -> Option<Value> {
    match name {
      "nombre" => Some(json!(self.nombre)),
      "orden" => Some(json!(self.orden)),
      "grupo" => Some(json!(self.grupo)),
      _ => None,
    }
  }

  fn payload(&self) -> Value {
    json!({ "nombre": self.nombre, "orden": self.orden, "grupo": self.grupo })
  }
}

pub struct ItemProjector;

impl Projector for ItemProjector {
  type Raw = RawItem;
  type Output = Item;

  const POLICY: Policy = Policy {
    editable: true,
    eliminable: true,
  };

  fn raw_id(raw: &RawItem) -> i64 {
    raw.id
  }

  fn project_fields(&self, raw: RawItem, _ctx: &ProjectionContext) -> Item {
    Item {
      nombre: raw.nombre,
      orden: raw.orden,
      grupo: raw.grupo,
    }
  }

  fn validate(
    &self,
    id: Option<i64>,
    payload: &Value,
    resident: &[&Entity<Item>],
  ) -> Result<(), ValidationError> {
    let (Some(orden), Some(grupo)) = (payload["orden"].as_i64(), payload["grupo"].as_i64()) else {
      return Ok(());
    };
    match resident
      .iter()
      .find(|e| Some(e.id) != id && e.data.grupo == grupo && e.data.orden == orden)
    {
      Some(conflict) => Err(ValidationError::DuplicateOrder {
        orden,
        parent: grupo,
        conflicting_id: conflict.id,
      }),
      None => Ok(()),
    }
  }
}

/// Projected entity with default flags.
pub fn item(id: i64, nombre: &str, orden: i64) -> Entity<Item> {
  ItemProjector.project(raw_item(id, nombre, orden), &DisplayOptions::default().context())
}

pub fn raw_item(id: i64, nombre: &str, orden: i64) -> RawItem {
  RawItem {
    id,
    nombre: nombre.to_string(),
    orden,
    grupo: id % 3,
  }
}

/// Request counters per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calls {
  pub list: usize,
  pub fetch: usize,
  pub create: usize,
  pub update: usize,
  pub delete: usize,
}

#[derive(Default)]
struct Store {
  rows: Vec<RawItem>,
  next_id: i64,
  failures: VecDeque<ApiError>,
  delays: VecDeque<Duration>,
  calls: Calls,
}

impl Store {
  fn take_failure(&mut self) -> Result<()> {
    match self.failures.pop_front() {
      Some(err) => Err(Report::new(err)),
      None => Ok(()),
    }
  }

  fn find(&mut self, id: i64) -> Result<&mut RawItem> {
    self
      .rows
      .iter_mut()
      .find(|r| r.id == id)
      .ok_or_else(|| Report::new(ApiError::not_found()))
  }
}

/// Server double: filters, sorts and pages like the real backend.
#[derive(Clone, Default)]
pub struct MemoryEndpoint {
  store: Arc<Mutex<Store>>,
}

impl MemoryEndpoint {
  /// Rows `item-01..item-n` with `orden == id`.
  pub fn with_rows(n: i64) -> Self {
    Self::from_rows((1..=n).map(|id| raw_item(id, &format!("item-{:02}", id), id)).collect())
  }

  pub fn from_rows(rows: Vec<RawItem>) -> Self {
    let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
    Self {
      store: Arc::new(Mutex::new(Store {
        rows,
        next_id,
        ..Store::default()
      })),
    }
  }

  pub fn calls(&self) -> Calls {
    self.store.lock().unwrap().calls
  }

  pub fn fail_next(&self, err: ApiError) {
    self.store.lock().unwrap().failures.push_back(err);
  }

  pub fn delay_next(&self, delay: Duration) {
    self.store.lock().unwrap().delays.push_back(delay);
  }

  pub fn set_orden(&self, id: i64, orden: i64) {
    let mut store = self.store.lock().unwrap();
    if let Ok(row) = store.find(id) {
      row.orden = orden;
    }
  }

  pub fn remove_row(&self, id: i64) {
    self.store.lock().unwrap().rows.retain(|r| r.id != id);
  }

  fn page(&self, request: &PageRequest) -> (Result<PageResponse<RawItem>>, Duration) {
    let mut store = self.store.lock().unwrap();
    store.calls.list += 1;
    let delay = store.delays.pop_front().unwrap_or_default();
    if let Err(e) = store.take_failure() {
      return (Err(e), delay);
    }

    let ctx = DisplayOptions::default().context();
    let mut entities: Vec<Entity<Item>> = store
      .rows
      .iter()
      .cloned()
      .map(|raw| ItemProjector.project(raw, &ctx))
      .filter(|e| matches_filter(e, &request.filter))
      .collect();
    if let Some(sort) = &request.sort_field {
      sort_entities(&mut entities, &sort.parse::<SortOrder>().unwrap());
    }

    let total = entities.len();
    let (start, end) = if request.page_size == 0 {
      (0, total)
    } else {
      let start = ((request.page_number - 1) * request.page_size).min(total);
      (start, (start + request.page_size).min(total))
    };
    let data = entities[start..end]
      .iter()
      .map(|e| RawItem {
        id: e.id,
        nombre: e.data.nombre.clone(),
        orden: e.data.orden,
        grupo: e.data.grupo,
      })
      .collect();

    (Ok(PageResponse::new(data, total)), delay)
  }
}

impl CollectionEndpoint for MemoryEndpoint {
  type Raw = RawItem;

  async fn list(&self, request: &PageRequest) -> Result<PageResponse<RawItem>> {
    let (response, delay) = self.page(request);
    if !delay.is_zero() {
      tokio::time::sleep(delay).await;
    }
    response
  }

  async fn fetch(&self, id: i64) -> Result<RawItem> {
    let mut store = self.store.lock().unwrap();
    store.calls.fetch += 1;
    store.take_failure()?;
    store.find(id).map(|r| r.clone())
  }

  async fn create(&self, payload: &Value) -> Result<RawItem> {
    let mut store = self.store.lock().unwrap();
    store.calls.create += 1;
    store.take_failure()?;
    let row = RawItem {
      id: store.next_id,
      nombre: payload["nombre"].as_str().unwrap_or_default().to_string(),
      orden: payload["orden"].as_i64().unwrap_or_default(),
      grupo: payload["grupo"].as_i64().unwrap_or_default(),
    };
    store.next_id += 1;
    store.rows.push(row.clone());
    Ok(row)
  }

  async fn update(&self, id: i64, payload: &Value) -> Result<RawItem> {
    let mut store = self.store.lock().unwrap();
    store.calls.update += 1;
    store.take_failure()?;
    let row = store.find(id)?;
    if let Some(nombre) = payload["nombre"].as_str() {
      row.nombre = nombre.to_string();
    }
    if let Some(orden) = payload["orden"].as_i64() {
      row.orden = orden;
    }
    if let Some(grupo) = payload["grupo"].as_i64() {
      row.grupo = grupo;
    }
    Ok(row.clone())
  }

  async fn delete(&self, id: i64) -> Result<()> {
    let mut store = self.store.lock().unwrap();
    store.calls.delete += 1;
    store.take_failure()?;
    store.find(id)?;
    store.rows.retain(|r| r.id != id);
    Ok(())
  }
}
