//! Projection of raw server records into display-ready entities.
//!
//! A projector consumes the raw record by value, so a record is projected
//! exactly once and an already-projected entity cannot be fed back in.

mod date;
mod labeled;

pub use date::{parse_date, DateLabel};
pub use labeled::{Labeled, Ref, Reference};

use chrono::{Local, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::Record;
use crate::error::ValidationError;

/// Entity-type-level flags; never derived from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
  pub editable: bool,
  pub eliminable: bool,
}

/// A projected record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity<T> {
  pub id: i64,
  /// Mirror of `id` for the display layer
  pub codigo: i64,
  pub editable: bool,
  pub eliminable: bool,
  #[serde(flatten)]
  pub data: T,
}

impl<T: Record> Entity<T> {
  /// Field value used for local sort and filter.
  pub fn field(&self, name: &str) -> Option<Value> {
    match name {
      "id" | "codigo" => Some(Value::from(self.id)),
      _ => self.data.field(name),
    }
  }
}

/// Date formatting settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
  /// chrono format pattern for dates older than yesterday
  pub date_format: String,
  pub today_label: String,
  pub yesterday_label: String,
}

impl Default for DisplayOptions {
  fn default() -> Self {
    Self {
      date_format: "%d/%m/%Y".to_string(),
      today_label: "Today".to_string(),
      yesterday_label: "Yesterday".to_string(),
    }
  }
}

impl DisplayOptions {
  /// Context evaluated against the current local time.
  pub fn context(&self) -> ProjectionContext {
    self.context_at(Local::now().naive_local())
  }

  pub fn context_at(&self, now: NaiveDateTime) -> ProjectionContext {
    ProjectionContext {
      now,
      options: self.clone(),
    }
  }
}

/// Inputs of one projection pass.
#[derive(Debug, Clone)]
pub struct ProjectionContext {
  pub now: NaiveDateTime,
  pub options: DisplayOptions,
}

/// Projection rules for one entity type.
pub trait Projector: Send + Sync + 'static {
  /// Record shape as the server sends it
  type Raw: DeserializeOwned + Send + 'static;
  /// Display-ready shape
  type Output: Record;

  const POLICY: Policy;

  fn raw_id(raw: &Self::Raw) -> i64;

  fn project_fields(&self, raw: Self::Raw, ctx: &ProjectionContext) -> Self::Output;

  fn project(&self, raw: Self::Raw, ctx: &ProjectionContext) -> Entity<Self::Output> {
    let id = Self::raw_id(&raw);
    Entity {
      id,
      codigo: id,
      editable: Self::POLICY.editable,
      eliminable: Self::POLICY.eliminable,
      data: self.project_fields(raw, ctx),
    }
  }

  /// Local check of a write payload against the resident collection.
  /// `id` is `None` for creations.
  fn validate(
    &self,
    _id: Option<i64>,
    _payload: &Value,
    _resident: &[&Entity<Self::Output>],
  ) -> Result<(), ValidationError> {
    Ok(())
  }
}
