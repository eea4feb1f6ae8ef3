//! Entity types of the approval console and their projectors.

mod activity;
mod request;
mod role;
mod staff;

pub use activity::{Activity, ActivityProjector, RawActivity};
pub use request::{
  Authorization, AuthorizationProjector, RawAuthorization, RawRequest, Request, RequestProjector,
};
pub use role::{RawRole, RoleProjector, RoleRecord};
pub use staff::{RawStaffMember, StaffMember, StaffProjector};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::project::{DateLabel, Labeled, Reference};

/// A person referenced by other records (requester, authorizer...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
  pub id: i64,
  #[serde(rename = "nombre", default)]
  pub first_name: String,
  #[serde(rename = "apellido", default)]
  pub last_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

impl Reference for Person {
  fn from_id(id: i64) -> Self {
    Self {
      id,
      first_name: String::new(),
      last_name: String::new(),
      email: None,
    }
  }

  fn id(&self) -> i64 {
    self.id
  }

  fn label(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
      .trim()
      .to_string()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
  pub id: i64,
  #[serde(rename = "nombre", default)]
  pub name: String,
}

impl Reference for Role {
  fn from_id(id: i64) -> Self {
    Self {
      id,
      name: String::new(),
    }
  }

  fn id(&self) -> i64 {
    self.id
  }

  fn label(&self) -> String {
    self.name.clone()
  }
}

/// An approval workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  pub id: i64,
  #[serde(rename = "nombre", default)]
  pub name: String,
}

impl Reference for Workflow {
  fn from_id(id: i64) -> Self {
    Self {
      id,
      name: String::new(),
    }
  }

  fn id(&self) -> i64 {
    self.id
  }

  fn label(&self) -> String {
    self.name.clone()
  }
}

/// Request status ("pendiente", "aprobada"...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
  pub id: i64,
  #[serde(rename = "nombre", default)]
  pub name: String,
}

impl Reference for Status {
  fn from_id(id: i64) -> Self {
    Self {
      id,
      name: String::new(),
    }
  }

  fn id(&self) -> i64 {
    self.id
  }

  fn label(&self) -> String {
    self.name.clone()
  }
}

/// Foreign key of a labeled reference, `null` when absent.
fn ref_id<T: Reference>(labeled: &Labeled<T>) -> Value {
  labeled.id().map_or(Value::Null, Value::from)
}

/// Sortable form of a projected date.
fn date_value(date: &DateLabel) -> Value {
  date
    .valor
    .map_or(Value::Null, |d| Value::from(d.format("%Y-%m-%dT%H:%M:%S").to_string()))
}
