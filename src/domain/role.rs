//! Roles.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cache::Record;
use crate::project::{Policy, ProjectionContext, Projector};

#[derive(Debug, Clone, Deserialize)]
pub struct RawRole {
  pub id: i64,
  #[serde(rename = "nombre", default)]
  pub name: String,
  #[serde(rename = "descripcion")]
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleRecord {
  #[serde(rename = "nombre")]
  pub name: String,
  #[serde(rename = "descripcion")]
  pub description: String,
}

impl Record for RoleRecord {
  fn field(&self, name: &str) -> Option<Value> {
    match name {
      "nombre" => Some(Value::from(self.name.as_str())),
      "descripcion" => Some(Value::from(self.description.as_str())),
      _ => None,
    }
  }

  fn payload(&self) -> Value {
    json!({ "nombre": self.name, "descripcion": self.description })
  }
}

/// Roles are never editable, only created and removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleProjector;

impl Projector for RoleProjector {
  type Raw = RawRole;
  type Output = RoleRecord;

  const POLICY: Policy = Policy {
    editable: false,
    eliminable: true,
  };

  fn raw_id(raw: &RawRole) -> i64 {
    raw.id
  }

  fn project_fields(&self, raw: RawRole, _ctx: &ProjectionContext) -> RoleRecord {
    RoleRecord {
      name: raw.name,
      description: raw.description.unwrap_or_default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::project::DisplayOptions;

  #[test]
  fn test_roles_are_never_editable() {
    let raw: RawRole = serde_json::from_value(json!({ "id": 2, "nombre": "Aprobador" })).unwrap();
    let entity = RoleProjector.project(raw, &DisplayOptions::default().context());

    assert!(!entity.editable);
    assert!(entity.eliminable);
    assert_eq!(entity.codigo, 2);
    assert_eq!(entity.data.description, "");
  }
}
