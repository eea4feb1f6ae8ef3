//! Workflow activities, ordered within their workflow.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ref_id, Role, Workflow};
use crate::cache::Record;
use crate::error::ValidationError;
use crate::project::{Entity, Labeled, Policy, ProjectionContext, Projector, Ref};

#[derive(Debug, Clone, Deserialize)]
pub struct RawActivity {
  pub id: i64,
  #[serde(rename = "nombre", default)]
  pub name: String,
  #[serde(rename = "orden", default)]
  pub order: i64,
  #[serde(rename = "flujo")]
  pub workflow: Option<Ref<Workflow>>,
  #[serde(rename = "rol")]
  pub role: Option<Ref<Role>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
  #[serde(rename = "nombre")]
  pub name: String,
  #[serde(rename = "orden")]
  pub order: i64,
  #[serde(rename = "flujo")]
  pub workflow: Labeled<Workflow>,
  #[serde(rename = "rol")]
  pub role: Labeled<Role>,
}

impl Record for Activity {
  fn field(&self, name: &str) -> Option<Value> {
    match name {
      "nombre" => Some(Value::from(self.name.as_str())),
      "orden" => Some(Value::from(self.order)),
      "flujo" => Some(ref_id(&self.workflow)),
      "rol" => Some(ref_id(&self.role)),
      _ => None,
    }
  }

  fn payload(&self) -> Value {
    json!({
      "nombre": self.name,
      "orden": self.order,
      "flujo": ref_id(&self.workflow),
      "rol": ref_id(&self.role),
    })
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityProjector;

impl Projector for ActivityProjector {
  type Raw = RawActivity;
  type Output = Activity;

  const POLICY: Policy = Policy {
    editable: true,
    eliminable: true,
  };

  fn raw_id(raw: &RawActivity) -> i64 {
    raw.id
  }

  fn project_fields(&self, raw: RawActivity, _ctx: &ProjectionContext) -> Activity {
    Activity {
      name: raw.name,
      order: raw.order,
      workflow: Labeled::from_ref(raw.workflow),
      role: Labeled::from_ref(raw.role),
    }
  }

  /// Two activities of the same workflow may not share an `orden`.
  fn validate(
    &self,
    id: Option<i64>,
    payload: &Value,
    resident: &[&Entity<Activity>],
  ) -> Result<(), ValidationError> {
    let orden = payload["orden"]
      .as_i64()
      .ok_or(ValidationError::MissingField("orden"))?;
    let Some(flujo) = payload["flujo"].as_i64() else {
      return Ok(());
    };

    let conflict = resident.iter().find(|e| {
      Some(e.id) != id && e.data.order == orden && e.data.workflow.id() == Some(flujo)
    });
    match conflict {
      Some(e) => Err(ValidationError::DuplicateOrder {
        orden,
        parent: flujo,
        conflicting_id: e.id,
      }),
      None => Ok(()),
    }
  }
}
