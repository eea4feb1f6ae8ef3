//! Approval requests and the authorizations attached to them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::{date_value, ref_id, Person, Role, Status, Workflow};
use crate::cache::Record;
use crate::project::{DateLabel, Entity, Labeled, Policy, ProjectionContext, Projector, Ref};

#[derive(Debug, Clone, Deserialize)]
pub struct RawAuthorization {
  pub id: i64,
  #[serde(rename = "autorizante")]
  pub authorizer: Option<Ref<Person>>,
  #[serde(rename = "rol")]
  pub role: Option<Ref<Role>>,
  #[serde(rename = "fecha")]
  pub date: Option<String>,
  #[serde(rename = "aprobada")]
  pub approved: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Authorization {
  #[serde(rename = "autorizante")]
  pub authorizer: Labeled<Person>,
  #[serde(rename = "rol")]
  pub role: Labeled<Role>,
  #[serde(rename = "fecha")]
  pub date: DateLabel,
  #[serde(rename = "aprobada")]
  pub approved: Option<bool>,
}

impl Record for Authorization {
  fn field(&self, name: &str) -> Option<Value> {
    match name {
      "autorizante" => Some(ref_id(&self.authorizer)),
      "rol" => Some(ref_id(&self.role)),
      "fecha" => Some(date_value(&self.date)),
      "aprobada" => Some(self.approved.map_or(Value::Null, Value::from)),
      _ => None,
    }
  }

  fn payload(&self) -> Value {
    json!({
      "autorizante": ref_id(&self.authorizer),
      "rol": ref_id(&self.role),
      "aprobada": self.approved,
    })
  }
}

/// Authorizations are recorded by the workflow, never by hand.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationProjector {
  people: HashMap<i64, Person>,
}

impl Projector for AuthorizationProjector {
  type Raw = RawAuthorization;
  type Output = Authorization;

  const POLICY: Policy = Policy {
    editable: false,
    eliminable: false,
  };

  fn raw_id(raw: &RawAuthorization) -> i64 {
    raw.id
  }

  fn project_fields(&self, raw: RawAuthorization, ctx: &ProjectionContext) -> Authorization {
    Authorization {
      authorizer: Labeled::resolve(raw.authorizer, |id| self.people.get(&id).cloned()),
      role: Labeled::from_ref(raw.role),
      date: DateLabel::project(raw.date.as_deref(), ctx),
      approved: raw.approved,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRequest {
  pub id: i64,
  #[serde(rename = "titulo", default)]
  pub title: String,
  #[serde(rename = "descripcion")]
  pub description: Option<String>,
  #[serde(rename = "solicitante")]
  pub requester: Option<Ref<Person>>,
  #[serde(rename = "estado")]
  pub status: Option<Ref<Status>>,
  #[serde(rename = "flujo")]
  pub workflow: Option<Ref<Workflow>>,
  #[serde(rename = "fechaCreacion")]
  pub created: Option<String>,
  #[serde(rename = "autorizaciones", default)]
  pub authorizations: Vec<RawAuthorization>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
  #[serde(rename = "titulo")]
  pub title: String,
  #[serde(rename = "descripcion")]
  pub description: String,
  #[serde(rename = "solicitante")]
  pub requester: Labeled<Person>,
  #[serde(rename = "estado")]
  pub status: Labeled<Status>,
  #[serde(rename = "flujo")]
  pub workflow: Labeled<Workflow>,
  #[serde(rename = "fechaCreacion")]
  pub created: DateLabel,
  #[serde(rename = "autorizaciones")]
  pub authorizations: Vec<Entity<Authorization>>,
}

impl Record for Request {
  // Statuses are filtered and sorted by name, people and workflows by id.
  fn field(&self, name: &str) -> Option<Value> {
    match name {
      "titulo" => Some(Value::from(self.title.as_str())),
      "descripcion" => Some(Value::from(self.description.as_str())),
      "solicitante" => Some(ref_id(&self.requester)),
      "solicitante.display" => Some(Value::from(self.requester.display.as_str())),
      "estado" => Some(Value::from(self.status.display.as_str())),
      "flujo" => Some(ref_id(&self.workflow)),
      "fechaCreacion" => Some(date_value(&self.created)),
      "autorizaciones" => Some(self.authorizations.iter().map(|a| a.id).collect()),
      _ => None,
    }
  }

  fn payload(&self) -> Value {
    json!({
      "titulo": self.title,
      "descripcion": self.description,
      "solicitante": ref_id(&self.requester),
      "estado": ref_id(&self.status),
      "flujo": ref_id(&self.workflow),
    })
  }
}

/// Requests are never deletable; they are withdrawn through the workflow.
#[derive(Debug, Clone, Default)]
pub struct RequestProjector {
  authorizations: AuthorizationProjector,
}

impl RequestProjector {
  pub fn new() -> Self {
    Self::default()
  }

  /// Hydrate bare person ids from an already loaded directory.
  pub fn with_people(people: impl IntoIterator<Item = Person>) -> Self {
    let people: HashMap<i64, Person> = people.into_iter().map(|p| (p.id, p)).collect();
    Self {
      authorizations: AuthorizationProjector { people },
    }
  }

  fn person(&self, id: i64) -> Option<Person> {
    self.authorizations.people.get(&id).cloned()
  }
}

impl Projector for RequestProjector {
  type Raw = RawRequest;
  type Output = Request;

  const POLICY: Policy = Policy {
    editable: true,
    eliminable: false,
  };

  fn raw_id(raw: &RawRequest) -> i64 {
    raw.id
  }

  fn project_fields(&self, raw: RawRequest, ctx: &ProjectionContext) -> Request {
    Request {
      title: raw.title,
      description: raw.description.unwrap_or_default(),
      requester: Labeled::resolve(raw.requester, |id| self.person(id)),
      status: Labeled::from_ref(raw.status),
      workflow: Labeled::from_ref(raw.workflow),
      created: DateLabel::project(raw.created.as_deref(), ctx),
      authorizations: raw
        .authorizations
        .into_iter()
        .map(|a| self.authorizations.project(a, ctx))
        .collect(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{matches_filter, Filter};
  use crate::project::DisplayOptions;
  use chrono::NaiveDate;

  fn ctx() -> ProjectionContext {
    let now = NaiveDate::from_ymd_opt(2024, 3, 15)
      .unwrap()
      .and_hms_opt(12, 0, 0)
      .unwrap();
    DisplayOptions::default().context_at(now)
  }

  fn raw() -> RawRequest {
    serde_json::from_value(json!({
      "id": 7,
      "titulo": "Compra de equipos",
      "solicitante": 42,
      "estado": { "id": 1, "nombre": "pendiente" },
      "flujo": { "id": 3, "nombre": "Compras" },
      "fechaCreacion": "2024-03-15T08:00:00",
      "autorizaciones": [
        { "id": 70, "autorizante": { "id": 5, "nombre": "Ana", "apellido": "Ruiz" },
          "rol": 2, "fecha": "2024-03-14", "aprobada": true }
      ]
    }))
    .unwrap()
  }

  #[test]
  fn test_projection_wraps_references() {
    let entity = RequestProjector::new().project(raw(), &ctx());

    assert_eq!(entity.id, 7);
    assert_eq!(entity.codigo, 7);
    assert!(entity.editable);
    assert!(!entity.eliminable);

    let request = &entity.data;
    assert_eq!(request.requester.id(), Some(42));
    assert_eq!(request.requester.display, "");
    assert_eq!(request.status.display, "pendiente");
    assert_eq!(request.workflow.display, "Compras");
    assert_eq!(request.created.display, "Today");
    assert_eq!(request.description, "");
  }

  #[test]
  fn test_authorizations_projected_element_wise() {
    let entity = RequestProjector::new().project(raw(), &ctx());
    let auth = &entity.data.authorizations[0];

    assert_eq!(auth.codigo, 70);
    assert!(!auth.editable);
    assert!(!auth.eliminable);
    assert_eq!(auth.data.authorizer.display, "Ana Ruiz");
    assert_eq!(auth.data.role.id(), Some(2));
    assert_eq!(auth.data.date.display, "Yesterday");
  }

  #[test]
  fn test_directory_hydrates_requester() {
    let jane = Person {
      id: 42,
      first_name: "Jane".to_string(),
      last_name: "Doe".to_string(),
      email: None,
    };
    let entity = RequestProjector::with_people([jane]).project(raw(), &ctx());
    assert_eq!(entity.data.requester.display, "Jane Doe");
    assert_eq!(entity.data.requester.id(), Some(42));
  }

  #[test]
  fn test_fields_and_filters() {
    let entity = RequestProjector::new().project(raw(), &ctx());

    assert!(matches_filter(&entity, &Filter::new().with("estado", "pendiente")));
    assert!(matches_filter(
      &entity,
      &Filter::new().with("estado", "pendiente").with("solicitante", 42)
    ));
    assert!(!matches_filter(&entity, &Filter::new().with("solicitante", 43)));
    assert!(matches_filter(&entity, &Filter::new().with("autorizaciones", 70)));
    assert_eq!(
      entity.field("fechaCreacion"),
      Some(Value::from("2024-03-15T08:00:00"))
    );
  }

  #[test]
  fn test_payload_reduces_references_to_ids() {
    let entity = RequestProjector::new().project(raw(), &ctx());
    assert_eq!(
      entity.data.payload(),
      json!({
        "titulo": "Compra de equipos",
        "descripcion": "",
        "solicitante": 42,
        "estado": 1,
        "flujo": 3,
      })
    );
  }

  #[test]
  fn test_missing_references_are_render_safe() {
    let raw: RawRequest = serde_json::from_value(json!({ "id": 1 })).unwrap();
    let entity = RequestProjector::new().project(raw, &ctx());
    assert_eq!(entity.data.requester.display, "");
    assert_eq!(entity.data.status.display, "");
    assert_eq!(entity.data.created.display, "");
    assert!(entity.data.authorizations.is_empty());
    assert_eq!(entity.field("solicitante"), Some(Value::Null));
  }
}
