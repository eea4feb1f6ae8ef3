//! Personnel.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{date_value, ref_id, Role};
use crate::cache::Record;
use crate::project::{DateLabel, Labeled, Policy, ProjectionContext, Projector, Ref};

#[derive(Debug, Clone, Deserialize)]
pub struct RawStaffMember {
  pub id: i64,
  #[serde(rename = "nombre", default)]
  pub first_name: String,
  #[serde(rename = "apellido", default)]
  pub last_name: String,
  pub email: Option<String>,
  #[serde(rename = "rol")]
  pub role: Option<Ref<Role>>,
  #[serde(rename = "fechaAlta")]
  pub hired: Option<String>,
  #[serde(rename = "activo", default = "default_active")]
  pub active: bool,
}

fn default_active() -> bool {
  true
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffMember {
  #[serde(rename = "nombre")]
  pub first_name: String,
  #[serde(rename = "apellido")]
  pub last_name: String,
  #[serde(rename = "nombreCompleto")]
  pub full_name: String,
  pub email: String,
  #[serde(rename = "rol")]
  pub role: Labeled<Role>,
  #[serde(rename = "fechaAlta")]
  pub hired: DateLabel,
  #[serde(rename = "activo")]
  pub active: bool,
}

impl Record for StaffMember {
  fn field(&self, name: &str) -> Option<Value> {
    match name {
      "nombre" => Some(Value::from(self.first_name.as_str())),
      "apellido" => Some(Value::from(self.last_name.as_str())),
      "nombreCompleto" => Some(Value::from(self.full_name.as_str())),
      "email" => Some(Value::from(self.email.as_str())),
      "rol" => Some(ref_id(&self.role)),
      "fechaAlta" => Some(date_value(&self.hired)),
      "activo" => Some(Value::from(self.active)),
      _ => None,
    }
  }

  fn payload(&self) -> Value {
    json!({
      "nombre": self.first_name,
      "apellido": self.last_name,
      "email": self.email,
      "rol": ref_id(&self.role),
      "activo": self.active,
    })
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StaffProjector;

impl Projector for StaffProjector {
  type Raw = RawStaffMember;
  type Output = StaffMember;

  const POLICY: Policy = Policy {
    editable: true,
    eliminable: true,
  };

  fn raw_id(raw: &RawStaffMember) -> i64 {
    raw.id
  }

  fn project_fields(&self, raw: RawStaffMember, ctx: &ProjectionContext) -> StaffMember {
    let full_name = format!("{} {}", raw.first_name, raw.last_name)
      .trim()
      .to_string();
    StaffMember {
      full_name,
      first_name: raw.first_name,
      last_name: raw.last_name,
      email: raw.email.unwrap_or_default(),
      role: Labeled::from_ref(raw.role),
      hired: DateLabel::project(raw.hired.as_deref(), ctx),
      active: raw.active,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{sort_entities, SortOrder};
  use crate::project::{DisplayOptions, Entity};
  use chrono::NaiveDate;

  fn member(id: i64, first: &str, last: &str) -> Entity<StaffMember> {
    let raw: RawStaffMember = serde_json::from_value(json!({
      "id": id,
      "nombre": first,
      "apellido": last,
      "rol": 3,
      "fechaAlta": "2023-01-10",
    }))
    .unwrap();
    let now = NaiveDate::from_ymd_opt(2024, 3, 15)
      .unwrap()
      .and_hms_opt(0, 0, 0)
      .unwrap();
    StaffProjector.project(raw, &DisplayOptions::default().context_at(now))
  }

  #[test]
  fn test_projection() {
    let entity = member(1, "Jane", "Doe");
    assert_eq!(entity.data.full_name, "Jane Doe");
    assert_eq!(entity.data.email, "");
    assert!(entity.data.active);
    assert_eq!(entity.data.role.id(), Some(3));
    assert_eq!(entity.data.hired.display, "10/01/2023");
  }

  #[test]
  fn test_sort_by_last_name_ignores_case() {
    let mut staff = vec![
      member(1, "Jane", "doe"),
      member(2, "Ana", "Ruiz"),
      member(3, "Luis", "Alvarez"),
    ];
    sort_entities(&mut staff, &SortOrder::asc("apellido"));
    let ids: Vec<i64> = staff.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![3, 1, 2]);
  }
}
