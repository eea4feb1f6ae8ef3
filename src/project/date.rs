//! Date fields: parsed once, paired with a display string.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::ProjectionContext;

/// `{valor, display}` pair for a date field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DateLabel {
  pub valor: Option<NaiveDateTime>,
  pub display: String,
}

impl DateLabel {
  /// Parse a server date and label it relative to `ctx.now`.
  ///
  /// Unparseable or absent input gives an empty label.
  pub fn project(raw: Option<&str>, ctx: &ProjectionContext) -> Self {
    let Some(valor) = raw.and_then(parse_date) else {
      return Self::default();
    };

    let today = ctx.now.date();
    let display = if valor.date() == today {
      ctx.options.today_label.clone()
    } else if today.pred_opt() == Some(valor.date()) {
      ctx.options.yesterday_label.clone()
    } else {
      valor.format(&ctx.options.date_format).to_string()
    };

    Self {
      valor: Some(valor),
      display,
    }
  }
}

/// Accepts RFC 3339 (converted to local time), naive datetimes and plain dates.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }

  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.with_timezone(&Local).naive_local());
  }

  ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .or_else(|| {
      NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}
