use clap::{Parser, ValueEnum};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

use pagecache::api::HttpEndpoint;
use pagecache::cache::{Filter, PageQuery, PageResult, PaginatedCache, SortOrder};
use pagecache::config::Config;
use pagecache::domain::{ActivityProjector, RequestProjector, RoleProjector, StaffProjector};
use pagecache::logging;
use pagecache::project::Projector;

#[derive(Parser, Debug)]
#[command(name = "pagecache")]
#[command(about = "Browse a server-paginated collection through the page cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/pagecache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Collection to browse
  #[arg(value_enum)]
  resource: Resource,

  /// Page number, starting at 1
  #[arg(short, long, default_value_t = 1)]
  page: usize,

  /// Rows per page (0 = whole collection)
  #[arg(long)]
  page_size: Option<usize>,

  /// Sort field, prefixed with '-' for descending
  #[arg(short, long, allow_hyphen_values = true)]
  sort: Option<SortOrder>,

  /// KEY=VALUE filter; values are read as JSON when they parse
  #[arg(short, long = "filter", value_parser = parse_filter_pair)]
  filters: Vec<(String, Value)>,

  /// Print the page as JSON
  #[arg(long)]
  json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Resource {
  Requests,
  Activities,
  Personnel,
  Roles,
}

impl Resource {
  fn path(self) -> &'static str {
    match self {
      Resource::Requests => "solicitudes",
      Resource::Activities => "actividades",
      Resource::Personnel => "personal",
      Resource::Roles => "roles",
    }
  }
}

fn parse_filter_pair(raw: &str) -> Result<(String, Value)> {
  let (key, value) = raw
    .split_once('=')
    .ok_or_else(|| eyre!("Expected KEY=VALUE, got '{}'", raw))?;
  let key = key.trim();
  if key.is_empty() {
    return Err(eyre!("Filter key is empty in '{}'", raw));
  }
  let value = serde_json::from_str(value).unwrap_or_else(|_| Value::from(value));
  Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;

  let mut query = PageQuery::page(args.page);
  if let Some(order) = args.sort.clone() {
    query = query.order(order);
  }
  if !args.filters.is_empty() {
    query = query.filter(args.filters.iter().cloned().collect::<Filter>());
  }
  if let Some(page_size) = args.page_size {
    query = query.page_size(page_size);
  }
  debug!("Browsing {:?} with {:?}", args.resource, query);

  let (resource, json) = (args.resource, args.json);
  match resource {
    Resource::Requests => show(&config, resource, RequestProjector::new(), query, json).await,
    Resource::Activities => show(&config, resource, ActivityProjector, query, json).await,
    Resource::Personnel => show(&config, resource, StaffProjector, query, json).await,
    Resource::Roles => show(&config, resource, RoleProjector, query, json).await,
  }
}

async fn show<P>(
  config: &Config,
  resource: Resource,
  projector: P,
  query: PageQuery,
  json: bool,
) -> Result<()>
where
  P: Projector,
  P::Output: Serialize,
{
  let endpoint = HttpEndpoint::<P::Raw>::new(&config.api, resource.path())?;
  let cache = PaginatedCache::new(endpoint, projector)
    .with_page_size(config.paging.page_size)
    .with_display(config.display.clone());

  let page = cache.get_page(query).await?;
  if json {
    let out = serde_json::to_string_pretty(&page.entities)
      .map_err(|e| eyre!("Failed to serialize page: {}", e))?;
    println!("{}", out);
  } else {
    print_table(&page)?;
  }
  Ok(())
}

fn print_table<T: Serialize>(page: &PageResult<T>) -> Result<()> {
  for entity in &page.entities {
    let row = serde_json::to_value(entity).map_err(|e| eyre!("Failed to render row: {}", e))?;
    let cells: Vec<String> = row
      .as_object()
      .into_iter()
      .flatten()
      .filter(|(key, _)| !matches!(key.as_str(), "id" | "codigo" | "editable" | "eliminable"))
      .map(|(key, value)| format!("{}={}", key, cell(value)))
      .collect();
    println!("{:>6}  {}", entity.id, cells.join("  "));
  }

  let pages = match page.window.page_size {
    0 => 1,
    size => page.total.div_ceil(size).max(1),
  };
  println!(
    "-- page {}/{} ({} rows, {:?})",
    page.window.page_number, pages, page.total, page.source
  );
  Ok(())
}

/// Labeled values print their display string.
fn cell(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    Value::Array(items) => format!("[{}]", items.len()),
    Value::Object(obj) => obj.get("display").map(cell).unwrap_or_default(),
    other => other.to_string(),
  }
}
