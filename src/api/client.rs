//! HTTP binding of the collection endpoint contract.

use color_eyre::{eyre::eyre, Report, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::types::{PageRequest, PageResponse};
use crate::cache::CollectionEndpoint;
use crate::config::{ApiConfig, Config};
use crate::error::{ApiError, ErrorBody};

/// Collection endpoint at `{api.url}/{resource}/`.
pub struct HttpEndpoint<R> {
  client: reqwest::Client,
  base: Url,
  token: Option<String>,
  _raw: PhantomData<fn() -> R>,
}

impl<R> Clone for HttpEndpoint<R> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      base: self.base.clone(),
      token: self.token.clone(),
      _raw: PhantomData,
    }
  }
}

impl<R> HttpEndpoint<R> {
  pub fn new(config: &ApiConfig, resource: &str) -> Result<Self> {
    let root = config.base_url()?;
    let base = root
      .join(&format!("{}/", resource.trim_matches('/')))
      .map_err(|e| eyre!("Invalid resource path '{}': {}", resource, e))?;

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base,
      token: Config::get_api_token(config),
      _raw: PhantomData,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  fn item_url(&self, id: i64) -> Result<Url> {
    self
      .base
      .join(&id.to_string())
      .map_err(|e| eyre!("Invalid url for id {}: {}", id, e))
  }

  fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  async fn execute(&self, request: RequestBuilder) -> Result<Response> {
    let response = self
      .authorize(request)
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", self.base, e))?;

    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    Err(Report::new(rejection(status.as_u16(), &body)))
  }

  async fn execute_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
    let body = self
      .execute(request)
      .await?
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read response from {}: {}", self.base, e))?;

    serde_json::from_slice(&body)
      .map_err(|e| eyre!("Failed to parse response from {}: {}", self.base, e))
  }
}

fn with_json(request: RequestBuilder, payload: &Value) -> Result<RequestBuilder> {
  let body =
    serde_json::to_vec(payload).map_err(|e| eyre!("Failed to serialize payload: {}", e))?;
  Ok(request.header(CONTENT_TYPE, "application/json").body(body))
}

/// Error bodies come either wrapped (`{"error": {...}}`) or bare.
fn rejection(status: u16, body: &[u8]) -> ApiError {
  #[derive(Deserialize)]
  struct Wrapped {
    error: ErrorBody,
  }

  let error = serde_json::from_slice::<Wrapped>(body)
    .map(|w| w.error)
    .or_else(|_| serde_json::from_slice::<ErrorBody>(body))
    .ok();

  ApiError { status, error }
}

impl<R: DeserializeOwned + Send + 'static> CollectionEndpoint for HttpEndpoint<R> {
  type Raw = R;

  async fn list(&self, request: &PageRequest) -> Result<PageResponse<R>> {
    debug!(url = %self.base, page = request.page_number, "listing page");
    let builder = self
      .client
      .get(self.base.clone())
      .query(&request.query_pairs());
    self.execute_json(builder).await
  }

  async fn fetch(&self, id: i64) -> Result<R> {
    let builder = self.client.get(self.item_url(id)?);
    self.execute_json(builder).await
  }

  async fn create(&self, payload: &Value) -> Result<R> {
    let builder = with_json(self.client.post(self.base.clone()), payload)?;
    self.execute_json(builder).await
  }

  async fn update(&self, id: i64, payload: &Value) -> Result<R> {
    let builder = with_json(self.client.put(self.item_url(id)?), payload)?;
    self.execute_json(builder).await
  }

  async fn delete(&self, id: i64) -> Result<()> {
    let builder = self.client.delete(self.item_url(id)?);
    self.execute(builder).await?;
    Ok(())
  }
}
