//! Network access for the worker.

use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use url::Url;

use super::http::{Request, Response, ResponseKind};
use crate::connectivity::Connectivity;

/// Performs a request against the network.
///
/// An `Err` means the request never produced a response (offline, DNS,
/// connection reset). HTTP error statuses are successful fetches.
pub trait Fetcher: Send + Sync {
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;
}

/// Fetcher backed by reqwest.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
  origin: Url,
}

impl HttpFetcher {
  pub fn new(origin: Url) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("sathi/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, origin })
  }

  pub fn client(&self) -> &reqwest::Client {
    &self.client
  }
}

impl Fetcher for HttpFetcher {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    let mut builder = self
      .client
      .request(request.method.clone(), request.url.clone());
    for (name, value) in &request.headers {
      builder = builder.header(name, value);
    }

    let resp = builder
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", request.url, e))?;

    let kind = if resp.url().origin() == self.origin.origin() {
      ResponseKind::Basic
    } else {
      ResponseKind::Cors
    };
    let status = resp.status().as_u16();
    let headers = resp
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();

    let body = resp
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body of {}: {}", request.url, e))?;

    Ok(Response {
      status,
      kind,
      headers,
      body: body.to_vec(),
    })
  }
}

/// Fails every request while the connectivity view reports offline.
#[derive(Clone)]
pub struct GatedFetcher<F: Fetcher> {
  inner: F,
  connectivity: Connectivity,
}

impl<F: Fetcher> GatedFetcher<F> {
  pub fn new(inner: F, connectivity: Connectivity) -> Self {
    Self {
      inner,
      connectivity,
    }
  }
}

impl<F: Fetcher> Fetcher for GatedFetcher<F> {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    if !self.connectivity.is_online() {
      return Err(eyre!("Offline, not fetching {}", request.url));
    }
    self.inner.fetch(request).await
  }
}
