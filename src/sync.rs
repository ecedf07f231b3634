//! Background sync: flushing deferred local data once the network returns.

use color_eyre::{eyre::eyre, Result};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::future::Future;
use tracing::{info, warn};
use url::Url;

use crate::store::{KvBackend, LocalStore, SyncOutcome};

/// Destination for flushed records.
pub trait SyncSink: Send + Sync {
  fn push(&self, key: &str, data: Value) -> impl Future<Output = Result<()>> + Send;
}

/// Sink used when no remote endpoint is configured.
///
/// Every push fails so the data stays in the local store.
pub struct NullSink;

impl SyncSink for NullSink {
  async fn push(&self, key: &str, _data: Value) -> Result<()> {
    Err(eyre!("No sync endpoint configured for {}", key))
  }
}

/// Sink that POSTs each record as JSON to `<endpoint>/<key>`.
pub struct HttpSink {
  client: reqwest::Client,
  endpoint: Url,
}

impl HttpSink {
  pub fn new(client: reqwest::Client, endpoint: &str) -> Result<Self> {
    let endpoint =
      Url::parse(endpoint).map_err(|e| eyre!("Invalid sync endpoint '{}': {}", endpoint, e))?;
    if endpoint.cannot_be_a_base() {
      return Err(eyre!("Sync endpoint '{}' cannot take a path", endpoint));
    }
    Ok(Self { client, endpoint })
  }

  fn url_for(&self, key: &str) -> Url {
    let mut url = self.endpoint.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.pop_if_empty().push(key);
    }
    url
  }
}

impl SyncSink for HttpSink {
  async fn push(&self, key: &str, data: Value) -> Result<()> {
    let url = self.url_for(key);
    let body =
      serde_json::to_vec(&data).map_err(|e| eyre!("Failed to serialize {}: {}", key, e))?;

    self
      .client
      .post(url.clone())
      .header(CONTENT_TYPE, "application/json")
      .body(body)
      .send()
      .await
      .map_err(|e| eyre!("Failed to POST {}: {}", url, e))?
      .error_for_status()
      .map_err(|e| eyre!("Sync rejected by {}: {}", url, e))?;

    Ok(())
  }
}

/// Per-key result of a background sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
  pub flushed: Vec<String>,
  pub retained: Vec<String>,
  pub skipped: Vec<String>,
}

impl SyncReport {
  fn record(&mut self, key: &str, outcome: SyncOutcome) {
    let bucket = match outcome {
      SyncOutcome::Flushed => &mut self.flushed,
      SyncOutcome::Retained => &mut self.retained,
      SyncOutcome::Empty | SyncOutcome::Offline => &mut self.skipped,
    };
    bucket.push(key.to_string());
  }
}

/// Work run when the environment grants a background sync.
pub trait SyncHandler: Send + Sync {
  fn sync(&self) -> impl Future<Output = SyncReport> + Send;
}

/// Flushes the configured keys of a local store into a sink.
pub struct BackgroundSync<B: KvBackend, K: SyncSink> {
  store: LocalStore<B>,
  sink: K,
  keys: Vec<String>,
}

impl<B: KvBackend, K: SyncSink> BackgroundSync<B, K> {
  pub fn new(store: LocalStore<B>, sink: K, keys: Vec<String>) -> Self {
    Self { store, sink, keys }
  }

  /// Attempt every key once, in order. Failed keys stay for the next run.
  pub async fn run(&self) -> SyncReport {
    let mut report = SyncReport::default();

    for key in &self.keys {
      let outcome = self
        .store
        .sync_deferred(key, |data: Value| self.sink.push(key, data))
        .await;
      report.record(key, outcome);
    }

    if report.retained.is_empty() {
      info!(flushed = report.flushed.len(), "Background sync finished");
    } else {
      warn!(
        flushed = report.flushed.len(),
        retained = ?report.retained,
        "Background sync left data for retry"
      );
    }

    report
  }
}

impl<B: KvBackend, K: SyncSink> SyncHandler for BackgroundSync<B, K> {
  fn sync(&self) -> impl Future<Output = SyncReport> + Send {
    self.run()
  }
}
