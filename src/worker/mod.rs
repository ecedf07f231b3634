//! Network-fallback cache worker.
//!
//! Sits beneath every outbound request the app makes:
//! - Install precaches the app shell into a versioned cache, all or nothing
//! - Activate purges every cache generation except the current one
//! - Fetch serves cache hits first, then the network, then an offline fallback
//! - Sync hands a background sync signal to the configured handler

mod cache_storage;
mod fetcher;
mod http;
mod lifecycle;
mod policy;

pub use cache_storage::{CacheStorage, MemoryCacheStorage, SqliteCacheStorage};
pub use fetcher::{Fetcher, GatedFetcher, HttpFetcher};
pub use http::{Request, Response, ResponseKind};
pub use lifecycle::{LifecycleStep, WorkerPhase};
pub use policy::{OfflineFallback, OFFLINE_API_ERROR};

use color_eyre::{eyre::eyre, Result};
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::Config;
use crate::sync::{SyncHandler, SyncReport};

/// Fixed parameters of one worker version.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
  pub cache_name: String,
  pub origin: Url,
  pub precache: Vec<String>,
  pub api_segment: String,
  pub sync_tag: String,
}

impl WorkerSettings {
  pub fn from_config(config: &Config) -> Result<Self> {
    let origin = Url::parse(&config.origin)
      .map_err(|e| eyre!("Invalid origin '{}': {}", config.origin, e))?;

    Ok(Self {
      cache_name: config.cache_name.clone(),
      origin,
      precache: config.precache.clone(),
      api_segment: config.api_segment.clone(),
      sync_tag: config.sync.tag.clone(),
    })
  }

  /// Resolve a root-relative path (or absolute URL) against the origin.
  pub fn resolve(&self, path: &str) -> Result<Url> {
    self
      .origin
      .join(path)
      .map_err(|e| eyre!("Invalid request path '{}': {}", path, e))
  }
}

/// External event delivered to the worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
  Install,
  Activate,
  Fetch(Request),
  Sync(String),
}

/// Result of handling a [`WorkerEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
  Installed { cached: usize },
  Activated { purged: Vec<String> },
  Responded(Response),
  Synced(Option<SyncReport>),
}

/// Cache worker for one version of the app.
pub struct CacheWorker<S: CacheStorage + 'static, F: Fetcher> {
  storage: Arc<S>,
  fetcher: F,
  settings: WorkerSettings,
  phase: WorkerPhase,
  pending_writes: Mutex<JoinSet<()>>,
}

impl<S: CacheStorage + 'static, F: Fetcher> CacheWorker<S, F> {
  pub fn new(storage: Arc<S>, fetcher: F, settings: WorkerSettings) -> Self {
    Self {
      storage,
      fetcher,
      settings,
      phase: WorkerPhase::default(),
      pending_writes: Mutex::new(JoinSet::new()),
    }
  }

  pub fn phase(&self) -> WorkerPhase {
    self.phase
  }

  pub fn settings(&self) -> &WorkerSettings {
    &self.settings
  }

  fn advance(&mut self, step: LifecycleStep) -> Result<()> {
    self.phase = self.phase.advance(step)?;
    debug!(phase = %self.phase, "Worker phase changed");
    Ok(())
  }

  /// Route an event to its handler.
  pub async fn dispatch<H: SyncHandler>(
    &mut self,
    event: WorkerEvent,
    sync_handler: &H,
  ) -> Result<EventOutcome> {
    match event {
      WorkerEvent::Install => {
        let cached = self.install().await?;
        Ok(EventOutcome::Installed { cached })
      }
      WorkerEvent::Activate => {
        let purged = self.activate()?;
        Ok(EventOutcome::Activated { purged })
      }
      WorkerEvent::Fetch(request) => self.fetch(&request).await.map(EventOutcome::Responded),
      WorkerEvent::Sync(tag) => Ok(EventOutcome::Synced(
        self.on_sync(&tag, sync_handler).await,
      )),
    }
  }

  /// Precache the app shell.
  ///
  /// Every manifest entry must fetch successfully before anything is
  /// stored. Any failure leaves the worker redundant and removes a cache
  /// generation this install created.
  pub async fn install(&mut self) -> Result<usize> {
    let existed = self
      .storage
      .cache_names()?
      .contains(&self.settings.cache_name);

    self.advance(LifecycleStep::BeginInstall)?;
    info!(cache = %self.settings.cache_name, "Installing");

    match self.precache().await {
      Ok(count) => {
        self.advance(LifecycleStep::InstallSucceeded)?;
        info!(cache = %self.settings.cache_name, count, "Precache complete");
        Ok(count)
      }
      Err(e) => {
        self.advance(LifecycleStep::InstallFailed)?;
        error!(cache = %self.settings.cache_name, error = %e, "Install failed");
        if !existed {
          self.discard_generation();
        }
        Err(e)
      }
    }
  }

  async fn precache(&self) -> Result<usize> {
    let requests = self.shell_requests()?;

    let responses = futures::future::try_join_all(requests.iter().map(|request| async move {
      let response = self.fetcher.fetch(request).await?;
      if !response.is_ok() {
        return Err(eyre!(
          "Precache of {} returned status {}",
          request.url,
          response.status
        ));
      }
      Ok::<_, color_eyre::Report>(response)
    }))
    .await?;

    self.storage.open(&self.settings.cache_name)?;
    let pairs: Vec<(Request, Response)> = requests.into_iter().zip(responses).collect();
    self.storage.put_all(&self.settings.cache_name, &pairs)?;

    Ok(pairs.len())
  }

  fn shell_requests(&self) -> Result<Vec<Request>> {
    self
      .settings
      .precache
      .iter()
      .map(|path| self.settings.resolve(path).map(Request::get))
      .collect()
  }

  fn discard_generation(&self) {
    match self.storage.delete_cache(&self.settings.cache_name) {
      Ok(true) => debug!(cache = %self.settings.cache_name, "Discarded partial cache"),
      Ok(false) => {}
      Err(e) => warn!(
        cache = %self.settings.cache_name,
        error = %e,
        "Failed to discard partial cache"
      ),
    }
  }

  /// Start serving from a cache generation installed by an earlier run.
  ///
  /// Returns `false` (and stays un-installed) unless the generation exists
  /// and holds every precache manifest entry.
  pub fn resume(&mut self) -> Result<bool> {
    let names = self.storage.cache_names()?;
    if !names.contains(&self.settings.cache_name) {
      return Ok(false);
    }

    for request in self.shell_requests()? {
      if self
        .storage
        .match_request(&self.settings.cache_name, &request)?
        .is_none()
      {
        info!(
          cache = %self.settings.cache_name,
          url = %request.url,
          "Existing cache is missing precached entry, reinstalling"
        );
        return Ok(false);
      }
    }

    self.advance(LifecycleStep::Resume)?;
    info!(cache = %self.settings.cache_name, "Resumed existing cache");
    Ok(true)
  }

  /// Delete every cache generation except the current one.
  pub fn activate(&mut self) -> Result<Vec<String>> {
    self.advance(LifecycleStep::BeginActivate)?;

    let names = self.storage.cache_names()?;
    let stale = policy::stale_caches(&names, &self.settings.cache_name);

    let mut purged = Vec::with_capacity(stale.len());
    for name in stale {
      match self.storage.delete_cache(&name) {
        Ok(true) => {
          info!(cache = %name, "Deleted stale cache");
          purged.push(name);
        }
        Ok(false) => {}
        Err(e) => warn!(cache = %name, error = %e, "Failed to delete stale cache"),
      }
    }

    self.advance(LifecycleStep::ActivateFinished)?;
    Ok(purged)
  }

  /// Answer an intercepted request.
  pub async fn fetch(&self, request: &Request) -> Result<Response> {
    if !self.phase.is_serving() {
      return Err(eyre!("Worker is {}, not serving", self.phase));
    }

    if let Some(cached) = self.lookup(request) {
      debug!(url = %request.url, "Cache hit");
      return Ok(cached);
    }

    match self.fetcher.fetch(request).await {
      Ok(response) => {
        if policy::is_cacheable(request, &response) {
          self.cache_in_background(request.clone(), response.clone());
        }
        Ok(response)
      }
      Err(e) => {
        debug!(url = %request.url, error = %e, "Network fetch failed");
        self.fallback(request, e)
      }
    }
  }

  fn lookup(&self, request: &Request) -> Option<Response> {
    match self
      .storage
      .match_request(&self.settings.cache_name, request)
    {
      Ok(hit) => hit,
      Err(e) => {
        warn!(url = %request.url, error = %e, "Cache lookup failed");
        None
      }
    }
  }

  fn fallback(&self, request: &Request, network_error: color_eyre::Report) -> Result<Response> {
    match policy::offline_fallback(request, &self.settings.api_segment) {
      OfflineFallback::ApiError(response) | OfflineFallback::Unavailable(response) => {
        Ok(response)
      }
      OfflineFallback::AppShell => {
        let shell = ["/index.html", "/"]
          .iter()
          .filter_map(|path| self.settings.resolve(path).ok())
          .find_map(|url| self.lookup(&Request::get(url)));

        match shell {
          Some(response) => Ok(response),
          None => Err(network_error),
        }
      }
      OfflineFallback::Propagate => Err(network_error),
    }
  }

  fn cache_in_background(&self, request: Request, response: Response) {
    let storage = Arc::clone(&self.storage);
    let cache_name = self.settings.cache_name.clone();

    let write = move || {
      if let Err(e) = storage.put(&cache_name, &request, &response) {
        warn!(url = %request.url, error = %e, "Failed to cache response");
      }
    };

    match self.pending_writes.lock() {
      Ok(mut pending) => {
        reap_finished(&mut pending);
        pending.spawn_blocking(write);
      }
      Err(e) => warn!(error = %e, "Pending write set poisoned, dropping cache write"),
    }
  }

  /// Background cache writes that have not finished yet.
  pub fn outstanding_writes(&self) -> usize {
    match self.pending_writes.lock() {
      Ok(mut pending) => {
        reap_finished(&mut pending);
        pending.len()
      }
      Err(_) => 0,
    }
  }

  /// Wait for every background cache write started so far.
  pub async fn settle(&self) {
    let mut pending = match self.pending_writes.lock() {
      Ok(mut pending) => std::mem::take(&mut *pending),
      Err(_) => return,
    };

    while let Some(result) = pending.join_next().await {
      if let Err(e) = result {
        warn!(error = %e, "Background cache write panicked");
      }
    }
  }

  /// Run background sync when the signal carries the configured tag.
  pub async fn on_sync<H: SyncHandler>(&self, tag: &str, handler: &H) -> Option<SyncReport> {
    if tag != self.settings.sync_tag {
      debug!(tag, "Ignoring unknown sync tag");
      return None;
    }

    info!(tag, "Syncing data from background");
    Some(handler.sync().await)
  }

  /// Every cache generation in storage.
  pub fn cache_names(&self) -> Result<Vec<String>> {
    self.storage.cache_names()
  }

  /// `METHOD url` of everything in the current cache.
  pub fn cached_entries(&self) -> Result<Vec<String>> {
    self.storage.entries(&self.settings.cache_name)
  }
}

fn reap_finished(pending: &mut JoinSet<()>) {
  while let Some(result) = pending.try_join_next() {
    if let Err(e) = result {
      warn!(error = %e, "Background cache write panicked");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use reqwest::Method;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
  use std::time::Duration;

  /// Network double: fixed routes, switchable outage.
  #[derive(Default)]
  struct FakeNetwork {
    routes: HashMap<String, Response>,
    offline: AtomicBool,
    calls: AtomicUsize,
  }

  impl FakeNetwork {
    fn route(mut self, path: &str, response: Response) -> Self {
      self.routes.insert(path.to_string(), response);
      self
    }

    fn go_offline(&self) {
      self.offline.store(true, Ordering::SeqCst);
    }
  }

  impl Fetcher for Arc<FakeNetwork> {
    async fn fetch(&self, request: &Request) -> Result<Response> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      if self.offline.load(Ordering::SeqCst) {
        return Err(eyre!("network unreachable"));
      }
      Ok(
        self
          .routes
          .get(request.url.path())
          .cloned()
          .unwrap_or_else(|| Response::new(404, ResponseKind::Basic, "not found")),
      )
    }
  }

  struct CountingSync(AtomicUsize);

  impl SyncHandler for CountingSync {
    async fn sync(&self) -> SyncReport {
      self.0.fetch_add(1, Ordering::SeqCst);
      SyncReport::default()
    }
  }

  fn settings(cache_name: &str) -> WorkerSettings {
    let config = Config {
      cache_name: cache_name.to_string(),
      ..Config::default()
    };
    WorkerSettings::from_config(&config).unwrap()
  }

  fn ok(body: &str) -> Response {
    Response::new(200, ResponseKind::Basic, body)
  }

  fn shell_network() -> FakeNetwork {
    FakeNetwork::default()
      .route("/", ok("<html>root</html>"))
      .route("/index.html", ok("<html>index</html>"))
      .route("/manifest.json", ok("{}"))
      .route("/favicon.ico", Response::new(200, ResponseKind::Basic, vec![0u8, 1, 2, 255]))
  }

  async fn active_worker(
    storage: Arc<MemoryCacheStorage>,
    network: Arc<FakeNetwork>,
    cache_name: &str,
  ) -> CacheWorker<MemoryCacheStorage, Arc<FakeNetwork>> {
    let mut worker = CacheWorker::new(storage, network, settings(cache_name));
    worker.install().await.unwrap();
    worker.activate().unwrap();
    worker
  }

  fn get(worker: &CacheWorker<MemoryCacheStorage, Arc<FakeNetwork>>, path: &str) -> Request {
    Request::get(worker.settings().resolve(path).unwrap())
  }

  #[tokio::test]
  async fn test_install_precaches_manifest() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(shell_network());
    let worker = active_worker(storage, network, "maa-sathi-seva-cache-v1").await;

    assert_eq!(worker.phase(), WorkerPhase::Activated);
    assert_eq!(worker.cached_entries().unwrap().len(), 4);
  }

  #[tokio::test]
  async fn test_install_is_all_or_nothing() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(
      FakeNetwork::default()
        .route("/", ok("root"))
        .route("/index.html", ok("index")),
    );
    let mut worker = CacheWorker::new(
      Arc::clone(&storage),
      Arc::clone(&network),
      settings("maa-sathi-seva-cache-v1"),
    );

    assert!(worker.install().await.is_err());
    assert_eq!(worker.phase(), WorkerPhase::Redundant);
    assert!(storage
      .entries("maa-sathi-seva-cache-v1")
      .unwrap()
      .is_empty());
    assert!(storage.cache_names().unwrap().is_empty());
    assert!(worker.activate().is_err());

    let mut restarted = CacheWorker::new(storage, network, settings("maa-sathi-seva-cache-v1"));
    assert!(!restarted.resume().unwrap());
    assert_eq!(restarted.phase(), WorkerPhase::Parsed);
  }

  #[tokio::test]
  async fn test_failed_install_leaves_no_sqlite_generation() {
    let storage = Arc::new(SqliteCacheStorage::open_in_memory().unwrap());
    let network = Arc::new(shell_network());
    network.go_offline();

    let mut worker = CacheWorker::new(Arc::clone(&storage), Arc::clone(&network), settings("v1"));
    assert!(worker.install().await.is_err());
    assert!(storage.cache_names().unwrap().is_empty());

    let mut restarted = CacheWorker::new(storage, network, settings("v1"));
    assert!(!restarted.resume().unwrap());
  }

  #[tokio::test]
  async fn test_resume_requires_complete_shell() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(shell_network());
    storage.open("v1").unwrap();
    storage
      .put(
        "v1",
        &Request::get(settings("v1").resolve("/").unwrap()),
        &ok("<html>root</html>"),
      )
      .unwrap();

    let mut worker = CacheWorker::new(Arc::clone(&storage), Arc::clone(&network), settings("v1"));
    assert!(!worker.resume().unwrap());

    worker.install().await.unwrap();
    worker.activate().unwrap();

    let mut restarted = CacheWorker::new(storage, network, settings("v1"));
    assert!(restarted.resume().unwrap());
  }

  #[tokio::test]
  async fn test_resume_serves_existing_generation() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(shell_network());
    active_worker(Arc::clone(&storage), Arc::clone(&network), "v1").await;

    network.go_offline();
    let mut restarted = CacheWorker::new(Arc::clone(&storage), Arc::clone(&network), settings("v1"));
    assert!(restarted.resume().unwrap());
    let response = restarted.fetch(&get(&restarted, "/")).await.unwrap();
    assert_eq!(response.text(), "<html>root</html>");

    let mut fresh = CacheWorker::new(storage, network, settings("v2"));
    assert!(!fresh.resume().unwrap());
    assert_eq!(fresh.phase(), WorkerPhase::Parsed);
  }

  #[tokio::test]
  async fn test_fetch_rejected_before_activation() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(shell_network());
    let mut worker = CacheWorker::new(storage, network, settings("v1"));
    worker.install().await.unwrap();

    let request = get(&worker, "/");
    assert!(worker.fetch(&request).await.is_err());
  }

  #[tokio::test]
  async fn test_activation_purges_old_generation() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(shell_network());

    let v1 = active_worker(
      Arc::clone(&storage),
      Arc::clone(&network),
      "maa-sathi-seva-cache-v1",
    )
    .await;
    let old_request = get(&v1, "/index.html");
    assert!(storage
      .match_request("maa-sathi-seva-cache-v1", &old_request)
      .unwrap()
      .is_some());

    let mut v2 = CacheWorker::new(
      Arc::clone(&storage),
      network,
      settings("maa-sathi-seva-cache-v2"),
    );
    v2.install().await.unwrap();
    let purged = v2.activate().unwrap();

    assert_eq!(purged, vec!["maa-sathi-seva-cache-v1"]);
    assert_eq!(
      storage.cache_names().unwrap(),
      vec!["maa-sathi-seva-cache-v2"]
    );
    assert!(storage
      .match_request("maa-sathi-seva-cache-v1", &old_request)
      .unwrap()
      .is_none());
  }

  #[tokio::test]
  async fn test_precached_asset_served_offline_unchanged() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(shell_network());
    let worker = active_worker(storage, Arc::clone(&network), "v1").await;

    network.go_offline();
    let response = worker.fetch(&get(&worker, "/favicon.ico")).await.unwrap();
    assert_eq!(response.body, vec![0u8, 1, 2, 255]);
    assert_eq!(response.status, 200);
  }

  #[tokio::test]
  async fn test_cache_hit_skips_network() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(shell_network());
    let worker = active_worker(storage, Arc::clone(&network), "v1").await;
    let before = network.calls.load(Ordering::SeqCst);

    worker.fetch(&get(&worker, "/manifest.json")).await.unwrap();
    assert_eq!(network.calls.load(Ordering::SeqCst), before);
  }

  #[tokio::test]
  async fn test_uncached_api_offline_returns_error_json() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(shell_network());
    let worker = active_worker(storage, Arc::clone(&network), "v1").await;

    network.go_offline();
    let response = worker.fetch(&get(&worker, "/api/foo")).await.unwrap();
    assert_eq!(
      response.text(),
      r#"{"error":"You are offline and this data is not cached."}"#
    );
    assert_eq!(response.header("content-type"), Some("application/json"));
  }

  #[tokio::test]
  async fn test_successful_response_cached_for_offline_repeat() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(shell_network().route("/api/resources", ok(r#"[{"id":"r1"}]"#)));
    let worker = active_worker(storage, Arc::clone(&network), "v1").await;
    let request = get(&worker, "/api/resources");

    let first = worker.fetch(&request).await.unwrap();
    worker.settle().await;

    network.go_offline();
    let second = worker.fetch(&request).await.unwrap();
    assert_eq!(second.body, first.body);
    assert_eq!(second.text(), r#"[{"id":"r1"}]"#);
  }

  #[tokio::test]
  async fn test_finished_writes_do_not_accumulate() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = (0..64).fold(shell_network(), |network, i| {
      network.route(&format!("/api/resources/{}", i), ok("{}"))
    });
    let worker = active_worker(Arc::clone(&storage), Arc::new(network), "v1").await;

    for i in 0..32 {
      let request = get(&worker, &format!("/api/resources/{}", i));
      worker.fetch(&request).await.unwrap();
    }

    let mut bounded = false;
    for i in 32..64 {
      tokio::time::sleep(Duration::from_millis(10)).await;
      let request = get(&worker, &format!("/api/resources/{}", i));
      worker.fetch(&request).await.unwrap();
      if worker.pending_writes.lock().unwrap().len() <= 2 {
        bounded = true;
        break;
      }
    }
    assert!(bounded);

    worker.settle().await;
    assert_eq!(worker.outstanding_writes(), 0);
    assert!(storage.entries("v1").unwrap().len() > 32);
  }

  #[tokio::test]
  async fn test_non_200_never_stored() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(shell_network());
    let worker = active_worker(Arc::clone(&storage), network, "v1").await;
    let request = get(&worker, "/missing");

    let response = worker.fetch(&request).await.unwrap();
    worker.settle().await;

    assert_eq!(response.status, 404);
    assert!(storage.match_request("v1", &request).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_cross_origin_and_non_get_not_stored() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(
      shell_network()
        .route("/cdn.js", Response::new(200, ResponseKind::Cors, "cdn"))
        .route("/api/records", ok("created")),
    );
    let worker = active_worker(Arc::clone(&storage), network, "v1").await;

    let cross = get(&worker, "/cdn.js");
    let post = Request::new(Method::POST, worker.settings().resolve("/api/records").unwrap());
    worker.fetch(&cross).await.unwrap();
    worker.fetch(&post).await.unwrap();
    worker.settle().await;

    assert!(storage.match_request("v1", &cross).unwrap().is_none());
    assert!(storage.match_request("v1", &post).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_offline_navigation_gets_shell() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(shell_network());
    let worker = active_worker(storage, Arc::clone(&network), "v1").await;

    network.go_offline();
    let request = get(&worker, "/profile").with_header("accept", "text/html");
    let response = worker.fetch(&request).await.unwrap();
    assert_eq!(response.text(), "<html>index</html>");

    let asset = worker.fetch(&get(&worker, "/logo.png")).await.unwrap();
    assert_eq!(asset.status, 503);

    let upload = Request::new(Method::PUT, worker.settings().resolve("/upload").unwrap());
    assert!(worker.fetch(&upload).await.is_err());
  }

  #[tokio::test]
  async fn test_dispatch_drives_lifecycle_and_sync() {
    let storage = Arc::new(MemoryCacheStorage::new());
    let network = Arc::new(shell_network());
    let sync = CountingSync(AtomicUsize::new(0));
    let mut worker = CacheWorker::new(storage, network, settings("v1"));

    let installed = worker.dispatch(WorkerEvent::Install, &sync).await.unwrap();
    assert_eq!(installed, EventOutcome::Installed { cached: 4 });

    let activated = worker.dispatch(WorkerEvent::Activate, &sync).await.unwrap();
    assert_eq!(activated, EventOutcome::Activated { purged: vec![] });

    let request = get(&worker, "/");
    let EventOutcome::Responded(response) = worker
      .dispatch(WorkerEvent::Fetch(request), &sync)
      .await
      .unwrap()
    else {
      panic!("expected a response");
    };
    assert_eq!(response.text(), "<html>root</html>");

    let ignored = worker
      .dispatch(WorkerEvent::Sync("other-tag".to_string()), &sync)
      .await
      .unwrap();
    assert_eq!(ignored, EventOutcome::Synced(None));

    let synced = worker
      .dispatch(WorkerEvent::Sync("sync-health-data".to_string()), &sync)
      .await
      .unwrap();
    assert_eq!(synced, EventOutcome::Synced(Some(SyncReport::default())));
    assert_eq!(sync.0.load(Ordering::SeqCst), 1);
  }
}
