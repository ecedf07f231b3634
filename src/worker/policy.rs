//! Pure decision rules for the worker's event handlers.

use reqwest::Method;
use serde_json::json;

use super::http::{Request, Response, ResponseKind};

/// Error body returned for uncached API requests while offline.
pub const OFFLINE_API_ERROR: &str = "You are offline and this data is not cached.";

/// Only successful same-origin GET responses are ever stored.
pub fn is_cacheable(request: &Request, response: &Response) -> bool {
  response.status == 200 && response.kind == ResponseKind::Basic && request.method == Method::GET
}

/// Caches that belong to any generation other than `current`.
pub fn stale_caches(cache_names: &[String], current: &str) -> Vec<String> {
  cache_names
    .iter()
    .filter(|name| name.as_str() != current)
    .cloned()
    .collect()
}

/// Whether the request targets the API.
pub fn is_api_request(request: &Request, api_segment: &str) -> bool {
  request.url.path().contains(api_segment)
}

/// What to answer when neither the cache nor the network can.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfflineFallback {
  /// Synthesized JSON error for API calls
  ApiError(Response),
  /// Serve the cached app shell for a page navigation
  AppShell,
  /// Synthesized plain 503 for anything else fetched with GET
  Unavailable(Response),
  /// No fallback; the network error reaches the caller
  Propagate,
}

/// Decide the fallback for a request that missed the cache and failed on the network.
pub fn offline_fallback(request: &Request, api_segment: &str) -> OfflineFallback {
  if is_api_request(request, api_segment) {
    return OfflineFallback::ApiError(Response::synthetic_json(
      200,
      &json!({ "error": OFFLINE_API_ERROR }),
    ));
  }

  if request.method != Method::GET {
    return OfflineFallback::Propagate;
  }

  if request.accepts_html() {
    return OfflineFallback::AppShell;
  }

  OfflineFallback::Unavailable(
    Response::new(503, ResponseKind::Synthetic, "Offline")
      .with_header("content-type", "text/plain; charset=utf-8"),
  )
}
