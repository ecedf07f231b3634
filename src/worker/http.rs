//! Request and response values passed through the worker.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// An intercepted outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub headers: Vec<(String, String)>,
}

impl Request {
  pub fn new(method: Method, url: Url) -> Self {
    Self {
      method,
      url,
      headers: Vec::new(),
    }
  }

  pub fn get(url: Url) -> Self {
    Self::new(Method::GET, url)
  }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self.headers.push((name.to_string(), value.to_string()));
    self
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    find_header(&self.headers, name)
  }

  /// Navigation-style request expecting an HTML document.
  pub fn accepts_html(&self) -> bool {
    self
      .header("accept")
      .map(|accept| accept.contains("text/html"))
      .unwrap_or(false)
  }

  /// Stable cache key for request identity (method + URL).
  pub fn cache_key(&self) -> String {
    let input = format!("{} {}", self.method, self.url);

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }
}

/// Origin classification of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
  /// Same-origin
  Basic,
  /// Cross-origin
  Cors,
  /// Produced locally by the worker
  Synthetic,
}

impl ResponseKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Basic => "basic",
      Self::Cors => "cors",
      Self::Synthetic => "synthetic",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "basic" => Some(Self::Basic),
      "cors" => Some(Self::Cors),
      "synthetic" => Some(Self::Synthetic),
      _ => None,
    }
  }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub status: u16,
  pub kind: ResponseKind,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl Response {
  pub fn new(status: u16, kind: ResponseKind, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      kind,
      headers: Vec::new(),
      body: body.into(),
    }
  }

  /// Locally produced JSON response.
  pub fn synthetic_json(status: u16, body: &serde_json::Value) -> Self {
    Self::new(status, ResponseKind::Synthetic, body.to_string())
      .with_header("content-type", "application/json")
  }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self.headers.push((name.to_string(), value.to_string()));
    self
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    find_header(&self.headers, name)
  }

  pub fn is_ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
  headers
    .iter()
    .find(|(k, _)| k.eq_ignore_ascii_case(name))
    .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
  }

  #[test]
  fn test_cache_key_depends_on_method_and_url() {
    let get = Request::get(url("http://localhost:8080/index.html"));
    let head = Request::new(Method::HEAD, url("http://localhost:8080/index.html"));
    let other = Request::get(url("http://localhost:8080/manifest.json"));

    assert_eq!(get.cache_key(), get.clone().cache_key());
    assert_ne!(get.cache_key(), head.cache_key());
    assert_ne!(get.cache_key(), other.cache_key());
    assert_eq!(get.cache_key().len(), 64);
  }

  #[test]
  fn test_cache_key_ignores_headers() {
    let plain = Request::get(url("http://localhost:8080/"));
    let with_accept = plain.clone().with_header("Accept", "text/html");
    assert_eq!(plain.cache_key(), with_accept.cache_key());
  }

  #[test]
  fn test_headers_case_insensitive() {
    let req = Request::get(url("http://localhost:8080/")).with_header("Accept", "text/html,*/*");
    assert!(req.accepts_html());
    assert_eq!(req.header("ACCEPT"), Some("text/html,*/*"));
  }

  #[test]
  fn test_synthetic_json() {
    let resp = Response::synthetic_json(200, &serde_json::json!({"error": "x"}));
    assert_eq!(resp.header("Content-Type"), Some("application/json"));
    assert_eq!(resp.text(), r#"{"error":"x"}"#);
    assert!(resp.is_ok());
  }
}
