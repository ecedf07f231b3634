//! Named response caches and their SQLite implementation.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use super::http::{Request, Response, ResponseKind};

/// Storage for named, versioned response caches.
pub trait CacheStorage: Send + Sync {
  /// Create the named cache if it does not exist.
  fn open(&self, cache_name: &str) -> Result<()>;

  /// Names of all caches, sorted.
  fn cache_names(&self) -> Result<Vec<String>>;

  /// Delete a cache and all its entries. Returns whether it existed.
  fn delete_cache(&self, cache_name: &str) -> Result<bool>;

  /// Exact match on request identity within one cache.
  fn match_request(&self, cache_name: &str, request: &Request) -> Result<Option<Response>>;

  /// Store `response` for `request`, replacing any earlier entry.
  fn put(&self, cache_name: &str, request: &Request, response: &Response) -> Result<()>;

  /// Store all pairs or none of them.
  fn put_all(&self, cache_name: &str, pairs: &[(Request, Response)]) -> Result<()> {
    for (request, response) in pairs {
      self.put(cache_name, request, response)?;
    }
    Ok(())
  }

  /// `METHOD url` of every entry in a cache, sorted.
  fn entries(&self, cache_name: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
  label: String,
  response: Response,
}

/// In-memory cache storage.
#[derive(Default)]
pub struct MemoryCacheStorage {
  caches: Mutex<BTreeMap<String, BTreeMap<String, MemoryEntry>>>,
}

impl MemoryCacheStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStorage for MemoryCacheStorage {
  fn open(&self, cache_name: &str) -> Result<()> {
    let mut caches = self
      .caches
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    caches.entry(cache_name.to_string()).or_default();
    Ok(())
  }

  fn cache_names(&self) -> Result<Vec<String>> {
    let caches = self
      .caches
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(caches.keys().cloned().collect())
  }

  fn delete_cache(&self, cache_name: &str) -> Result<bool> {
    let mut caches = self
      .caches
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(caches.remove(cache_name).is_some())
  }

  fn match_request(&self, cache_name: &str, request: &Request) -> Result<Option<Response>> {
    let caches = self
      .caches
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(
      caches
        .get(cache_name)
        .and_then(|cache| cache.get(&request.cache_key()))
        .map(|entry| entry.response.clone()),
    )
  }

  fn put(&self, cache_name: &str, request: &Request, response: &Response) -> Result<()> {
    let mut caches = self
      .caches
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    caches.entry(cache_name.to_string()).or_default().insert(
      request.cache_key(),
      MemoryEntry {
        label: format!("{} {}", request.method, request.url),
        response: response.clone(),
      },
    );
    Ok(())
  }

  fn entries(&self, cache_name: &str) -> Result<Vec<String>> {
    let caches = self
      .caches
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let mut labels: Vec<String> = caches
      .get(cache_name)
      .map(|cache| cache.values().map(|e| e.label.clone()).collect())
      .unwrap_or_default();
    labels.sort();
    Ok(labels)
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteCacheStorage {
  conn: Mutex<Connection>,
}

/// Schema for response cache tables.
const RESPONSE_CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_names (
    cache_name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS cached_responses (
    cache_name TEXT NOT NULL,
    request_key TEXT NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    kind TEXT NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cache_name, request_key),
    FOREIGN KEY (cache_name) REFERENCES cache_names(cache_name) ON DELETE CASCADE
);
"#;

impl SqliteCacheStorage {
  /// Open or create the response cache at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch("PRAGMA foreign_keys = ON;")
      .map_err(|e| eyre!("Failed to enable foreign keys: {}", e))?;
    conn
      .execute_batch(RESPONSE_CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }
}

fn insert_response(
  conn: &Connection,
  cache_name: &str,
  request: &Request,
  response: &Response,
) -> Result<()> {
  let headers = serde_json::to_string(&response.headers)
    .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

  conn
    .execute(
      "INSERT OR IGNORE INTO cache_names (cache_name) VALUES (?)",
      params![cache_name],
    )
    .map_err(|e| eyre!("Failed to register cache {}: {}", cache_name, e))?;

  conn
    .execute(
      "INSERT OR REPLACE INTO cached_responses
         (cache_name, request_key, method, url, status, kind, headers, body, cached_at)
       VALUES (?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))",
      params![
        cache_name,
        request.cache_key(),
        request.method.as_str(),
        request.url.as_str(),
        response.status,
        response.kind.as_str(),
        headers,
        response.body,
      ],
    )
    .map_err(|e| eyre!("Failed to store response for {}: {}", request.url, e))?;

  Ok(())
}

impl CacheStorage for SqliteCacheStorage {
  fn open(&self, cache_name: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR IGNORE INTO cache_names (cache_name) VALUES (?)",
        params![cache_name],
      )
      .map_err(|e| eyre!("Failed to open cache {}: {}", cache_name, e))?;

    Ok(())
  }

  fn cache_names(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT cache_name FROM cache_names ORDER BY cache_name")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list caches: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read cache name: {}", e))?;

    Ok(names)
  }

  fn delete_cache(&self, cache_name: &str) -> Result<bool> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let deleted = conn
      .execute(
        "DELETE FROM cache_names WHERE cache_name = ?",
        params![cache_name],
      )
      .map_err(|e| eyre!("Failed to delete cache {}: {}", cache_name, e))?;

    Ok(deleted > 0)
  }

  fn match_request(&self, cache_name: &str, request: &Request) -> Result<Option<Response>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(u16, String, String, Vec<u8>)> = conn
      .query_row(
        "SELECT status, kind, headers, body FROM cached_responses
         WHERE cache_name = ? AND request_key = ?",
        params![cache_name, request.cache_key()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to look up {}: {}", request.url, e))?;

    let Some((status, kind, headers, body)) = row else {
      return Ok(None);
    };

    let kind =
      ResponseKind::parse(&kind).ok_or_else(|| eyre!("Unknown response kind '{}'", kind))?;
    let headers: Vec<(String, String)> = serde_json::from_str(&headers)
      .map_err(|e| eyre!("Failed to deserialize headers: {}", e))?;

    Ok(Some(Response {
      status,
      kind,
      headers,
      body,
    }))
  }

  fn put(&self, cache_name: &str, request: &Request, response: &Response) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    insert_response(&conn, cache_name, request, response)
  }

  fn put_all(&self, cache_name: &str, pairs: &[(Request, Response)]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for (request, response) in pairs {
      insert_response(&tx, cache_name, request, response)?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn entries(&self, cache_name: &str) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT method || ' ' || url AS label FROM cached_responses
         WHERE cache_name = ? ORDER BY label",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let labels = stmt
      .query_map(params![cache_name], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list entries: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read entry: {}", e))?;

    Ok(labels)
  }
}
