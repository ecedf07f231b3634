//! Best-effort typed key/value store.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use color_eyre::Result;

use super::backend::KvBackend;
use crate::connectivity::Connectivity;
use crate::records::Record;

/// What a deferred sync attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
  /// Offline; nothing attempted
  Offline,
  /// No entry under the key
  Empty,
  /// Sync succeeded and the entry was removed
  Flushed,
  /// Entry kept for the next attempt: the sync failed, or the entry
  /// was rewritten while the sync was in flight
  Retained,
}

/// Local persistence store.
///
/// Every operation absorbs its own failures: writes that fail are logged
/// and dropped, reads that fail return `None`. Offline support must never
/// block the caller.
pub struct LocalStore<B: KvBackend> {
  backend: Arc<B>,
  connectivity: Connectivity,
}

impl<B: KvBackend> LocalStore<B> {
  pub fn new(backend: B, connectivity: Connectivity) -> Self {
    Self {
      backend: Arc::new(backend),
      connectivity,
    }
  }

  /// Serialize `value` and write it under `key`.
  pub fn store<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
    let text = match serde_json::to_string(value) {
      Ok(text) => text,
      Err(e) => {
        error!(key, error = %e, "Error storing offline data");
        return;
      }
    };

    if let Err(e) = self.backend.set_raw(key, &text) {
      error!(key, error = %e, "Error storing offline data");
    }
  }

  /// Value stored under `key`, or `None` when absent or unreadable as `T`.
  pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let raw = match self.backend.get_raw(key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        error!(key, error = %e, "Error retrieving offline data");
        return None;
      }
    };

    let value: Value = match serde_json::from_str(&raw) {
      Ok(value) => value,
      Err(e) => {
        error!(key, error = %e, "Error retrieving offline data");
        return None;
      }
    };

    // A stored JSON null reads as no data
    if value.is_null() {
      return None;
    }

    match serde_json::from_value(value) {
      Ok(typed) => Some(typed),
      Err(e) => {
        warn!(key, error = %e, "Stored data does not match expected schema");
        None
      }
    }
  }

  /// Delete the entry under `key`.
  pub fn remove(&self, key: &str) {
    if let Err(e) = self.backend.remove_raw(key) {
      error!(key, error = %e, "Error removing offline data");
    }
  }

  /// Typed read of a record at its own key.
  pub fn get<R: Record>(&self) -> Option<R> {
    self.load(R::KEY)
  }

  /// Typed write of a record at its own key.
  pub fn put<R: Record>(&self, record: &R) {
    self.store(R::KEY, record)
  }

  /// Keys currently holding data.
  pub fn keys(&self) -> Vec<String> {
    self.backend.keys().unwrap_or_else(|e| {
      error!(error = %e, "Error listing offline data");
      Vec::new()
    })
  }

  /// Connectivity snapshot at call time.
  pub fn is_online(&self) -> bool {
    self.connectivity.is_online()
  }

  /// Push the entry under `key` through `sync_fn` if online.
  ///
  /// On success the entry is removed; on failure it stays for a later call.
  /// No retry or backoff happens here, the caller re-invokes this (usually
  /// on the next online transition). A value written while the sync was in
  /// flight is kept.
  pub async fn sync_deferred<T, F, Fut>(&self, key: &str, sync_fn: F) -> SyncOutcome
  where
    T: DeserializeOwned,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<()>>,
  {
    if !self.is_online() {
      debug!(key, "Offline, deferring sync");
      return SyncOutcome::Offline;
    }

    let before = self.backend.get_raw(key).ok().flatten();
    let Some(data) = self.load::<T>(key) else {
      return SyncOutcome::Empty;
    };

    match sync_fn(data).await {
      Ok(()) => {
        let current = self.backend.get_raw(key).ok().flatten();
        if current == before {
          self.remove(key);
          info!(key, "Offline data synced");
          SyncOutcome::Flushed
        } else {
          info!(key, "Entry rewritten during sync, keeping newer value");
          SyncOutcome::Retained
        }
      }
      Err(e) => {
        error!(key, error = %e, "Error syncing offline data");
        SyncOutcome::Retained
      }
    }
  }
}

impl<B: KvBackend> Clone for LocalStore<B> {
  fn clone(&self) -> Self {
    Self {
      backend: Arc::clone(&self.backend),
      connectivity: self.connectivity.clone(),
    }
  }
}
