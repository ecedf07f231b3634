//! Local persistence store for domain records.
//!
//! A typed wrapper over a key/value backend that lets pages render without
//! a network round trip:
//! - JSON values stored under string keys, last write wins
//! - Reads validate against the caller's type and fail closed
//! - Failures are logged, never returned
//! - Deferred sync flushes an entry once connectivity allows

mod backend;
mod local;

pub use backend::{KvBackend, MemoryKv, SqliteKv};
pub use local::{LocalStore, SyncOutcome};
