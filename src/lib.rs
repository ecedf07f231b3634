//! Offline support for the Maa Sathi Seva app.
//!
//! Two independent layers keep the app usable without a network:
//! - [`store`]: a typed local key/value store for domain records with deferred sync
//! - [`worker`]: a network-fallback response cache with a versioned app shell

pub mod config;
pub mod connectivity;
pub mod logging;
pub mod records;
pub mod store;
pub mod sync;
pub mod worker;
