//! Process-wide online/offline state.
//!
//! A single [`ConnectivityMonitor`] owns the state and is the only thing
//! allowed to change it. Everything else holds a [`Connectivity`] view,
//! which can take a snapshot or wait for transitions.

use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Read-only view of the connectivity state.
#[derive(Debug, Clone)]
pub struct Connectivity {
  rx: watch::Receiver<bool>,
}

impl Connectivity {
  /// Current state at call time. Not a subscription.
  pub fn is_online(&self) -> bool {
    *self.rx.borrow()
  }

  /// Independent receiver for awaiting transitions.
  pub fn subscribe(&self) -> watch::Receiver<bool> {
    self.rx.clone()
  }

  /// Wait for the next transition and return the new state.
  ///
  /// Returns `None` once the monitor has been dropped.
  pub async fn changed(&mut self) -> Option<bool> {
    self.rx.changed().await.ok()?;
    Some(*self.rx.borrow_and_update())
  }

  /// Register online/offline callbacks.
  ///
  /// Callbacks run on a background task for every transition after
  /// registration. Dropping the returned guard unregisters them.
  pub fn on_transition<On, Off>(&self, mut on_online: On, mut on_offline: Off) -> ListenerGuard
  where
    On: FnMut() + Send + 'static,
    Off: FnMut() + Send + 'static,
  {
    let mut rx = self.subscribe();
    rx.mark_unchanged();

    let handle = tokio::spawn(async move {
      while rx.changed().await.is_ok() {
        let online = *rx.borrow_and_update();
        if online {
          on_online();
        } else {
          on_offline();
        }
      }
    });

    ListenerGuard { handle }
  }
}

/// Keeps transition callbacks registered while alive.
#[derive(Debug)]
pub struct ListenerGuard {
  handle: JoinHandle<()>,
}

impl Drop for ListenerGuard {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

/// Owner of the connectivity state.
#[derive(Debug)]
pub struct ConnectivityMonitor {
  tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
  pub fn new(initially_online: bool) -> Self {
    let (tx, _rx) = watch::channel(initially_online);
    Self { tx }
  }

  pub fn connectivity(&self) -> Connectivity {
    Connectivity {
      rx: self.tx.subscribe(),
    }
  }

  /// Record an observed transition. Repeating the current state notifies no one.
  pub fn report(&self, online: bool) {
    let changed = self.tx.send_if_modified(|state| {
      if *state == online {
        false
      } else {
        *state = online;
        true
      }
    });

    if changed {
      info!(online, "Connectivity changed");
    }
  }

  /// Check reachability once and record the result.
  pub async fn check_reachability<F, Fut>(&self, check: F) -> bool
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
  {
    let online = match check().await {
      Ok(()) => true,
      Err(e) => {
        debug!(error = %e, "Reachability check failed");
        false
      }
    };
    self.report(online);
    online
  }
}

/// Reachability check against an origin with a HEAD request.
pub async fn head_check(client: &reqwest::Client, origin: &str) -> Result<()> {
  client
    .head(origin)
    .timeout(Duration::from_secs(5))
    .send()
    .await
    .map_err(|e| eyre!("HEAD {} failed: {}", origin, e))?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::sync::mpsc;

  #[test]
  fn test_snapshot_reflects_reports() {
    let monitor = ConnectivityMonitor::new(true);
    let view = monitor.connectivity();
    assert!(view.is_online());

    monitor.report(false);
    assert!(!view.is_online());
  }

  #[tokio::test]
  async fn test_changed_yields_new_state() {
    let monitor = ConnectivityMonitor::new(false);
    let mut view = monitor.connectivity();

    monitor.report(true);
    assert_eq!(view.changed().await, Some(true));

    drop(monitor);
    assert_eq!(view.changed().await, None);
  }

  #[tokio::test]
  async fn test_repeated_state_does_not_notify() {
    let monitor = ConnectivityMonitor::new(true);
    let mut rx = monitor.connectivity().subscribe();
    rx.mark_unchanged();

    monitor.report(true);
    assert!(!rx.has_changed().unwrap());
  }

  #[tokio::test]
  async fn test_callbacks_fire_until_guard_dropped() {
    let monitor = ConnectivityMonitor::new(true);
    let view = monitor.connectivity();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let guard = {
      let on = tx.clone();
      let off = tx;
      view.on_transition(
        move || {
          let _ = on.send(true);
        },
        move || {
          let _ = off.send(false);
        },
      )
    };

    monitor.report(false);
    assert_eq!(rx.recv().await, Some(false));

    monitor.report(true);
    assert_eq!(rx.recv().await, Some(true));

    // Both senders live in the listener; once it is gone the channel closes.
    drop(guard);
    monitor.report(false);
    assert_eq!(rx.recv().await, None);
  }

  #[tokio::test]
  async fn test_reachability_check_records_result() {
    let monitor = ConnectivityMonitor::new(true);
    let view = monitor.connectivity();

    let online = monitor
      .check_reachability(|| async { Err(eyre!("connection refused")) })
      .await;
    assert!(!online);
    assert!(!view.is_online());

    assert!(monitor.check_reachability(|| async { Ok(()) }).await);
    assert!(view.is_online());
  }
}
