//! Worker lifecycle phases.

use color_eyre::{eyre::eyre, Result};
use std::fmt;

/// Lifecycle phase of a cache worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerPhase {
  /// Created, nothing cached yet
  #[default]
  Parsed,
  /// Precaching the app shell
  Installing,
  /// Precache complete, waiting to activate
  Installed,
  /// Purging stale cache generations
  Activating,
  /// Serving intercepted requests
  Activated,
  /// Install failed; the worker never serves
  Redundant,
}

/// Lifecycle step applied to a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStep {
  BeginInstall,
  InstallSucceeded,
  InstallFailed,
  BeginActivate,
  ActivateFinished,
  /// Restart of a worker whose cache generation already exists
  Resume,
}

impl WorkerPhase {
  /// Phase after `step`, or an error if the step is not valid here.
  pub fn advance(self, step: LifecycleStep) -> Result<Self> {
    use LifecycleStep::*;
    use WorkerPhase::*;

    match (self, step) {
      (Parsed, BeginInstall) => Ok(Installing),
      (Installing, InstallSucceeded) => Ok(Installed),
      (Installing, InstallFailed) => Ok(Redundant),
      (Installed, BeginActivate) => Ok(Activating),
      (Activating, ActivateFinished) => Ok(Activated),
      (Parsed, Resume) => Ok(Activated),
      (phase, step) => Err(eyre!("Cannot apply {:?} while {}", step, phase)),
    }
  }

  pub fn is_serving(self) -> bool {
    self == WorkerPhase::Activated
  }
}

impl fmt::Display for WorkerPhase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Parsed => "parsed",
      Self::Installing => "installing",
      Self::Installed => "installed",
      Self::Activating => "activating",
      Self::Activated => "activated",
      Self::Redundant => "redundant",
    };
    f.write_str(name)
  }
}
