//! Worker lifecycle state machine.
//!
//! ```text
//! uninstalled -> installing -> installed -> activating -> activated
//!      ^              |                         |
//!      +--- failed ---+          installed <----+ failed
//! ```
//!
//! Transitions run under a single async guard, so install and activate never
//! overlap each other. The published state is readable without the guard.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use swcache_core::Error;
use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Activated,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Uninstalled => "uninstalled",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle events that change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Install,
    Activate,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Install => "install",
            Transition::Activate => "activate",
        }
    }
}

/// Outcome of a successful install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub generation: String,
    pub cached: Vec<String>,
    /// False when the generation already existed (reinstall of the same version).
    pub created: bool,
    pub skip_waiting: bool,
}

/// Outcome of a successful activate.
#[derive(Debug, Clone, Serialize)]
pub struct ActivateReport {
    pub generation: String,
    pub purged: Vec<String>,
    pub clients_claimed: bool,
}

#[derive(Debug)]
pub struct Lifecycle {
    state: RwLock<WorkerState>,
    transition: Mutex<()>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(WorkerState::Uninstalled),
            transition: Mutex::new(()),
            skip_waiting: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, state: WorkerState) {
        let mut current = self.state.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(from = %*current, to = %state, "lifecycle transition");
        *current = state;
    }

    /// Take the transition guard and check that `transition` is allowed.
    ///
    /// Install is accepted from `uninstalled` and `installed` (a reinstall
    /// before activation). Activate is accepted from `installed` only.
    pub async fn begin(&self, transition: Transition) -> Result<MutexGuard<'_, ()>, Error> {
        let guard = self.transition.lock().await;
        let state = self.state();
        let allowed = match transition {
            Transition::Install => matches!(state, WorkerState::Uninstalled | WorkerState::Installed),
            Transition::Activate => state == WorkerState::Installed,
        };
        if !allowed {
            return Err(Error::InvalidState { event: transition.as_str(), state: state.to_string() });
        }
        Ok(guard)
    }

    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn is_skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Take control of every open page context.
    pub fn claim_clients(&self) {
        self.clients_claimed.store(true, Ordering::SeqCst);
        tracing::info!("claimed open clients");
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.state() == WorkerState::Activated
    }
}
