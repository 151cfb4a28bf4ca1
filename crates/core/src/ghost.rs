//! Ghost lifecycle: deferred loading state machine.
//!
//! A ghost is an object that has an identity but no field data yet. Its status
//! moves strictly forward, one step at a time:
//!
//! ```text
//! GHOST ──mark_loading──▶ LOADING ──mark_loaded──▶ LOADED
//!   ▲                        │
//!   └────── abandon ─────────┘   (failed or cancelled load)
//! ```
//!
//! `LOADED` is terminal. The only backwards edge is `abandon`, taken when a load
//! fails or its future is dropped, so a later load can be attempted again.

use core::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::StateError;

/// Load status of a lazily loadable object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LoadStatus {
    Ghost,
    Loading,
    Loaded,
}

impl LoadStatus {
    const fn as_u8(self) -> u8 {
        match self {
            LoadStatus::Ghost => 0,
            LoadStatus::Loading => 1,
            LoadStatus::Loaded => 2,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LoadStatus::Ghost,
            1 => LoadStatus::Loading,
            _ => LoadStatus::Loaded,
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadStatus::Ghost => "GHOST",
            LoadStatus::Loading => "LOADING",
            LoadStatus::Loaded => "LOADED",
        };
        f.write_str(s)
    }
}

/// Lock-free lifecycle cell embedded by entities.
///
/// Transitions are compare-and-swap, so two concurrent `mark_loading` calls on
/// the same ghost cannot both succeed.
#[derive(Debug)]
pub struct Lifecycle {
    status: AtomicU8,
}

impl Lifecycle {
    /// Lifecycle for an object created without field data.
    pub fn ghost() -> Self {
        Self::with_status(LoadStatus::Ghost)
    }

    /// Lifecycle for a fully populated object (constructed in memory or decoded from a row).
    pub fn loaded() -> Self {
        Self::with_status(LoadStatus::Loaded)
    }

    fn with_status(status: LoadStatus) -> Self {
        Self {
            status: AtomicU8::new(status.as_u8()),
        }
    }

    pub fn status(&self) -> LoadStatus {
        LoadStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// GHOST -> LOADING.
    pub fn mark_loading(&self) -> Result<(), StateError> {
        self.transition(LoadStatus::Ghost, LoadStatus::Loading)
    }

    /// LOADING -> LOADED.
    pub fn mark_loaded(&self) -> Result<(), StateError> {
        self.transition(LoadStatus::Loading, LoadStatus::Loaded)
    }

    /// LOADING -> GHOST.
    pub fn abandon_loading(&self) -> Result<(), StateError> {
        self.transition(LoadStatus::Loading, LoadStatus::Ghost)
    }

    /// Move GHOST -> LOADING and return a guard that reverts to GHOST unless finished.
    pub fn begin_loading(&self) -> Result<LoadingGuard<'_>, StateError> {
        self.mark_loading()?;
        Ok(LoadingGuard {
            lifecycle: self,
            armed: true,
        })
    }

    fn transition(&self, from: LoadStatus, to: LoadStatus) -> Result<(), StateError> {
        self.status
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| StateError::InvalidTransition {
                from: LoadStatus::from_u8(actual),
                to,
            })
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::loaded()
    }
}

/// An in-flight load.
///
/// Dropping the guard without calling [`LoadingGuard::finish`] reverts the
/// lifecycle to GHOST.
#[derive(Debug)]
#[must_use = "dropping the guard abandons the load"]
pub struct LoadingGuard<'a> {
    lifecycle: &'a Lifecycle,
    armed: bool,
}

impl LoadingGuard<'_> {
    /// LOADING -> LOADED, consuming the guard.
    pub fn finish(mut self) -> Result<(), StateError> {
        self.armed = false;
        self.lifecycle.mark_loaded()
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.lifecycle.abandon_loading().is_ok() {
            tracing::warn!("load abandoned; object reverted to GHOST");
        }
    }
}

/// Ghost-lifecycle capability.
///
/// Entities only provide [`Ghost::lifecycle`]; the queries and transitions are
/// derived from it.
pub trait Ghost {
    fn lifecycle(&self) -> &Lifecycle;

    fn load_status(&self) -> LoadStatus {
        self.lifecycle().status()
    }

    fn is_ghost(&self) -> bool {
        self.load_status() == LoadStatus::Ghost
    }

    fn is_loaded(&self) -> bool {
        self.load_status() == LoadStatus::Loaded
    }

    fn mark_loading(&self) -> Result<(), StateError> {
        self.lifecycle().mark_loading()
    }

    fn mark_loaded(&self) -> Result<(), StateError> {
        self.lifecycle().mark_loaded()
    }
}
