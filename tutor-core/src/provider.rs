//! Remote provider availability state.
//!
//! ```text
//! Uninitialized ──probe──▶ Probing ──success──▶ Available { model }
//!                             │                      │
//!                             └──exhausted──▶ Unavailable ◀──call failure──┘
//! ```
//!
//! `Available` is only reached through a successful probe, and a failed
//! live call downgrades it for good. Only an explicit new probe can bring
//! the provider back. Probing and Uninitialized both count as unavailable.
//!
//! The state is an owned value (usually behind an `Arc`) rather than a
//! global, so each test can build its own.

use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lifecycle of the remote provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProviderStatus {
    #[default]
    Uninitialized,
    Probing,
    Available {
        model: String,
    },
    Unavailable {
        reason: String,
    },
}

/// Point-in-time view of the provider state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    pub is_available: bool,
    pub active_model: Option<String>,
}

/// The model a live call was issued against, tagged with the probe that
/// selected it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveModel {
    pub model: String,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct Inner {
    status: ProviderStatus,
    /// Bumped by every probe.
    generation: u64,
}

/// Shared, thread-safe provider state.
#[derive(Debug, Default)]
pub struct ProviderState {
    inner: RwLock<Inner>,
}

impl ProviderState {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> ProviderStatus {
        self.read().status.clone()
    }

    pub fn is_available(&self) -> bool {
        matches!(self.read().status, ProviderStatus::Available { .. })
    }

    /// Model recorded by the last successful probe, while still available.
    pub fn active_model(&self) -> Option<String> {
        self.active().map(|active| active.model)
    }

    /// Like [`active_model`](Self::active_model), plus the probe generation
    /// to hand back to [`mark_failed`](Self::mark_failed).
    pub fn active(&self) -> Option<ActiveModel> {
        let inner = self.read();
        match &inner.status {
            ProviderStatus::Available { model } => Some(ActiveModel {
                model: model.clone(),
                generation: inner.generation,
            }),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> ProviderSnapshot {
        let active_model = self.active_model();
        ProviderSnapshot {
            is_available: active_model.is_some(),
            active_model,
        }
    }

    /// Enter `Probing`. If the returned guard is dropped without
    /// [`ProbeGuard::finish`] (e.g. the probe was cancelled) the state
    /// settles on `Unavailable` instead of staying in `Probing`.
    pub fn begin_probe(&self) -> ProbeGuard<'_> {
        let mut inner = self.write();
        inner.generation += 1;
        inner.status = ProviderStatus::Probing;
        ProbeGuard {
            state: self,
            generation: inner.generation,
            finished: false,
        }
    }

    /// Downgrade after a failed live call against `active`.
    ///
    /// Returns true only for the call that performed the transition.
    /// Failures from calls issued before the latest probe are ignored, even
    /// when that probe picked the same model id again.
    pub fn mark_failed(&self, active: &ActiveModel, reason: impl Into<String>) -> bool {
        let mut inner = self.write();
        if inner.generation != active.generation {
            return false;
        }
        match &inner.status {
            ProviderStatus::Available { model } if *model == active.model => {
                inner.status = ProviderStatus::Unavailable {
                    reason: reason.into(),
                };
                true
            }
            _ => false,
        }
    }

    fn settle_probe(&self, generation: u64, outcome: ProviderStatus) {
        let mut inner = self.write();
        if inner.generation == generation && inner.status == ProviderStatus::Probing {
            inner.status = outcome;
        }
    }
}

/// In-flight probe; see [`ProviderState::begin_probe`].
#[derive(Debug)]
pub struct ProbeGuard<'a> {
    state: &'a ProviderState,
    generation: u64,
    finished: bool,
}

impl ProbeGuard<'_> {
    /// Record the probe outcome: the responding model, or `None` when
    /// every candidate failed.
    pub fn finish(mut self, model: Option<String>) {
        self.finished = true;
        let outcome = match model {
            Some(model) => ProviderStatus::Available { model },
            None => ProviderStatus::Unavailable {
                reason: "no candidate model responded".to_string(),
            },
        };
        self.state.settle_probe(self.generation, outcome);
    }
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.settle_probe(
                self.generation,
                ProviderStatus::Unavailable {
                    reason: "probe cancelled".to_string(),
                },
            );
        }
    }
}
