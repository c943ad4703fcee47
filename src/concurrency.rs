//! Single-flight guard for reconciliation passes
//!
//! At most one pass runs at a time. A trigger that arrives while a pass is in
//! flight is either dropped or folded into one follow-up pass, depending on the
//! configured [`OverlapPolicy`].

use clap::ValueEnum;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do with a trigger that arrives while a pass is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Drop the trigger
    Skip,
    /// Run one more pass right after the current one; extra triggers coalesce
    #[default]
    Queue,
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapPolicy::Skip => write!(f, "skip"),
            OverlapPolicy::Queue => write!(f, "queue"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassState {
    Idle,
    Running { rerun: bool },
}

/// Outcome of asking the guard for permission to run
pub enum Admission<'g> {
    /// Caller owns the running slot until the ticket is finished or dropped
    Started(PassTicket<'g>),
    /// A pass is running and will run once more when it finishes
    Queued,
    /// A pass is running and the trigger was dropped
    Rejected,
}

pub struct PassGuard {
    state: Mutex<PassState>,
}

impl PassGuard {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PassState::Idle),
        }
    }

    pub fn try_begin(&self, policy: OverlapPolicy) -> Admission<'_> {
        let mut state = self.state.lock();
        match (*state, policy) {
            (PassState::Idle, _) => {
                *state = PassState::Running { rerun: false };
                Admission::Started(PassTicket {
                    guard: self,
                    released: false,
                })
            }
            (PassState::Running { .. }, OverlapPolicy::Queue) => {
                *state = PassState::Running { rerun: true };
                Admission::Queued
            }
            (PassState::Running { .. }, OverlapPolicy::Skip) => Admission::Rejected,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), PassState::Running { .. })
    }
}

impl Default for PassGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Ownership of the running slot
///
/// Dropping the ticket (including during unwinding) returns the guard to idle.
pub struct PassTicket<'g> {
    guard: &'g PassGuard,
    released: bool,
}

impl PassTicket<'_> {
    /// Consume a queued re-run if there is one, otherwise release the slot
    ///
    /// Checking and releasing happen under one lock, so a trigger can never land
    /// between them and get lost.
    pub fn take_rerun(&mut self) -> bool {
        let mut state = self.guard.state.lock();
        match *state {
            PassState::Running { rerun: true } => {
                *state = PassState::Running { rerun: false };
                true
            }
            _ => {
                *state = PassState::Idle;
                self.released = true;
                false
            }
        }
    }
}

impl Drop for PassTicket<'_> {
    fn drop(&mut self) {
        if !self.released {
            *self.guard.state.lock() = PassState::Idle;
        }
    }
}
