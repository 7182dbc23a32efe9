//! Distribution lifecycle and the guards built on it.
//!
//! Only `initialized` and `canceled` are stored. Whether a distribution has
//! started or ended is derived from the current time against its window:
//!
//! ```text
//! Uninitialized ──initialize──▶ Initialized ──cancel (before start)──▶ Canceled
//!                                    │
//!                                    └──time ≥ start──▶ Started ──time > end──▶ Ended
//! ```

use serde::{Deserialize, Serialize};

use drip_core::error::{DistributionError, StateError, TimingError};
use drip_core::types::Timestamp;

/// Where a distribution stands at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Uninitialized,
    /// Initialized, not yet started.
    Initialized,
    /// Within `[start, end]`.
    Started,
    /// After `end`.
    Ended,
    Canceled,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Lifecycle {
    initialized: bool,
    canceled: bool,
    start: Timestamp,
    end: Timestamp,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    pub fn phase(&self, now: Timestamp) -> Phase {
        if !self.initialized {
            Phase::Uninitialized
        } else if self.canceled {
            Phase::Canceled
        } else if now < self.start {
            Phase::Initialized
        } else if now <= self.end {
            Phase::Started
        } else {
            Phase::Ended
        }
    }

    pub fn require_uninitialized(&self) -> Result<(), StateError> {
        if self.initialized {
            return Err(StateError::AlreadyInitialized);
        }
        Ok(())
    }

    pub(crate) fn mark_initialized(&mut self, start: Timestamp, end: Timestamp) {
        self.initialized = true;
        self.start = start;
        self.end = end;
    }

    /// Cancel is only possible once, and strictly before start.
    pub fn require_cancelable(&self, now: Timestamp) -> Result<(), DistributionError> {
        if !self.initialized {
            return Err(TimingError::NotInitialized.into());
        }
        if self.canceled {
            return Err(StateError::AlreadyCanceled.into());
        }
        if now >= self.start {
            return Err(StateError::CancelAfterStart { start: self.start, now }.into());
        }
        Ok(())
    }

    pub(crate) fn mark_canceled(&mut self) {
        self.canceled = true;
    }

    /// Open for new stakes: within `[start, end]`, not canceled.
    pub fn require_running(&self, now: Timestamp) -> Result<(), TimingError> {
        self.require_started(now)?;
        if now > self.end {
            return Err(TimingError::Ended { end: self.end, now });
        }
        Ok(())
    }

    /// Open for withdrawals, claims and reward changes: at or after start,
    /// not canceled.
    pub fn require_started(&self, now: Timestamp) -> Result<(), TimingError> {
        if !self.initialized {
            return Err(TimingError::NotInitialized);
        }
        if self.canceled {
            return Err(TimingError::Canceled);
        }
        if now < self.start {
            return Err(TimingError::NotStarted { start: self.start, now });
        }
        Ok(())
    }

    /// Reward top-ups must land while some of the window is still left.
    pub fn require_before_end(&self, now: Timestamp) -> Result<(), TimingError> {
        if now >= self.end {
            return Err(TimingError::Ended { end: self.end, now });
        }
        Ok(())
    }

    /// Locked distributions refuse withdrawals until strictly after end.
    pub fn require_unlocked(&self, locked: bool, now: Timestamp) -> Result<(), TimingError> {
        if locked && now <= self.end {
            return Err(TimingError::Locked { end: self.end, now });
        }
        Ok(())
    }

    pub fn require_canceled(&self) -> Result<(), TimingError> {
        if !self.canceled {
            return Err(TimingError::NotCanceled);
        }
        Ok(())
    }
}
