//! Global staking pause flag shared by every distribution of a factory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use drip_core::traits::StakingPauseOracle;

/// Cloneable handle to one flag. Distributions only ever read it; the
/// factory is the only writer.
#[derive(Clone, Debug, Default)]
pub struct PauseSwitch(Arc<AtomicBool>);

impl PauseSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn set(&self, paused: bool) {
        self.0.store(paused, Ordering::Release);
    }
}

impl StakingPauseOracle for PauseSwitch {
    fn staking_paused(&self) -> bool {
        self.is_paused()
    }
}
