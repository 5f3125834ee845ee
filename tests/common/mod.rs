//! Common test utilities and helpers for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use proptest::prelude::*;

use nudgebot::brain::{Brain, MemoryBrain};
use nudgebot::reminder::scheduler::Origin;
use nudgebot::reminder::types::PersistedJob;

/// Standard proptest configuration with 100 iterations.
pub fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 100,
        ..ProptestConfig::default()
    }
}

/// Brain handle that can outlive the store that owns it; tests reopen the
/// same brain to simulate a process restart.
pub struct SharedBrain(pub Arc<MemoryBrain>);

impl Brain for SharedBrain {
    fn load(&self, key: &str) -> anyhow::Result<Option<Vec<PersistedJob>>> {
        self.0.load(key)
    }

    fn save(&self, key: &str, jobs: &[PersistedJob]) -> anyhow::Result<()> {
        self.0.save(key, jobs)
    }
}

pub fn origin() -> Origin {
    Origin {
        user_id: "alice".into(),
        room: "eng".into(),
        thread_id: None,
    }
}
