use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use super::settings::ThresholdConfig;

/// Shared, runtime-mutable threshold store.
///
/// The configuration channel (admin API, control plane, whatever the host
/// wires up) calls [`update`](Self::update); every classification call
/// takes one [`snapshot`](Self::snapshot) up front, so a concurrent update
/// can never produce a torn challenge/block pair within a single request.
pub struct ThresholdStore {
    current: ArcSwap<ThresholdConfig>,
}

impl ThresholdStore {
    pub fn new(initial: ThresholdConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Latest threshold pair. Cheap enough to call per request.
    pub fn snapshot(&self) -> Arc<ThresholdConfig> {
        self.current.load_full()
    }

    /// Replace the threshold pair atomically.
    pub fn update(&self, next: ThresholdConfig) {
        info!(
            challenge = next.challenge,
            block = next.block,
            "Action thresholds updated"
        );
        self.current.store(Arc::new(next));
    }
}
