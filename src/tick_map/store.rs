use super::TickMap;
use arc_swap::{ArcSwap, Guard};
use std::sync::Arc;

/// Shared slot holding the current tick map.
///
/// The rebuild side publishes whole maps; the audio thread loads the current
/// one without locking and sees either the old or the new map in full.
#[derive(Debug, Clone)]
pub struct TickMapStore {
    current: Arc<ArcSwap<TickMap>>,
}

impl Default for TickMapStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TickMapStore {
    pub fn new() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(TickMap::default())),
        }
    }

    pub fn publish(&self, map: TickMap) {
        self.current.store(Arc::new(map));
    }

    /// Lock-free read for the render path
    #[inline]
    pub fn load(&self) -> Guard<Arc<TickMap>> {
        self.current.load()
    }

    pub fn snapshot(&self) -> Arc<TickMap> {
        self.current.load_full()
    }
}
