//! Non-realtime half of the synchroniser.
//!
//! [`SyncEngine`] tracks which host timeline is selected, rebuilds the tick
//! map when that timeline changes and publishes it to the renderer through a
//! [`TickMapStore`].

use crate::config::Settings;
use crate::controls::Controls;
use crate::error::Result;
use crate::precision::Precision;
use crate::renderer::PulseRenderer;
use crate::tick_map::{TickMap, TickMapBuilder, TickMapStore};
use crate::timeline::{TimelineId, TimelineNotification, TimelineSource};
use log::{debug, info, warn};
use std::sync::Arc;

pub struct SyncEngine<S: TimelineSource> {
    source: S,
    selected: Option<TimelineId>,
    builder: TickMapBuilder,
    store: TickMapStore,
    controls: Arc<Controls>,
}

impl<S: TimelineSource> SyncEngine<S> {
    /// Creates the engine and selects the first timeline the source knows about.
    pub fn new(source: S, sample_rate: f64) -> Self {
        let mut engine = Self {
            source,
            selected: None,
            builder: TickMapBuilder::new(Precision::new(sample_rate)),
            store: TickMapStore::new(),
            controls: Arc::new(Controls::default()),
        };

        if let Some(&first) = engine.source.timeline_ids().first() {
            engine.select(Some(first));
        }
        engine
    }

    pub fn from_settings(source: S, settings: &Settings) -> Self {
        let engine = Self::new(source, settings.sample_rate);
        engine.controls.set_delay(settings.delay_seconds());
        engine.controls.set_always_on(!settings.only_when_playing);
        engine
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn selected(&self) -> Option<TimelineId> {
        self.selected
    }

    pub fn store(&self) -> &TickMapStore {
        &self.store
    }

    /// Current published map
    pub fn tick_map(&self) -> Arc<TickMap> {
        self.store.snapshot()
    }

    pub fn controls(&self) -> Arc<Controls> {
        Arc::clone(&self.controls)
    }

    pub fn sample_rate(&self) -> f64 {
        self.builder.precision().sample_rate()
    }

    /// A renderer reading this engine's map and controls. It still has to be
    /// prepared before use.
    pub fn create_renderer(&self) -> PulseRenderer {
        PulseRenderer::new(self.store.clone(), self.controls())
    }

    pub fn handle_notification(&mut self, notification: TimelineNotification) {
        debug!("Timeline notification: {:?}", notification);
        match notification {
            TimelineNotification::Added(id) => {
                if self.selected.is_none() {
                    self.select(Some(id));
                }
            }
            TimelineNotification::Destroyed(id) => {
                if self.selected == Some(id) {
                    self.select(None);
                }
            }
            TimelineNotification::ContentChanged {
                id,
                affects_timeline,
            } => {
                if self.selected != Some(id) {
                    self.select(Some(id));
                } else if affects_timeline {
                    self.rebuild_or_keep();
                }
            }
        }
    }

    /// Rebuilds with a new comparison precision so that the map and the
    /// renderer agree on what "the same sample" means.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            warn!("Ignoring invalid sample rate {}", sample_rate);
            return;
        }
        info!("Sample rate changed to {} Hz", sample_rate);
        self.builder.set_precision(Precision::new(sample_rate));
        self.rebuild_or_keep();
    }

    /// Rebuilds the tick map for the selected timeline and publishes it.
    ///
    /// With no selection an empty map is published. On error the previous
    /// map stays in place.
    pub fn rebuild(&mut self) -> Result<()> {
        let Some(id) = self.selected else {
            info!("No timeline selected, clearing tick map");
            self.store.publish(TickMap::empty(self.builder.precision()));
            return Ok(());
        };

        let timeline = self.source.fetch(id)?;
        let map = self.builder.build(&timeline)?;
        info!(
            "Rebuilt tick map for timeline {}: {} segments",
            id,
            map.len()
        );
        debug!("Tick map for timeline {}:\n{}", id, map);
        self.store.publish(map);
        Ok(())
    }

    fn select(&mut self, id: Option<TimelineId>) {
        match id {
            Some(id) => info!("Selected timeline {}", id),
            None => info!("Timeline {:?} deselected", self.selected),
        }
        self.selected = id;
        self.rebuild_or_keep();
    }

    fn rebuild_or_keep(&mut self) {
        if let Err(e) = self.rebuild() {
            warn!("Keeping previous tick map: {}", e);
        }
    }
}
