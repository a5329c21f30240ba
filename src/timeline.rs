//! Host timeline data and the source that supplies it.
//!
//! A host exposes one or more timelines, each a list of tempo changes and a
//! list of time signature changes. The engine pulls a [`Timeline`] from a
//! [`TimelineSource`] whenever a [`TimelineNotification`] says the selected
//! one changed.

use crate::error::{Result, SyncError};
use log::{debug, info};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

pub type TimelineId = u64;

/// A tempo sample: `quarter_position` quarter notes fall at `time_position` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TempoChangeEvent {
    pub time_position: f64,
    pub quarter_position: f64,
}

impl TempoChangeEvent {
    pub fn new(time_position: f64, quarter_position: f64) -> Self {
        Self {
            time_position,
            quarter_position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TimeSignatureChangeEvent {
    pub quarter_position: f64,
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignatureChangeEvent {
    pub fn new(quarter_position: f64, numerator: u32, denominator: u32) -> Self {
        Self {
            quarter_position,
            numerator,
            denominator,
        }
    }
}

/// Tempo and meter events of one host timeline, both ordered by position.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub tempo: Vec<TempoChangeEvent>,
    #[serde(default)]
    pub signatures: Vec<TimeSignatureChangeEvent>,
}

impl Timeline {
    pub fn new(tempo: Vec<TempoChangeEvent>, signatures: Vec<TimeSignatureChangeEvent>) -> Self {
        Self { tempo, signatures }
    }

    /// Constant tempo and meter from the origin up to `seconds`.
    pub fn constant(bpm: f64, numerator: u32, denominator: u32, seconds: f64) -> Self {
        let quarters = seconds * bpm / 60.0;
        Self {
            tempo: vec![
                TempoChangeEvent::new(0.0, 0.0),
                TempoChangeEvent::new(seconds, quarters),
            ],
            signatures: vec![TimeSignatureChangeEvent::new(0.0, numerator, denominator)],
        }
    }

    /// Reads a timeline description (`[[tempo]]` and `[[signatures]]` tables) from any
    /// format the `config` crate understands.
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading timeline from {}", path.display());
        let timeline: Timeline = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        debug!(
            "Timeline has {} tempo events and {} signature events",
            timeline.tempo.len(),
            timeline.signatures.len()
        );
        Ok(timeline)
    }

    /// At least two tempo events and one signature are needed to build a tick map.
    pub fn is_sufficient(&self) -> bool {
        self.tempo.len() > 1 && !self.signatures.is_empty()
    }
}

/// Change notifications delivered by the host on its non-realtime thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineNotification {
    Added(TimelineId),
    ContentChanged {
        id: TimelineId,
        /// Whether tempo or meter content was part of the change
        affects_timeline: bool,
    },
    Destroyed(TimelineId),
}

/// Supplies timeline content on demand.
pub trait TimelineSource: Send {
    /// Known timelines, in host order
    fn timeline_ids(&self) -> Vec<TimelineId>;

    fn timeline(&self, id: TimelineId) -> Option<Timeline>;

    fn fetch(&self, id: TimelineId) -> Result<Timeline> {
        self.timeline(id).ok_or(SyncError::UnknownTimeline(id))
    }
}

impl<S: TimelineSource + Sync> TimelineSource for Arc<S> {
    fn timeline_ids(&self) -> Vec<TimelineId> {
        self.as_ref().timeline_ids()
    }

    fn timeline(&self, id: TimelineId) -> Option<Timeline> {
        self.as_ref().timeline(id)
    }
}

/// In-memory timeline source, shareable between the host side that edits it
/// and the engine that reads it.
#[derive(Debug, Default)]
pub struct StaticTimelineSource {
    timelines: RwLock<BTreeMap<TimelineId, Timeline>>,
}

impl StaticTimelineSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeline(id: TimelineId, timeline: Timeline) -> Self {
        let source = Self::new();
        source.insert(id, timeline);
        source
    }

    pub fn insert(&self, id: TimelineId, timeline: Timeline) {
        if let Ok(mut timelines) = self.timelines.write() {
            timelines.insert(id, timeline);
        }
    }

    pub fn remove(&self, id: TimelineId) -> Option<Timeline> {
        self.timelines
            .write()
            .ok()
            .and_then(|mut timelines| timelines.remove(&id))
    }
}

impl TimelineSource for StaticTimelineSource {
    fn timeline_ids(&self) -> Vec<TimelineId> {
        self.timelines
            .read()
            .map(|timelines| timelines.keys().copied().collect())
            .unwrap_or_default()
    }

    fn timeline(&self, id: TimelineId) -> Option<Timeline> {
        self.timelines
            .read()
            .ok()
            .and_then(|timelines| timelines.get(&id).cloned())
    }
}
