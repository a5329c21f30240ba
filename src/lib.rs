//! Audio-rate tick pulses that keep an external device locked to a host timeline.
//!
//! A [`SyncEngine`] turns the selected host [`Timeline`] into a [`TickMap`]
//! off the audio thread; a [`PulseRenderer`] reads the latest map on every
//! block and writes the pulse train.

pub mod cli;
pub mod config;
pub mod controls;
pub mod engine;
pub mod error;
pub mod event_loop;
pub mod logging;
pub mod offline;
pub mod precision;
pub mod renderer;
pub mod tick_map;
pub mod timeline;
pub mod ui;

pub use cli::Args;
pub use config::Settings;
pub use controls::Controls;
pub use engine::SyncEngine;
pub use error::{Result, SyncError};
pub use precision::Precision;
pub use renderer::{PositionInfo, PulseRenderer, Realtime};
pub use tick_map::{TickMap, TickMapBuilder, TickMapStore};
pub use timeline::{StaticTimelineSource, Timeline, TimelineNotification, TimelineSource};
