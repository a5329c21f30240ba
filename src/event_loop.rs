// event_loop.rs

use crate::engine::SyncEngine;
use crate::error::Result;
use crate::timeline::{TimelineNotification, TimelineSource};
use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{debug, info};
use std::thread::{self, JoinHandle};

/// Work for the rebuild thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineMessage {
    Timeline(TimelineNotification),
    SampleRate(f64),
    Shutdown,
}

/// Owns the engine on a non-realtime thread and applies messages in order.
pub struct EventLoop<S: TimelineSource> {
    engine: SyncEngine<S>,
    message_rx: Receiver<EngineMessage>,
}

impl<S: TimelineSource> EventLoop<S> {
    pub fn new(engine: SyncEngine<S>, message_rx: Receiver<EngineMessage>) -> Self {
        EventLoop { engine, message_rx }
    }

    /// Runs until `Shutdown` arrives or every sender is gone, then hands the
    /// engine back.
    pub fn run(mut self) -> SyncEngine<S> {
        info!("Event loop started");
        while let Ok(message) = self.message_rx.recv() {
            debug!("Engine message: {:?}", message);
            match message {
                EngineMessage::Timeline(notification) => {
                    self.engine.handle_notification(notification)
                }
                EngineMessage::SampleRate(sample_rate) => self.engine.set_sample_rate(sample_rate),
                EngineMessage::Shutdown => break,
            }
        }
        info!("Event loop stopped");
        self.engine
    }
}

/// Moves `engine` onto its own thread.
///
/// The renderer should be created from the engine beforehand; the store and
/// controls it shares stay live while the worker owns the engine.
pub fn spawn_event_loop<S>(
    engine: SyncEngine<S>,
) -> Result<(Sender<EngineMessage>, JoinHandle<SyncEngine<S>>)>
where
    S: TimelineSource + 'static,
{
    let (message_tx, message_rx) = unbounded();
    let handle = thread::Builder::new()
        .name("pulsesync-rebuild".into())
        .spawn(move || EventLoop::new(engine, message_rx).run())?;
    Ok((message_tx, handle))
}
