use pulsesync::event_loop::{spawn_event_loop, EngineMessage};
use pulsesync::timeline::{TempoChangeEvent, TimeSignatureChangeEvent};
use pulsesync::{StaticTimelineSource, SyncEngine, Timeline, TimelineNotification};
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn bar_length_at(engine: &SyncEngine<Arc<StaticTimelineSource>>, position: f64) -> Option<u32> {
    engine
        .tick_map()
        .tempo_at(position)
        .map(|tempo| tempo.bar_length_ticks)
}

#[test]
fn test_added_timeline_is_selected_only_when_none_is() {
    init_logging();
    let source = Arc::new(StaticTimelineSource::new());
    let mut engine = SyncEngine::new(Arc::clone(&source), 44_100.0);
    assert_eq!(engine.selected(), None);

    source.insert(1, Timeline::constant(120.0, 4, 4, 4.0));
    engine.handle_notification(TimelineNotification::Added(1));
    assert_eq!(engine.selected(), Some(1));
    assert_eq!(bar_length_at(&engine, 0.0), Some(96));

    source.insert(2, Timeline::constant(120.0, 3, 4, 4.0));
    engine.handle_notification(TimelineNotification::Added(2));
    assert_eq!(engine.selected(), Some(1));
    assert_eq!(bar_length_at(&engine, 0.0), Some(96));
}

#[test]
fn test_content_change_of_other_timeline_selects_it() {
    init_logging();
    let source = Arc::new(StaticTimelineSource::new());
    source.insert(1, Timeline::constant(120.0, 4, 4, 4.0));
    source.insert(2, Timeline::constant(120.0, 6, 8, 4.0));
    let mut engine = SyncEngine::new(Arc::clone(&source), 44_100.0);
    assert_eq!(engine.selected(), Some(1));

    engine.handle_notification(TimelineNotification::ContentChanged {
        id: 2,
        affects_timeline: false,
    });
    assert_eq!(engine.selected(), Some(2));
    assert_eq!(bar_length_at(&engine, 0.0), Some(72));
}

#[test]
fn test_content_change_rebuilds_only_when_timeline_affected() {
    init_logging();
    let source = Arc::new(StaticTimelineSource::new());
    source.insert(1, Timeline::constant(120.0, 4, 4, 4.0));
    let mut engine = SyncEngine::new(Arc::clone(&source), 44_100.0);

    source.insert(1, Timeline::constant(120.0, 2, 4, 4.0));
    engine.handle_notification(TimelineNotification::ContentChanged {
        id: 1,
        affects_timeline: false,
    });
    assert_eq!(bar_length_at(&engine, 0.0), Some(96));

    engine.handle_notification(TimelineNotification::ContentChanged {
        id: 1,
        affects_timeline: true,
    });
    assert_eq!(bar_length_at(&engine, 0.0), Some(48));
}

#[test]
fn test_unusable_content_keeps_previous_map() {
    init_logging();
    let source = Arc::new(StaticTimelineSource::new());
    source.insert(1, Timeline::constant(120.0, 4, 4, 4.0));
    let mut engine = SyncEngine::new(Arc::clone(&source), 44_100.0);
    let before = engine.tick_map();

    source.insert(
        1,
        Timeline::new(
            vec![TempoChangeEvent::new(0.0, 0.0)],
            vec![TimeSignatureChangeEvent::new(0.0, 4, 4)],
        ),
    );
    engine.handle_notification(TimelineNotification::ContentChanged {
        id: 1,
        affects_timeline: true,
    });
    assert!(engine.rebuild().is_err());
    assert_eq!(engine.tick_map().segments(), before.segments());
}

#[test]
fn test_destroying_selected_timeline_clears_map() {
    init_logging();
    let source = Arc::new(StaticTimelineSource::new());
    source.insert(1, Timeline::constant(120.0, 4, 4, 4.0));
    source.insert(2, Timeline::constant(90.0, 4, 4, 4.0));
    let mut engine = SyncEngine::new(Arc::clone(&source), 44_100.0);

    source.remove(2);
    engine.handle_notification(TimelineNotification::Destroyed(2));
    assert_eq!(engine.selected(), Some(1));
    assert!(!engine.tick_map().is_empty());

    source.remove(1);
    engine.handle_notification(TimelineNotification::Destroyed(1));
    assert_eq!(engine.selected(), None);
    assert!(engine.tick_map().is_empty());
}

#[test]
fn test_event_loop_publishes_rebuilt_maps() {
    init_logging();
    let source = Arc::new(StaticTimelineSource::new());
    let engine = SyncEngine::new(Arc::clone(&source), 48_000.0);
    let store = engine.store().clone();
    assert!(store.snapshot().is_empty());

    let (tx, handle) = spawn_event_loop(engine).unwrap();
    source.insert(5, Timeline::constant(100.0, 4, 4, 10.0));
    tx.send(EngineMessage::Timeline(TimelineNotification::Added(5)))
        .unwrap();
    tx.send(EngineMessage::SampleRate(96_000.0)).unwrap();
    tx.send(EngineMessage::Shutdown).unwrap();

    let engine = handle.join().expect("event loop thread panicked");
    assert_eq!(engine.selected(), Some(5));
    assert_eq!(engine.sample_rate(), 96_000.0);

    let map = store.snapshot();
    assert_eq!(map.len(), 1);
    assert_eq!(map.precision().sample_rate(), 96_000.0);
    assert!((map.segments()[0].bpm() - 100.0).abs() < 1e-9);
}

#[test]
fn test_event_loop_stops_when_senders_drop() {
    init_logging();
    let engine = SyncEngine::new(StaticTimelineSource::new(), 44_100.0);
    let (tx, handle) = spawn_event_loop(engine).unwrap();
    drop(tx);
    let engine = handle.join().unwrap();
    assert_eq!(engine.selected(), None);
}

#[test]
fn test_event_loop_survives_invalid_sample_rates() {
    init_logging();
    let source = Arc::new(StaticTimelineSource::new());
    let engine = SyncEngine::new(Arc::clone(&source), 48_000.0);
    let store = engine.store().clone();

    let (tx, handle) = spawn_event_loop(engine).unwrap();
    for rate in [f64::NAN, f64::INFINITY, 0.0, -1.0] {
        tx.send(EngineMessage::SampleRate(rate)).unwrap();
    }
    source.insert(3, Timeline::constant(120.0, 4, 4, 4.0));
    tx.send(EngineMessage::Timeline(TimelineNotification::Added(3)))
        .unwrap();
    tx.send(EngineMessage::Shutdown).unwrap();

    let engine = handle.join().expect("event loop thread panicked");
    assert_eq!(engine.sample_rate(), 48_000.0);
    assert_eq!(engine.selected(), Some(3));
    assert_eq!(store.snapshot().precision().sample_rate(), 48_000.0);
    assert_eq!(store.snapshot().len(), 1);
}
