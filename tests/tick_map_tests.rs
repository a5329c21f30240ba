use pulsesync::timeline::{TempoChangeEvent, TimeSignatureChangeEvent};
use pulsesync::{Precision, SyncError, TickMap, TickMapBuilder, Timeline};

const SAMPLE_RATE: f64 = 44_100.0;

fn build(timeline: &Timeline) -> TickMap {
    TickMapBuilder::new(Precision::new(SAMPLE_RATE))
        .build(timeline)
        .expect("timeline should build")
}

fn assert_well_formed(map: &TickMap) {
    let precision = map.precision();
    for pair in map.segments().windows(2) {
        assert!(
            precision.less_than(pair[0].start_position, pair[1].start_position),
            "segments out of order: {:?}",
            pair
        );
    }
    for segment in map.segments() {
        assert!(segment.tick_length > 0.0);
        assert!(segment.bar_length_ticks >= 1);
        assert!(segment.tick_offset_at_start < segment.bar_length_ticks);
    }
}

/// 120 BPM for four quarters, 240 BPM after that, 4/4 then 3/4 from quarter 4.
fn tempo_and_meter_change() -> Timeline {
    Timeline::new(
        vec![
            TempoChangeEvent::new(0.0, 0.0),
            TempoChangeEvent::new(2.0, 4.0),
            TempoChangeEvent::new(4.0, 12.0),
        ],
        vec![
            TimeSignatureChangeEvent::new(0.0, 4, 4),
            TimeSignatureChangeEvent::new(4.0, 3, 4),
        ],
    )
}

#[test]
fn test_constant_120_bpm_four_four() {
    let map = build(&Timeline::constant(120.0, 4, 4, 2.0));
    assert_eq!(map.len(), 1);
    let segment = map.segments()[0];
    assert_eq!(segment.start_position, 0.0);
    assert!((segment.tick_length - 0.020833).abs() < 1e-6);
    assert_eq!(segment.bar_length_ticks, 96);
    assert_eq!(segment.tick_offset_at_start, 0);
}

#[test]
fn test_coinciding_tempo_and_meter_change_share_a_segment() {
    let map = build(&tempo_and_meter_change());
    assert_well_formed(&map);
    assert_eq!(map.len(), 2);

    let second = map.segments()[1];
    assert!(map.precision().equals(second.start_position, 2.0));
    assert!((second.tick_length - 1.0 / 96.0).abs() < 1e-12);
    assert_eq!(second.bar_length_ticks, 72);
    assert_eq!(second.tick_offset_at_start, 0);
}

#[test]
fn test_meter_change_after_last_tempo_event_is_appended() {
    let timeline = Timeline::new(
        vec![
            TempoChangeEvent::new(0.0, 0.0),
            TempoChangeEvent::new(1.0, 2.0),
        ],
        vec![
            TimeSignatureChangeEvent::new(0.0, 4, 4),
            // Quantized forward to the next 4/4 bar line at quarter 8
            TimeSignatureChangeEvent::new(6.0, 3, 4),
        ],
    );
    let map = build(&timeline);
    assert_well_formed(&map);
    assert_eq!(map.len(), 2);

    let tail = map.segments()[1];
    assert!(map.precision().equals(tail.start_position, 4.0));
    assert_eq!(tail.bar_length_ticks, 72);
    assert_eq!(tail.tick_length, map.segments()[0].tick_length);
}

#[test]
fn test_off_grid_tempo_change_keeps_segments_on_ticks() {
    let tick = 0.5 / 24.0;
    let change_at = tick * 30.7;
    let timeline = Timeline::new(
        vec![
            TempoChangeEvent::new(0.0, 0.0),
            TempoChangeEvent::new(change_at, change_at * 2.0),
            TempoChangeEvent::new(change_at + 3.0, change_at * 2.0 + 4.0),
        ],
        vec![
            TimeSignatureChangeEvent::new(0.0, 4, 4),
            TimeSignatureChangeEvent::new(1.0, 7, 8),
        ],
    );
    let map = build(&timeline);
    assert_well_formed(&map);

    // The straddling tick starts on the 30th tick of the first tempo
    assert!(map
        .segments()
        .iter()
        .any(|s| map.precision().equals(s.start_position, tick * 30.0)));
}

#[test]
fn test_insufficient_timelines_are_rejected() {
    let builder = TickMapBuilder::new(Precision::new(SAMPLE_RATE));

    let one_tempo = Timeline::new(
        vec![TempoChangeEvent::new(0.0, 0.0)],
        vec![TimeSignatureChangeEvent::new(0.0, 4, 4)],
    );
    assert!(matches!(
        builder.build(&one_tempo),
        Err(SyncError::InsufficientTimeline {
            tempo_events: 1,
            signature_events: 1
        })
    ));

    let no_meter = Timeline::new(
        vec![
            TempoChangeEvent::new(0.0, 0.0),
            TempoChangeEvent::new(1.0, 2.0),
        ],
        Vec::new(),
    );
    assert!(matches!(
        builder.build(&no_meter),
        Err(SyncError::InsufficientTimeline {
            signature_events: 0,
            ..
        })
    ));
}

#[test]
fn test_tempo_at_follows_segments() {
    let map = build(&tempo_and_meter_change());

    let before = map.tempo_at(1.0).unwrap();
    assert_eq!(before.bar_length_ticks, 96);
    assert!((before.tick_length - 1.0 / 48.0).abs() < 1e-12);

    let after = map.tempo_at(3.0).unwrap();
    assert_eq!(after.bar_length_ticks, 72);

    // Before the origin the first segment applies
    assert_eq!(map.tempo_at(-5.0).unwrap().bar_length_ticks, 96);
    // Past the last event the last segment keeps going
    assert_eq!(map.tempo_at(1_000.0).unwrap().bar_length_ticks, 72);
}

#[test]
fn test_next_tick_is_strictly_in_the_future() {
    let map = build(&tempo_and_meter_change());
    let tick = 1.0 / 48.0;
    for k in 0..400 {
        let position = k as f64 * tick * 0.37 + 0.001;
        for delay in [0.0, 0.013, -0.013] {
            let next = map.next_tick(position, delay).unwrap();
            assert!(
                next.position >= position,
                "tick {} before position {} (delay {})",
                next.position,
                position,
                delay
            );
            // Never more than one tick away
            let spacing = map.tempo_at(position - delay).unwrap().tick_length;
            assert!(next.position - position <= spacing + map.precision().epsilon());
        }
    }
}

#[test]
fn test_queries_are_idempotent() {
    let map = build(&tempo_and_meter_change());
    for position in [-0.3, 0.0, 0.5, 1.999, 2.0, 3.33] {
        assert_eq!(map.tempo_at(position), map.tempo_at(position));
        assert_eq!(map.next_tick(position, 0.01), map.next_tick(position, 0.01));
    }
}

#[test]
fn test_delay_shifts_ticks_later() {
    let map = build(&Timeline::constant(120.0, 4, 4, 4.0));
    let tick = 1.0 / 48.0;

    let plain = map.next_tick(tick * 10.0 + 0.001, 0.0).unwrap();
    assert!((plain.position - tick * 11.0).abs() < 1e-9);

    let delayed = map.next_tick(tick * 10.0 + 0.001, 0.005).unwrap();
    assert!((delayed.position - (tick * 10.0 + 0.005)).abs() < 1e-9);

    let early = map.next_tick(tick * 10.0 + 0.001, -0.005).unwrap();
    assert!((early.position - (tick * 11.0 - 0.005)).abs() < 1e-9);
}

#[test]
fn test_bar_accent_flag_after_meter_change() {
    let map = build(&tempo_and_meter_change());
    let start = 2.0;
    let tick = 1.0 / 96.0;

    // 3/4 from 2.0 s: sub-beat 71 is the last of the bar
    let last = map.next_tick(start + tick * 70.5, 0.0).unwrap();
    assert!(last.last_tick_before_bar);
    assert!((last.position - (start + tick * 71.0)).abs() < 1e-9);

    let first = map.next_tick(start + tick * 71.5, 0.0).unwrap();
    assert!(!first.last_tick_before_bar);
}

#[test]
fn test_tempo_change_mid_bar_carries_bar_position() {
    // 120 BPM for one quarter, then 60 BPM, all in 4/4
    let timeline = Timeline::new(
        vec![
            TempoChangeEvent::new(0.0, 0.0),
            TempoChangeEvent::new(0.5, 1.0),
            TempoChangeEvent::new(4.5, 5.0),
        ],
        vec![TimeSignatureChangeEvent::new(0.0, 4, 4)],
    );
    let map = build(&timeline);
    assert_well_formed(&map);
    assert_eq!(map.len(), 2);

    let slow = map.segments()[1];
    assert!(map.precision().equals(slow.start_position, 0.5));
    assert!((slow.tick_length - 1.0 / 24.0).abs() < 1e-12);
    assert_eq!(slow.bar_length_ticks, 96);
    assert_eq!(slow.tick_offset_at_start, 24);

    // Sub-beats 24..=95 at the slow tempo put the bar line at 3.5 s
    let last = map.next_tick(3.45, 0.0).unwrap();
    assert!(last.last_tick_before_bar);
    assert!((last.position - (3.5 - 1.0 / 24.0)).abs() < 1e-9);

    let downbeat = map.next_tick(3.47, 0.0).unwrap();
    assert!(!downbeat.last_tick_before_bar);
    assert!((downbeat.position - 3.5).abs() < 1e-9);
}

#[test]
fn test_tempo_change_after_meter_change_counts_from_new_bar() {
    // 3/4 from quarter 4 (2.0 s), 60 BPM from quarter 5 (2.5 s)
    let timeline = Timeline::new(
        vec![
            TempoChangeEvent::new(0.0, 0.0),
            TempoChangeEvent::new(2.5, 5.0),
            TempoChangeEvent::new(4.5, 7.0),
        ],
        vec![
            TimeSignatureChangeEvent::new(0.0, 4, 4),
            TimeSignatureChangeEvent::new(4.0, 3, 4),
        ],
    );
    let map = build(&timeline);
    assert_well_formed(&map);
    assert_eq!(map.len(), 3);

    let meter = map.segments()[1];
    assert!(map.precision().equals(meter.start_position, 2.0));
    assert_eq!(meter.bar_length_ticks, 72);
    assert_eq!(meter.tick_offset_at_start, 0);

    let slow = map.segments()[2];
    assert!(map.precision().equals(slow.start_position, 2.5));
    assert!((slow.tick_length - 1.0 / 24.0).abs() < 1e-12);
    assert_eq!(slow.bar_length_ticks, 72);
    assert_eq!(slow.tick_offset_at_start, 24);
    assert!(map
        .to_string()
        .contains("@2.500000: tickLen=0.041667 barLen=72 tickOffset=24"));

    // Sub-beats 24..=71 at 60 BPM end the bar at 4.5 s
    let last = map.next_tick(4.45, 0.0).unwrap();
    assert!(last.last_tick_before_bar);
    assert!((last.position - (4.5 - 1.0 / 24.0)).abs() < 1e-9);

    let downbeat = map.next_tick(4.47, 0.0).unwrap();
    assert!(!downbeat.last_tick_before_bar);
    assert!((downbeat.position - 4.5).abs() < 1e-9);
}

#[test]
fn test_display_dump_lists_every_segment() {
    let map = build(&tempo_and_meter_change());
    let dump = map.to_string();
    assert_eq!(dump.lines().count(), 2);
    assert!(dump.contains("120.00 BPM (4/4)"));
    assert!(dump.contains("240.00 BPM (3/4)"));
}
