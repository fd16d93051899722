//! Audio delay routing through the monitor.

use crate::support::{Harness, Host, Video, VIDEO};
use timeshift_audio::Crossfade;
use timeshift_core::{Delay, ElementId, Timestamp};
use timeshift_engine::{DelayMode, EngineConfig, Monitor, Settings, SettingsMessage};
use timeshift_gpu::ReadyState;

/// One channel at 1 kHz so one sample is one millisecond.
fn config() -> EngineConfig {
    EngineConfig {
        audio_sample_rate: 1000,
        audio_channels: 1,
        ..EngineConfig::default()
    }
}

fn audio(delay_ms: u64) -> Harness {
    Harness::with(
        Host::default(),
        config(),
        Settings::new(DelayMode::Audio, Delay::from_millis(delay_ms), true),
    )
}

fn gains(h: &Harness) -> (f32, f32) {
    h.monitor
        .audio()
        .and_then(|graph| graph.route(VIDEO))
        .map(|route| route.gains())
        .expect("audio route")
}

fn impulse(len: usize) -> Vec<f32> {
    let mut block = vec![0.0; len];
    block[0] = 1.0;
    block
}

#[test]
fn zero_to_three_seconds_moves_to_wet_path_at_once() {
    let mut h = audio(0);
    assert_eq!(gains(&h), (0.0, 1.0));

    let input = impulse(16);
    let mut output = vec![0.0; 16];
    h.monitor.process_audio(VIDEO, &input, &mut output).unwrap();
    assert_eq!(output, input);

    h.update_delay(3000);
    let (wet, dry) = gains(&h);
    assert_eq!((wet, dry), (1.0, 0.0));
    assert_eq!(wet + dry, 1.0);

    let input = impulse(4000);
    let mut output = vec![0.0; 4000];
    h.monitor.process_audio(VIDEO, &input, &mut output).unwrap();
    let heard: Vec<usize> = output
        .iter()
        .enumerate()
        .filter(|(_, s)| **s != 0.0)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(heard, [3000]);
}

#[test]
fn audio_mode_never_attaches_video_scheduler() {
    let mut h = audio(1000);
    h.run_until(500.0);
    assert_eq!(h.monitor.scheduler_count(), 0);
    assert!(!h.element().concealed);
    assert_eq!(h.monitor.audio_route_count(), 1);
}

#[test]
fn switching_to_video_routes_dry_and_keeps_routes() {
    let mut h = audio(2000);
    assert_eq!(
        h.monitor.audio().unwrap().route(VIDEO).unwrap().crossfade(),
        Crossfade::Wet
    );

    let now = h.now();
    h.monitor.handle_message(
        &SettingsMessage::SetDelay {
            delay: Delay::from_millis(2000),
            mode: Some(DelayMode::Video),
            enabled: None,
        },
        now,
    );
    assert_eq!(gains(&h), (0.0, 1.0));
    assert_eq!(h.monitor.audio_route_count(), 1);
    assert!(h.monitor.audio().unwrap().route(VIDEO).unwrap().delay_line().is_passthrough());

    h.run_until(100.0);
    assert_eq!(h.monitor.scheduler_count(), 1);
}

#[test]
fn disabling_silences_the_wet_tail() {
    let mut h = audio(500);
    let mut output = vec![0.0; 100];
    h.monitor.process_audio(VIDEO, &[1.0; 100], &mut output).unwrap();
    assert!(output.iter().all(|s| *s == 0.0));

    let now = h.now();
    h.monitor.handle_message(
        &SettingsMessage::SetDelay {
            delay: Delay::from_millis(500),
            mode: None,
            enabled: Some(false),
        },
        now,
    );
    let mut output = vec![0.0; 600];
    h.monitor.process_audio(VIDEO, &[0.5; 600], &mut output).unwrap();
    assert!(output.iter().all(|s| *s == 0.5), "buffered samples leaked");
}

#[test]
fn routes_wait_for_metadata() {
    let mut monitor = Monitor::new(Host::default(), config());
    monitor.load_settings(
        Settings::new(DelayMode::Audio, Delay::from_millis(1000), true),
        Timestamp::ZERO,
    );
    let mut early = Video::playing(ElementId(4));
    early.ready = ReadyState::HaveNothing;
    monitor.discover(early);
    assert!(monitor.is_audio_pending(ElementId(4)));

    monitor.on_refresh(Timestamp::from_millis(16));
    assert_eq!(monitor.audio_route_count(), 0);

    monitor.element_mut(ElementId(4)).unwrap().ready = ReadyState::HaveMetadata;
    monitor.on_refresh(Timestamp::from_millis(33));
    assert_eq!(monitor.audio_route_count(), 1);
    assert!(!monitor.is_audio_pending(ElementId(4)));
}

#[test]
fn unrouted_elements_pass_through() {
    let mut h = audio(1000);
    let input = [0.25f32; 8];
    let mut output = [1.0f32; 10];
    h.monitor.process_audio(ElementId(99), &input, &mut output).unwrap();
    assert_eq!(&output[..8], &input);
    assert_eq!(&output[8..], &[0.0, 0.0]);
}
