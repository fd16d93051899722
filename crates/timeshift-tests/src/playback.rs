//! End-to-end playback through the monitor: pre-roll, promotion lag,
//! pause and end handling, delay changes and refresh-rate adaptation.

use crate::support::{Harness, Host};
use timeshift_core::{Delay, TimingMode, Timestamp};
use timeshift_engine::{DelayMode, EngineConfig, Phase, Settings, TimingPolicy};

const REFRESH_INTERVAL_MS: f64 = 1000.0 / 60.0;
const DECODE_INTERVAL_MS: f64 = 2.0 * REFRESH_INTERVAL_MS;

fn ms(timestamp: Timestamp) -> f64 {
    timestamp.as_millis_f64()
}

#[test]
fn two_second_delay_shows_initial_frame_until_delay_elapsed() {
    let mut h = Harness::video(2000);

    h.run_until(20.0);
    let initial = h.shown().expect("initial frame drawn");
    assert_eq!(initial.sequence, 1);
    assert_eq!(initial.captured_at, Timestamp::ZERO);

    h.run_until_with(1999.0, |h| {
        assert_eq!(h.shown().map(|s| s.sequence), Some(1), "at {}ms", h.last_refresh_ms());
    });
    assert!(h.scheduler().delayed_frame().is_none());

    // the first frame after the initial one appears as soon as it is 2000ms old
    let mut refreshes = 0;
    while h.scheduler().delayed_frame().is_none() {
        h.step();
        refreshes += 1;
        assert!(refreshes <= 4, "no delayed frame by {}ms", h.last_refresh_ms());
    }
    let shown = h.shown().expect("delayed frame drawn");
    assert_eq!(shown.sequence, 2);
    assert!(ms(shown.captured_at) > 0.0, "{shown:?}");
    assert!(ms(shown.captured_at) <= DECODE_INTERVAL_MS + 1e-3, "{shown:?}");
    let lag = h.last_refresh_ms() - ms(shown.captured_at);
    assert!((1999.0..2000.0 + REFRESH_INTERVAL_MS).contains(&lag), "lag {lag}ms");
    assert!(h.scheduler().initial_frame().is_none());
}

#[test]
fn shown_frame_is_never_newer_than_the_delay_allows() {
    let mut h = Harness::video(500);
    let mut last_sequence = 0;

    h.run_until_with(5000.0, |h| {
        let Some(shown) = h.shown() else {
            return;
        };
        assert!(shown.sequence >= last_sequence, "went backwards at {}ms", h.last_refresh_ms());
        last_sequence = shown.sequence;
        if shown.sequence > 1 {
            let lag = h.last_refresh_ms() - ms(shown.captured_at);
            // one decode interval plus one refresh of slack
            assert!((499.0..535.0).contains(&lag), "lag {lag}ms at {}ms", h.last_refresh_ms());
        }
    });
    assert!(last_sequence > 100);
}

#[test]
fn pause_freezes_on_last_delayed_frame() {
    let mut h = Harness::video(1000);
    h.run_until(5000.0);

    let at_pause = h.shown().expect("playing");
    assert!((3900.0..=4000.0).contains(&ms(at_pause.captured_at)), "{at_pause:?}");

    let last_captured = h.scheduler().stats().captures;
    h.element_mut().paused = true;
    h.run_until(6001.0);
    assert_eq!(h.scheduler().phase(), Phase::Draining { cleared: false });

    // frames in flight keep promoting until the countdown expires, so the
    // freeze lands on the last frame captured before the pause
    let frozen = h.shown().expect("frame kept while paused");
    assert_eq!(frozen.sequence, last_captured);
    assert!(
        (5000.0 - DECODE_INTERVAL_MS - 1e-3..5000.0).contains(&ms(frozen.captured_at)),
        "{frozen:?}"
    );

    let draws = h.scheduler().gpu().draws.len();
    h.run_until(8000.0);
    assert_eq!(h.shown(), Some(frozen));
    assert_eq!(h.scheduler().gpu().draws.len(), draws);
    assert_eq!(h.scheduler().gpu().clears, 0);
}

#[test]
fn resume_after_pause_reprimes_past_the_watermark() {
    let mut h = Harness::video(1000);
    h.run_until(3000.0);
    h.element_mut().paused = true;
    h.run_until(4500.0);
    let captured = h.scheduler().stats().captures;

    h.element_mut().paused = false;
    h.run_until(4600.0);
    let scheduler = h.scheduler();
    assert_eq!(scheduler.phase(), Phase::Steady);
    assert_eq!(scheduler.watermark(), captured);
    assert!(scheduler.initial_frame().unwrap().sequence > captured);
    assert!(ms(scheduler.baseline().unwrap().at) >= 4490.0);
}

#[test]
fn short_pause_keeps_playing_without_reset() {
    let mut h = Harness::video(1000);
    h.run_until(3000.0);
    h.element_mut().paused = true;
    h.run_until(3300.0);
    assert!(h.scheduler().countdown().is_some());

    h.element_mut().paused = false;
    h.run_until(3400.0);
    assert!(h.scheduler().countdown().is_none());
    assert_eq!(h.scheduler().phase(), Phase::Steady);
    assert_eq!(h.scheduler().watermark(), 0);
}

#[test]
fn ended_source_clears_both_surfaces_after_delay() {
    let mut h = Harness::video(1000);
    h.run_until(3000.0);
    h.element_mut().ended = true;

    h.run_until(3900.0);
    assert_eq!(h.scheduler().phase(), Phase::Steady);

    h.run_until(4100.0);
    let scheduler = h.scheduler();
    assert_eq!(scheduler.phase(), Phase::Draining { cleared: true });
    assert_eq!(scheduler.held_frames(), 0);
    assert_eq!(scheduler.pool().checked_out_count(), 0);
    assert!(scheduler.gpu().clears > 0);
    assert!(scheduler.painter().shown.is_empty());
}

#[test]
fn shortening_delay_discards_frames_in_flight() {
    let mut h = Harness::video(2000);
    h.run_until(3000.0);

    let before = h.shown().expect("delayed frame").sequence;
    let newest = h.scheduler().current_sequence().expect("frames in flight");
    h.update_delay(500);
    assert_eq!(h.scheduler().watermark(), newest);
    let discards = h.scheduler().stats().discards;

    h.run_until_with(4000.0, |h| {
        let shown = h.shown().expect("something on screen").sequence;
        assert!(shown == before || shown > newest, "stale frame {shown} shown");
    });
    assert!(h.shown().unwrap().sequence > newest);
    assert!(h.scheduler().stats().discards > discards);
    assert_eq!(h.scheduler().pool().checked_out_count(), h.scheduler().held_frames());
}

#[test]
fn rapid_shortening_keeps_highest_watermark() {
    let mut h = Harness::video(3000);
    h.run_until(4000.0);

    let first = h.scheduler().current_sequence().unwrap();
    h.update_delay(2000);
    h.update_delay(2500);
    h.update_delay(1000);
    assert_eq!(h.scheduler().watermark(), first);

    h.run_until(4100.0);
    let later = h.scheduler().current_sequence().unwrap();
    assert!(later > first);
    h.update_delay(500);
    assert_eq!(h.scheduler().watermark(), later);
}

#[test]
fn longer_delay_keeps_frames_in_flight() {
    let mut h = Harness::video(500);
    h.run_until(2000.0);
    let in_flight = h.scheduler().in_flight();
    h.update_delay(1500);
    assert_eq!(h.scheduler().watermark(), 0);
    assert_eq!(h.scheduler().in_flight(), in_flight);
    assert_eq!(h.scheduler().delay(), Delay::from_millis(1500));
}

#[test]
fn high_refresh_display_switches_to_wall_clock() {
    let mut h = Harness::video(500).at_rate(144.0, 5);
    h.run_until(200.0);
    assert_eq!(h.scheduler().timing_mode(), TimingMode::WallClock);

    h.run_until_with(3000.0, |h| {
        if let Some(shown) = h.shown().filter(|s| s.sequence > 1) {
            let lag = h.last_refresh_ms() - ms(shown.captured_at);
            assert!((499.0..545.0).contains(&lag), "lag {lag}ms");
        }
    });
}

#[test]
fn sixty_hz_display_stays_on_frame_count() {
    let mut h = Harness::video(500);
    h.run_until(1000.0);
    assert_eq!(h.scheduler().timing_mode(), TimingMode::FrameCount);
}

#[test]
fn pinned_frame_count_policy_ignores_refresh_rate() {
    let config = EngineConfig {
        timing_policy: TimingPolicy::FrameCount,
        ..EngineConfig::default()
    };
    let settings = Settings::new(DelayMode::Video, Delay::from_millis(500), true);
    let mut h = Harness::with(Host::default(), config, settings).at_rate(144.0, 5);
    h.run_until(2000.0);
    assert_eq!(h.scheduler().timing_mode(), TimingMode::FrameCount);

    // 500ms is 30 nominal refreshes, about 208ms at 144 Hz
    let shown = h.shown().unwrap();
    let lag = h.last_refresh_ms() - ms(shown.captured_at);
    assert!(lag < 300.0, "lag {lag}ms");
}
