//! Attach/detach, visibility, element replacement and texture accounting.

use crate::support::{CaptionPage, Harness, Host, RecordingGpu, RecordingPainter, Video, VIDEO};
use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;
use timeshift_core::{Delay, ElementId, Timestamp};
use timeshift_engine::{
    DelayMode, DelayScheduler, EngineConfig, OverlayPlan, Phase, Settings, SettingsMessage,
};

#[test]
fn hidden_interval_does_not_count_toward_delay() {
    let mut h = Harness::video(500);
    h.run_until(2000.0);
    let refreshes = h.scheduler().refresh_count();

    h.monitor.set_visible(false);
    h.run_until(4000.0);
    assert_eq!(h.scheduler().refresh_count(), refreshes);

    h.monitor.set_visible(true);
    let captured = h.scheduler().stats().captures;
    assert_eq!(h.scheduler().phase(), Phase::Reset);
    assert_eq!(h.scheduler().held_frames(), 0);
    assert_eq!(h.scheduler().watermark(), captured);

    h.run_until(4100.0);
    assert_eq!(h.scheduler().phase(), Phase::Steady);
    assert!(h.scheduler().initial_frame().unwrap().sequence > captured);

    h.run_until(4700.0);
    let shown = h.shown().unwrap();
    assert!(shown.captured_at.as_millis_f64() >= 3990.0, "{shown:?}");
}

#[test]
fn emptied_source_detaches_once_and_rewatches() {
    let mut h = Harness::video(500);
    h.run_until(1000.0);
    assert!(h.element().concealed);

    let now = h.now();
    h.monitor.on_emptied(VIDEO, now);
    h.monitor.on_emptied(VIDEO, now);
    assert_eq!(h.monitor.draining_count(), 1);
    assert_eq!(h.monitor.platform().removed, [VIDEO]);
    assert!(!h.element().concealed);
    assert!(h.monitor.platform().overlays.is_empty());

    // a fresh scheduler attaches on the next decoded frame
    h.run_until(1100.0);
    assert_eq!(h.monitor.draining_count(), 0);
    assert_eq!(h.monitor.platform().surfaces_created, 2);
    assert_eq!(h.scheduler().phase(), Phase::Steady);
    assert_eq!(h.scheduler().initial_frame().unwrap().sequence, 1);
    assert!(h.element().concealed);
}

#[test]
fn removed_element_is_forgotten() {
    let mut h = Harness::video(500);
    h.run_until(500.0);
    let now = h.now();

    let video = h.monitor.remove_element(VIDEO, now).expect("tracked");
    assert!(!video.concealed);
    assert_eq!(h.monitor.scheduler_count(), 0);
    assert!(h.monitor.element(VIDEO).is_none());
    assert!(!h.monitor.on_decoded_frame(VIDEO, now));

    let replacement = ElementId(2);
    assert!(h.monitor.discover(Video::playing(replacement)));
    assert!(h.monitor.on_decoded_frame(replacement, now));
    assert!(h.monitor.scheduler(replacement).is_some());
}

#[test]
fn refused_surfaces_leave_element_untouched() {
    let host = Host {
        refuse_surfaces: true,
        ..Host::default()
    };
    let settings = Settings::new(DelayMode::Video, Delay::from_millis(500), true);
    let mut h = Harness::with(host, EngineConfig::default(), settings);
    h.run_until(200.0);

    assert_eq!(h.monitor.scheduler_count(), 0);
    assert!(!h.element().concealed);
    assert!(h.monitor.platform().overlays.is_empty());
}

#[test]
fn disabling_detaches_and_stops_watching() {
    let mut h = Harness::video(500);
    h.run_until(1000.0);

    let now = h.now();
    h.monitor.handle_message(
        &SettingsMessage::SetDelay {
            delay: Delay::from_millis(500),
            mode: None,
            enabled: Some(false),
        },
        now,
    );
    assert!(!h.monitor.is_watching());
    assert_eq!(h.monitor.scheduler_count(), 0);

    h.run_until(1500.0);
    assert_eq!(h.monitor.scheduler_count(), 0);
    assert_eq!(h.monitor.draining_count(), 0);

    let now = h.now();
    h.monitor.handle_message(
        &SettingsMessage::SetDelay {
            delay: Delay::from_millis(800),
            mode: None,
            enabled: Some(true),
        },
        now,
    );
    h.run_until(1600.0);
    assert_eq!(h.scheduler().delay(), Delay::from_millis(800));
}

#[test]
fn update_while_disabled_keeps_everything_stopped() {
    let settings = Settings::new(DelayMode::Video, Delay::from_millis(500), false);
    let mut h = Harness::with(Host::default(), EngineConfig::default(), settings);
    h.update_delay(900);
    h.run_until(500.0);
    assert_eq!(h.monitor.scheduler_count(), 0);
    assert_eq!(h.monitor.settings().delay, Delay::from_millis(900));
}

#[test]
fn settings_lines_drive_the_monitor() {
    let mut h = Harness::video(500);
    h.run_until(1000.0);

    let now = h.now();
    let line = r#"{"type":"updateDelay","delay":1200}"#;
    let message = SettingsMessage::from_json(line).unwrap();
    h.monitor.handle_message(&message, now);
    assert_eq!(h.scheduler().delay(), Delay::from_millis(1200));

    let line = r#"{"type":"setDelay","delay":3000,"mode":"Audio"}"#;
    let message = SettingsMessage::from_json(line).unwrap();
    h.monitor.handle_message(&message, now);
    assert_eq!(h.monitor.settings().mode, DelayMode::Audio);
    assert_eq!(h.monitor.scheduler_count(), 0);
    assert_eq!(h.monitor.audio_route_count(), 1);

    assert!(SettingsMessage::from_json(r#"{"type":"resize"}"#).is_err());
}

#[test]
fn resize_moves_overlays_and_resizes_surface() {
    let mut h = Harness::video(500);
    h.run_until(1000.0);
    assert_eq!(h.scheduler().gpu().size, (32, 18));

    h.element_mut().layout.video_size = (64, 36);
    h.monitor.on_resize(VIDEO);
    assert_eq!(h.scheduler().gpu().size, (64, 36));
    assert_eq!(h.monitor.platform().overlays[&VIDEO].video.backing, (64, 36));

    let draws = h.scheduler().gpu().draws.len();
    h.step();
    assert!(h.scheduler().gpu().draws.len() > draws);
}

fn attach(page: &mut CaptionPage, delay_ms: u64) -> DelayScheduler<RecordingGpu, RecordingPainter> {
    let video = Video::playing(VIDEO);
    DelayScheduler::attach(
        VIDEO,
        RecordingGpu::default(),
        RecordingPainter::default(),
        page,
        &OverlayPlan::for_layout(&video.layout),
        &EngineConfig::default(),
        Delay::from_millis(delay_ms),
    )
}

#[test]
fn double_detach_releases_every_texture_once() {
    let mut page = CaptionPage::styled("hello");
    let mut scheduler = attach(&mut page, 300);
    let mut video = Video::playing(VIDEO);

    for k in 0..60u64 {
        let now = Timestamp::from_millis(k * 16);
        scheduler.on_refresh(&video, now);
        video.advance();
        scheduler.on_decoded_frame(&video, &page, now);
    }
    assert_eq!(page.opacity(), Some("0"));

    let now = Timestamp::from_millis(1000);
    assert!(scheduler.detach(&mut page, now));
    assert!(!scheduler.detach(&mut page, now));
    assert_eq!(page.opacity(), None);
    assert_eq!(scheduler.pool().checked_out_count(), 0);

    assert!(!scheduler.poll_teardown(now + Duration::from_millis(20)));
    assert!(scheduler.poll_teardown(now + Duration::from_millis(40)));
    assert!(!scheduler.poll_teardown(now + Duration::from_millis(80)));
    assert!(!scheduler.force_teardown());
    assert!(scheduler.is_torn_down());

    let gpu = scheduler.gpu();
    let unique: HashSet<_> = gpu.deleted.iter().collect();
    assert_eq!(unique.len(), gpu.deleted.len(), "texture deleted twice");
    assert_eq!(gpu.deleted.len() as u64, scheduler.pool().created());
    assert_eq!(gpu.programs_deleted, 1);
    assert!(gpu.lost);
}

#[test]
fn shutdown_tears_down_without_waiting() {
    let mut h = Harness::video(500);
    h.run_until(1000.0);
    let now = h.now();
    h.monitor.shutdown(now);
    assert_eq!(h.monitor.scheduler_count(), 0);
    assert_eq!(h.monitor.draining_count(), 0);
    assert!(!h.element().concealed);
}

#[derive(Debug, Clone)]
enum Op {
    Run(u8),
    Pause(bool),
    End(bool),
    Visible(bool),
    Delay(u16),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1u8..60).prop_map(Op::Run),
        1 => any::<bool>().prop_map(Op::Pause),
        1 => any::<bool>().prop_map(Op::End),
        1 => any::<bool>().prop_map(Op::Visible),
        1 => (0u16..1500).prop_map(Op::Delay),
    ]
}

proptest! {
    #[test]
    fn pool_accounts_for_every_texture(ops in proptest::collection::vec(op(), 1..40)) {
        let mut h = Harness::video(300);
        h.step();

        for op in ops {
            match op {
                Op::Run(n) => (0..n).for_each(|_| h.step()),
                Op::Pause(paused) => h.element_mut().paused = paused,
                Op::End(ended) => h.element_mut().ended = ended,
                Op::Visible(visible) => h.monitor.set_visible(visible),
                Op::Delay(ms) => h.update_delay(u64::from(ms)),
            }

            let scheduler = h.scheduler();
            let pool = scheduler.pool();
            prop_assert_eq!(pool.checked_out_count(), scheduler.held_frames());
            prop_assert!(pool.idle_count() <= pool.capacity());
            prop_assert_eq!(scheduler.gpu().live.len() as u64, pool.live());
            prop_assert!(scheduler.held_frames() <= scheduler.stats().captures as usize);
        }
    }
}
