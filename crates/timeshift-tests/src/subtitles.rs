//! Captions delayed alongside the picture.

use crate::support::{CaptionPage, Harness, Host, VIDEO};
use timeshift_core::Delay;
use timeshift_engine::{DelayMode, EngineConfig, Settings};

fn with_page(page: CaptionPage, delay_ms: u64) -> Harness {
    let host = Host {
        page,
        ..Host::default()
    };
    Harness::with(
        host,
        EngineConfig::default(),
        Settings::new(DelayMode::Video, Delay::from_millis(delay_ms), true),
    )
}

#[test]
fn caption_change_appears_with_its_frame() {
    let mut h = with_page(CaptionPage::styled("first"), 500);
    h.run_until(1000.0);
    assert_eq!(h.caption_text(), "first");
    assert_eq!(h.monitor.platform().page.opacity(), Some("0"));

    h.monitor.platform_mut().page.set_styled("second");
    h.run_until(1400.0);
    assert_eq!(h.caption_text(), "first");

    h.run_until_with(1600.0, |h| {
        if h.caption_text() == "second" {
            let shown = h.shown().expect("frame on screen");
            assert!(shown.captured_at.as_millis_f64() >= 999.0, "{shown:?}");
        }
    });
    assert_eq!(h.caption_text(), "second");
}

#[test]
fn styled_markup_is_painted_per_run() {
    let mut h = with_page(CaptionPage::styled("<i>quiet</i> <b>LOUD</b>"), 200);
    h.run_until(500.0);
    let painted = &h.scheduler().painter().shown;
    assert!(painted.iter().any(|t| t.contains("quiet")), "{painted:?}");
    assert!(painted.iter().any(|t| t.contains("LOUD")), "{painted:?}");
}

#[test]
fn rollup_window_keeps_last_two_lines() {
    let page = CaptionPage::rollup(&[&["one"], &["two"], &["three", "more"]]);
    let mut h = with_page(page, 300);
    h.run_until(600.0);
    assert_eq!(h.caption_text(), "two three more");
}

#[test]
fn detach_restores_native_captions() {
    let mut h = with_page(CaptionPage::styled("hello"), 300);
    h.run_until(600.0);
    assert_eq!(h.monitor.platform().page.opacity(), Some("0"));

    let now = h.now();
    h.monitor.on_emptied(VIDEO, now);
    assert_eq!(h.monitor.platform().page.opacity(), None);
}

#[test]
fn page_without_captions_is_left_alone() {
    let mut h = Harness::video(300);
    h.run_until(600.0);
    assert!(!h.scheduler().subtitles().is_active());
    assert!(h.monitor.platform().page.styles.is_empty());
    assert!(h.caption_text().is_empty());
}

#[test]
fn shortened_delay_resamples_current_caption() {
    let mut h = with_page(CaptionPage::styled("a"), 2000);
    h.run_until(1000.0);
    h.monitor.platform_mut().page.set_styled("b");
    h.run_until(1500.0);
    assert!(h.caption_text().is_empty());

    h.update_delay(500);
    h.run_until(2100.0);
    assert_eq!(h.caption_text(), "b");
}

#[test]
fn ended_source_clears_captions() {
    let mut h = with_page(CaptionPage::styled("bye"), 300);
    h.run_until(1000.0);
    assert_eq!(h.caption_text(), "bye");

    h.element_mut().ended = true;
    h.run_until(1500.0);
    assert!(h.caption_text().is_empty());
}
