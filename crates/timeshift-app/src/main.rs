//! Timeshift - delayed playback of a synthetic media element
//!
//! Drives the engine the way a browser would: a 60 Hz refresh tick, a
//! 30 fps decode tick, settings messages as JSON lines on stdin.

mod cli;
mod host;
mod sim;
mod sink;

use anyhow::{Context, Result};
use clap::Parser;
use cli::CliArgs;
use host::HostPlatform;
use sim::{SyntheticVideo, Tone};
use sink::LazySink;
use std::time::{Duration, Instant};
use timeshift_audio::AudioOutput;
use timeshift_core::{Delay, ElementId, Timestamp};
use timeshift_engine::{
    default_config_path, ConfigFile, DelayMode, EngineConfig, MediaElement, Monitor, Platform,
    Settings, SettingsMessage,
};
use timeshift_gpu::GpuContext;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const VIDEO_ID: ElementId = ElementId(1);
const REFRESH_INTERVAL: Duration = Duration::from_micros(16_667);
const DECODE_INTERVAL: Duration = Duration::from_micros(33_333);
const VIDEO_SIZE: (u32, u32) = (640, 360);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = match &config_path {
        Some(path) => EngineConfig::load_or_default(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if args.write_config {
        let path = config_path.context("no config path available on this platform")?;
        ConfigFile::new(config).save_to_file(&path)?;
        info!(path = %path.display(), "configuration written");
        return Ok(());
    }

    let settings = load_settings(&args)?;

    let audio = if settings.mode == DelayMode::Audio {
        match AudioOutput::open_default() {
            Ok(output) => {
                config.audio_sample_rate = output.sample_rate();
                config.audio_channels = output.channels();
                Some(output)
            }
            Err(err) => {
                warn!(%err, "audio output unavailable, processing silently");
                None
            }
        }
    } else {
        None
    };

    let context = if args.null_gpu {
        None
    } else {
        match GpuContext::new_blocking() {
            Ok(context) => {
                let adapter = context.adapter_info();
                info!(name = %adapter.name, backend = ?adapter.backend, "GPU ready");
                Some(context)
            }
            Err(err) => {
                warn!(%err, "no GPU adapter, using the null backend");
                None
            }
        }
    };

    let (message_tx, message_rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name("settings-stdin".to_string())
        .spawn(move || read_messages(message_tx))
        .context("spawning stdin reader")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("building runtime")?;

    runtime.block_on(run(
        config,
        settings,
        HostPlatform::new(context),
        audio,
        message_rx,
        Duration::from_secs(args.seconds),
    ))
}

fn load_settings(args: &CliArgs) -> Result<Settings> {
    let mut settings = match &args.settings {
        Some(path) => Settings::load_from_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::new(DelayMode::Video, Delay::from_millis(2000), true),
    };
    if args.audio {
        settings.mode = DelayMode::Audio;
    }
    if let Some(ms) = args.delay {
        settings.delay = Delay::from_millis(ms);
    }
    Ok(settings)
}

/// Forward one settings message per stdin line until stdin closes.
fn read_messages(tx: crossbeam_channel::Sender<SettingsMessage>) {
    for line in std::io::stdin().lines() {
        let Ok(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match SettingsMessage::from_json(line) {
            Ok(message) => {
                if tx.send(message).is_err() {
                    break;
                }
            }
            Err(err) => warn!(%err, "ignoring settings line"),
        }
    }
}

async fn run(
    config: EngineConfig,
    settings: Settings,
    platform: HostPlatform,
    audio: Option<AudioOutput>,
    messages: crossbeam_channel::Receiver<SettingsMessage>,
    length: Duration,
) -> Result<()> {
    let start = Instant::now();
    let clock = || Timestamp::from_millis_f64(start.elapsed().as_secs_f64() * 1000.0);

    let mut sink = LazySink::new(audio);
    // keep refreshing after the video ends so the delayed tail plays out
    let tail = settings.delay.as_duration() + Duration::from_millis(500);
    let mut monitor = Monitor::new(platform, config);
    monitor.load_settings(settings, clock());
    monitor.discover(SyntheticVideo::new(VIDEO_ID, VIDEO_SIZE.0, VIDEO_SIZE.1));

    let mut refresh = tokio::time::interval(REFRESH_INTERVAL);
    let mut decode = tokio::time::interval(DECODE_INTERVAL);
    let deadline = tokio::time::sleep(length + tail);
    tokio::pin!(deadline);

    let mut tone = Tone::new(440.0);
    let mut samples_sent: u64 = 0;
    let mut input = Vec::new();
    let mut output = Vec::new();
    let mut refreshes: u64 = 0;
    let mut last_caption = String::new();

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = refresh.tick() => {
                let now = clock();
                while let Ok(message) = messages.try_recv() {
                    monitor.handle_message(&message, now);
                }
                monitor.on_refresh(now);
                refreshes += 1;

                if let Some(scheduler) = monitor.scheduler(VIDEO_ID) {
                    let caption = scheduler.painter().text();
                    if caption != last_caption {
                        info!(%caption, "delayed caption");
                        last_caption = caption;
                    }
                    if refreshes % 60 == 0 {
                        let lag_ms = scheduler
                            .delayed_frame()
                            .map(|frame| (now - frame.captured_at).as_secs_f64() * 1000.0);
                        info!(
                            phase = ?scheduler.phase(),
                            timing = %scheduler.timing_mode(),
                            delayed = scheduler.delayed_frame().map(|f| f.sequence),
                            current = scheduler.current_sequence(),
                            lag_ms,
                            pooled = scheduler.pool().live(),
                            presented = scheduler.gpu().presented(),
                            concealed = monitor.element(VIDEO_ID).is_some_and(SyntheticVideo::is_concealed),
                            overlay = ?monitor.platform().overlay(VIDEO_ID).map(|plan| plan.video.backing),
                            "delay status"
                        );
                    }
                }

                // audio mode may be switched on by a settings message
                if let Some((sample_rate, channels)) =
                    monitor.audio().map(|graph| (graph.sample_rate(), graph.channels()))
                {
                    let due = (start.elapsed().as_secs_f64() * f64::from(sample_rate)) as u64;
                    if sink.ensure(sample_rate, channels, AudioOutput::open_default_with) {
                        samples_sent = due;
                    }
                    let Some(out) = sink.output() else {
                        continue;
                    };
                    let frames = due.saturating_sub(samples_sent) as usize;
                    if frames > 0 {
                        let len = frames * usize::from(channels);
                        input.resize(len, 0.0);
                        output.resize(len, 0.0);
                        tone.fill(&mut input, sample_rate, channels);
                        monitor.process_audio(VIDEO_ID, &input, &mut output)?;
                        out.queue().push_samples(&output);
                        samples_sent = due;
                    }
                }
            }
            _ = decode.tick() => {
                let now = clock();
                monitor.platform_mut().captions().update(now);
                let Some(video) = monitor.element_mut(VIDEO_ID) else {
                    continue;
                };
                if start.elapsed() >= length && !video.is_ended() {
                    info!("source ended");
                    video.set_ended(true);
                }
                let decoded = video.decode();
                if decoded {
                    monitor.on_decoded_frame(VIDEO_ID, now);
                }
            }
        }
    }

    let decoded = monitor.element(VIDEO_ID).map_or(0, SyntheticVideo::decoded);
    monitor.shutdown(clock());
    info!(refreshes, decoded, "finished");
    Ok(())
}
