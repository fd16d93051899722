//! Output sink on the default cpal device.
//!
//! The host pushes processed samples into a shared queue; the device
//! callback drains it and plays silence on underrun or lock contention, so
//! the real-time thread never waits.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use timeshift_core::{Result, TimeshiftError};
use tracing::{info, warn};

/// Interleaved samples waiting for the device.
#[derive(Debug, Clone)]
pub struct SampleQueue {
    inner: Arc<Mutex<VecDeque<f32>>>,
    limit: usize,
}

impl SampleQueue {
    /// A queue holding at most `limit` samples; older samples are dropped
    /// when the host outruns the device.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(limit))),
            limit,
        }
    }

    pub fn push_samples(&self, samples: &[f32]) {
        let mut queue = self.inner.lock();
        queue.extend(samples.iter().copied());
        let excess = queue.len().saturating_sub(self.limit);
        if excess > 0 {
            queue.drain(..excess);
        }
    }

    /// Fill `out` from the queue without blocking. Returns samples copied;
    /// the rest of `out` is left untouched.
    pub fn try_pop_into(&self, out: &mut [f32]) -> usize {
        let Some(mut queue) = self.inner.try_lock() else {
            return 0;
        };
        let n = out.len().min(queue.len());
        for (slot, sample) in out.iter_mut().zip(queue.drain(..n)) {
            *slot = sample;
        }
        n
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A running output stream.
pub struct AudioOutput {
    _stream: cpal::Stream,
    sample_rate: u32,
    channels: u16,
    queue: SampleQueue,
}

impl AudioOutput {
    /// Open the default output device at its preferred format and start
    /// playing from a new queue.
    pub fn open_default() -> Result<Self> {
        let device = default_device()?;
        let supported = device
            .default_output_config()
            .map_err(|e| TimeshiftError::Audio(format!("Failed to get output config: {e}")))?;
        Self::start(&device, supported)
    }

    /// Open the default output device at a fixed format, for a graph that
    /// already processes at `sample_rate` with `channels` interleaved.
    pub fn open_default_with(sample_rate: u32, channels: u16) -> Result<Self> {
        let device = default_device()?;
        let rate = cpal::SampleRate(sample_rate);
        let supported = device
            .supported_output_configs()
            .map_err(|e| TimeshiftError::Audio(format!("Failed to query output configs: {e}")))?
            .filter(|range| range.channels() == channels)
            .find(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
            .ok_or_else(|| {
                TimeshiftError::Audio(format!(
                    "Output device cannot play {sample_rate} Hz with {channels} channels"
                ))
            })?
            .with_sample_rate(rate);
        Self::start(&device, supported)
    }

    fn start(device: &cpal::Device, supported: cpal::SupportedStreamConfig) -> Result<Self> {
        let sample_rate = supported.sample_rate().0;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let channels = config.channels;

        // A quarter second of headroom
        let queue = SampleQueue::with_limit(sample_rate as usize / 4 * channels as usize);

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(device, &config, queue.clone())?,
            SampleFormat::I16 => build_stream::<i16>(device, &config, queue.clone())?,
            SampleFormat::U16 => build_stream::<u16>(device, &config, queue.clone())?,
            other => {
                return Err(TimeshiftError::Audio(format!(
                    "Unsupported sample format: {other}"
                )))
            }
        };

        stream
            .play()
            .map_err(|e| TimeshiftError::Audio(format!("Failed to start audio stream: {e}")))?;

        info!(sample_rate, channels, "audio output started");
        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
            queue,
        })
    }

    pub fn queue(&self) -> &SampleQueue {
        &self.queue
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

fn default_device() -> Result<cpal::Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| TimeshiftError::Audio("No default output device".to_string()))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    queue: SampleQueue,
) -> Result<cpal::Stream>
where
    T: Sample + FromSample<f32> + SizedSample,
{
    let mut scratch = Vec::new();
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _| {
                scratch.clear();
                scratch.resize(data.len(), 0.0f32);
                queue.try_pop_into(&mut scratch);
                for (out, sample) in data.iter_mut().zip(&scratch) {
                    *out = T::from_sample(*sample);
                }
            },
            |err| warn!("audio stream error: {err}"),
            None,
        )
        .map_err(|e| TimeshiftError::Audio(format!("Failed to build output stream: {e}")))
}
