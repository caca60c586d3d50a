//! Microphone frame source backed by CPAL.
//!
//! All the device-specific mess lives here: enumeration, format negotiation,
//! the callback-thread handoff, and rate conversion. Construction is cheap;
//! the device is not touched until `open`. The CPAL stream is `!Send`, so a
//! `MicSource` must be created and used on the capture thread.

use super::dispatch::FramePump;
use super::resample::convert_frame;
use super::source::{AudioFrame, AudioFrameSource, ReadError};
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct MicSource {
    preferred_device: Option<String>,
    target_rate: u32,
    frame_samples: usize,
    channel_capacity: usize,
    device_rate: u32,
    stream: Option<cpal::Stream>,
    frames: Option<Receiver<Vec<f32>>>,
    dropped: Arc<AtomicUsize>,
}

impl MicSource {
    /// `preferred_device` is a device name as printed by `list_devices`;
    /// `None` selects the host default input.
    pub fn new(
        preferred_device: Option<String>,
        target_rate: u32,
        frame_samples: usize,
        channel_capacity: usize,
    ) -> Self {
        Self {
            preferred_device,
            target_rate,
            frame_samples: frame_samples.max(1),
            channel_capacity: channel_capacity.max(1),
            device_rate: 0,
            stream: None,
            frames: None,
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Input device names in host enumeration order.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    fn resolve_device(&self) -> Result<cpal::Device> {
        let host = cpal::default_host();
        match &self.preferred_device {
            Some(name) => {
                let mut devices = host.input_devices().context("no input devices available")?;
                devices
                    .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                    .ok_or_else(|| anyhow!("input device '{name}' not found"))
            }
            None => host
                .default_input_device()
                .context("no default input device available"),
        }
    }
}

impl AudioFrameSource for MicSource {
    fn open(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let device = self.resolve_device()?;
        let default_config = device
            .default_input_config()
            .context("failed to query device input config")?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let device_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));

        let device_name = device.name().unwrap_or_else(|_| "unknown".into());
        debug!(device = %device_name, ?format, device_rate, channels, "opening input stream");

        // Size device-side frames so one frame covers the same wall-clock
        // span as `frame_samples` at the target rate.
        let device_frame_samples = ((u64::from(device_rate) * self.frame_samples as u64)
            / u64::from(self.target_rate.max(1)))
        .max(1) as usize;

        let (sender, receiver) = bounded::<Vec<f32>>(self.channel_capacity);
        let dropped = Arc::new(AtomicUsize::new(0));
        let pump = Arc::new(Mutex::new(FramePump::new(
            device_frame_samples,
            sender,
            dropped.clone(),
        )));

        let stream = match format {
            SampleFormat::F32 => {
                build_stream(&device, &device_config, pump, dropped.clone(), channels, |s| s)
            }
            SampleFormat::I16 => build_stream(
                &device,
                &device_config,
                pump,
                dropped.clone(),
                channels,
                |s: i16| f32::from(s) / 32_768.0,
            ),
            SampleFormat::U16 => build_stream(
                &device,
                &device_config,
                pump,
                dropped.clone(),
                channels,
                |s: u16| (f32::from(s) - 32_768.0) / 32_768.0,
            ),
            other => Err(anyhow!("unsupported sample format: {other:?}")),
        }?;
        stream.play().context("failed to start input stream")?;

        self.device_rate = device_rate;
        self.stream = Some(stream);
        self.frames = Some(receiver);
        self.dropped = dropped;
        Ok(())
    }

    fn read_frame(&mut self, timeout: Duration) -> Result<AudioFrame, ReadError> {
        let Some(receiver) = &self.frames else {
            return Err(ReadError::Fatal("source not opened".to_string()));
        };
        match receiver.recv_timeout(timeout) {
            Ok(frame) => {
                let samples =
                    convert_frame(frame, self.device_rate, self.target_rate, self.frame_samples);
                Ok(AudioFrame {
                    samples,
                    sample_rate: self.target_rate,
                    captured_at: Instant::now(),
                })
            }
            Err(RecvTimeoutError::Timeout) => Err(ReadError::Transient),
            Err(RecvTimeoutError::Disconnected) => {
                Err(ReadError::Fatal("audio stream disconnected".to_string()))
            }
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                warn!(error = %err, "failed to pause input stream");
            }
        }
        self.frames = None;
    }

    fn dropped_frames(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    pump: Arc<Mutex<FramePump>>,
    dropped: Arc<AtomicUsize>,
    channels: usize,
    convert: impl Fn(T) -> f32 + Send + 'static,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + Send + 'static,
{
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _| {
            // try_lock keeps the realtime callback from ever blocking; a
            // contended pump costs one dropped buffer.
            if let Ok(mut pump) = pump.try_lock() {
                pump.push(data, channels, |s| convert(s));
            } else {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
        },
        |err| warn!(error = %err, "audio stream error"),
        None,
    )?;
    Ok(stream)
}
