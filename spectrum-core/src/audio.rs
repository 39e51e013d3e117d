//! # Audio Capture Module
//!
//! Live input for the pipeline, built on CPAL (Cross-Platform Audio Library).
//! The stream callback accumulates samples until a full quantum is available
//! and ships it, as raw native-endian float32 bytes plus its sample rate,
//! over a crossbeam channel. The pipeline itself never touches the device.
//!
//! ## Features
//! - Default input device, f32 format, sample rate closest to 48 kHz
//! - Configurable quantum size
//! - Device loss reported on the same channel as the audio

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, SupportedStreamConfig, SupportedStreamConfigRange};
use crossbeam_channel::Sender;
use log::{error, info};

use crate::error::SpectrumError;

/// Sample rate requested from the input device.
pub const TARGET_SAMPLE_RATE: u32 = 48_000;

/// One quantum as the capture side delivers it.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedQuantum {
    /// Native-endian f32 samples.
    pub bytes: Vec<u8>,
    pub sample_rate: f32,
}

/// Messages sent from the capture callback.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    Quantum(CapturedQuantum),
    /// The stream failed; no more quanta will arrive from it.
    DeviceLost(SpectrumError),
}

/// Collects callback-sized chunks into quanta of a fixed size.
///
/// Interleaved multi-channel input is averaged down to mono first, so a
/// quantum always holds `samples_per_quantum` frames at the stream's rate.
#[derive(Debug)]
pub struct QuantumAccumulator {
    buffer: Vec<f32>,
    samples_per_quantum: usize,
    channels: usize,
    // Running sum of a frame split across callbacks.
    frame_sum: f32,
    frame_fill: usize,
}

impl QuantumAccumulator {
    pub fn new(samples_per_quantum: usize, channels: u16) -> Self {
        Self {
            buffer: Vec::with_capacity(samples_per_quantum * 2),
            samples_per_quantum: samples_per_quantum.max(1),
            channels: usize::from(channels.max(1)),
            frame_sum: 0.0,
            frame_fill: 0,
        }
    }

    /// Appends interleaved `data` and calls `emit` once per completed quantum.
    pub fn push(&mut self, data: &[f32], mut emit: impl FnMut(&[f32])) {
        if self.channels == 1 {
            self.buffer.extend_from_slice(data);
        } else {
            for &sample in data {
                self.frame_sum += sample;
                self.frame_fill += 1;
                if self.frame_fill == self.channels {
                    self.buffer.push(self.frame_sum / self.channels as f32);
                    self.frame_sum = 0.0;
                    self.frame_fill = 0;
                }
            }
        }

        while self.buffer.len() >= self.samples_per_quantum {
            emit(&self.buffer[..self.samples_per_quantum]);
            self.buffer.drain(..self.samples_per_quantum);
        }
    }

    /// Mono samples waiting for the next quantum.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Starts audio capture from the default input device.
///
/// Quanta of `samples_per_quantum` mono samples are sent on `sender`; when the
/// channel is full the quantum is dropped rather than blocking the audio
/// callback.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Playing stream handle and its sample rate
/// * `Err(e)` - No usable device or configuration
pub fn start_audio_capture(
    sender: Sender<CaptureEvent>,
    samples_per_quantum: usize,
) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| SpectrumError::DeviceUnavailable("no input device available".into()))?;

    info!("[AUDIO] Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let sample_rate_val = supported_config.sample_rate().0;
    let channels = supported_config.channels();
    let config: cpal::StreamConfig = supported_config.into();

    info!(
        "[AUDIO] Selected {} Hz, {} channel(s), {} samples per quantum",
        sample_rate_val, channels, samples_per_quantum
    );

    let error_sender = sender.clone();
    let err_fn = move |err: cpal::StreamError| {
        error!("[AUDIO] An error occurred on the audio stream: {}", err);
        if let cpal::StreamError::DeviceNotAvailable = err {
            let _ = error_sender.try_send(CaptureEvent::DeviceLost(SpectrumError::DeviceUnavailable(
                err.to_string(),
            )));
        }
    };

    let mut accumulator = QuantumAccumulator::new(samples_per_quantum, channels);
    let sample_rate = sample_rate_val as f32;

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            accumulator.push(data, |quantum| {
                let event = CaptureEvent::Quantum(CapturedQuantum {
                    bytes: bytemuck::cast_slice(quantum).to_vec(),
                    sample_rate,
                });
                // Send the quantum, ignoring errors if the channel is full.
                let _ = sender.try_send(event);
            });
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate_val))
}

/// Picks the f32 input configuration closest to `target_rate`.
///
/// Mono configurations win over multi-channel ones at the same distance;
/// the accumulator downmixes the rest. The chosen rate is clamped into the
/// configuration's supported range.
pub fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfig> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let rate = target_rate.clamp(c.min_sample_rate().0, c.max_sample_rate().0);
            (rate.abs_diff(target_rate), c.channels() != 1)
        })
        .map(|c| {
            let rate = target_rate.clamp(c.min_sample_rate().0, c.max_sample_rate().0);
            c.with_sample_rate(SampleRate(rate))
        })
}
