//! # Quantum Pipeline Module
//!
//! Runs one capture quantum through the whole chain: extraction, sizing and
//! zero-padding, the transform, post-processing, and finally the publish into
//! the shared [`SpectrumHandle`].
//!
//! The pipeline is driven from the capture thread. Nothing that goes wrong
//! inside a quantum escapes it: failures are logged, the quantum is dropped,
//! and whatever was published before stays on screen.

use log::{debug, error, info, trace, warn};

use crate::config::{DisplayGeometry, PipelineConfig, MIN_SAMPLES_PER_QUANTUM};
use crate::display::DisplayPoint;
use crate::error::{Result, SpectrumError};
use crate::extractor::{extract_samples, CaptureBuffer};
use crate::fft::{pad_to_power_of_two, spectrum_to_magnitudes, Radix2Fft};
use crate::handoff::SpectrumHandle;
use crate::postprocess::SpectrumPostProcessor;
use crate::synth::{self, Waveform};

/// Why a quantum was thrown away before reaching the handle.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscardReason {
    /// The quantum held fewer than two samples, so no bin could be produced.
    Empty,
    /// The quantum exceeded the sanity ceiling.
    Oversized(usize),
    /// The sample rate was zero, negative or not finite.
    InvalidSampleRate(f32),
    /// The capture buffer could not be read.
    ExtractionFailed(SpectrumError),
    /// The transform rejected the window.
    TransformFailed(SpectrumError),
}

/// What happened to one quantum.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantumOutcome {
    /// A new spectrum with `bins` entries is now published.
    Published { bins: usize, log2_len: u32 },
    /// Skipped by the stride setting without being read.
    Skipped,
    /// Dropped; the previous spectrum is still published.
    Discarded(DiscardReason),
    /// Computed but dropped because the display was mid-read.
    NotReady,
}

impl QuantumOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, QuantumOutcome::Published { .. })
    }
}

/// Turns capture quanta into published magnitude spectra.
pub struct QuantumPipeline {
    config: PipelineConfig,
    post_processor: SpectrumPostProcessor,
    /// Cached plan, rebuilt when the window length changes.
    plan: Option<Radix2Fft>,
    handle: SpectrumHandle,
    quanta_seen: u64,
    last_sample_rate: Option<f32>,
}

impl QuantumPipeline {
    /// Creates a pipeline after validating `config`.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        info!(
            "[PIPELINE] Band {}-{} Hz (limiting {}), stride {}, ceiling {} samples",
            config.low_cut_hz,
            config.high_cut_hz,
            if config.band_limit_enabled { "on" } else { "off" },
            config.quantum_stride,
            config.max_samples_per_quantum
        );
        Ok(Self {
            post_processor: SpectrumPostProcessor::new(&config),
            config,
            plan: None,
            handle: SpectrumHandle::new(),
            quanta_seen: 0,
            last_sample_rate: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// A handle for the display side. All clones share one slot.
    pub fn handle(&self) -> SpectrumHandle {
        self.handle.clone()
    }

    /// Number of capture quanta received so far, skipped ones included.
    pub fn quanta_seen(&self) -> u64 {
        self.quanta_seen
    }

    /// Entry point for the capture callback.
    pub fn on_quantum<B: CaptureBuffer + ?Sized>(&mut self, raw: &B, sample_rate: f32) -> QuantumOutcome {
        self.quanta_seen += 1;
        if (self.quanta_seen - 1) % self.config.quantum_stride as u64 != 0 {
            return QuantumOutcome::Skipped;
        }

        match extract_samples(raw) {
            Ok(samples) => self.on_samples(samples, sample_rate),
            Err(e) => {
                warn!("[PIPELINE] Dropping quantum: {}", e);
                QuantumOutcome::Discarded(DiscardReason::ExtractionFailed(e))
            }
        }
    }

    /// Processes samples that have already been extracted.
    pub fn on_samples(&mut self, samples: Vec<f32>, sample_rate: f32) -> QuantumOutcome {
        if let Some(reason) = self.check_quantum_size(samples.len()) {
            return QuantumOutcome::Discarded(reason);
        }
        self.run(samples, sample_rate)
    }

    /// Test-mode entry point: a generated sine instead of captured audio.
    pub fn on_synthetic_quantum(&mut self, frequency_hz: f32, sample_count: usize, sample_rate: f32) -> QuantumOutcome {
        self.on_synthetic_waveform(Waveform::Sine, frequency_hz, sample_count, sample_rate)
    }

    /// Test-mode entry point with a choice of waveform.
    ///
    /// The size checks run before any sample is generated.
    pub fn on_synthetic_waveform(
        &mut self,
        waveform: Waveform,
        frequency_hz: f32,
        sample_count: usize,
        sample_rate: f32,
    ) -> QuantumOutcome {
        if let Some(reason) = self.check_quantum_size(sample_count) {
            return QuantumOutcome::Discarded(reason);
        }
        debug!(
            "[PIPELINE] Synthetic {:?} quantum: {} Hz, {} samples at {} Hz",
            waveform, frequency_hz, sample_count, sample_rate
        );
        let samples = synth::generate(waveform, frequency_hz, sample_count, sample_rate);
        self.run(samples, sample_rate)
    }

    /// Builds the display series for the last published spectrum.
    pub fn current_display_series(&self, geometry: &DisplayGeometry) -> Vec<DisplayPoint> {
        self.handle.current_display_series(geometry)
    }

    /// Rejects quanta too short to give a single bin, or over the ceiling.
    fn check_quantum_size(&self, len: usize) -> Option<DiscardReason> {
        if len < MIN_SAMPLES_PER_QUANTUM {
            trace!("[PIPELINE] Quantum of {} sample(s) discarded", len);
            return Some(DiscardReason::Empty);
        }
        if len > self.config.max_samples_per_quantum {
            warn!(
                "[PIPELINE] Discarding oversized quantum of {} samples (ceiling {})",
                len, self.config.max_samples_per_quantum
            );
            return Some(DiscardReason::Oversized(len));
        }
        None
    }

    fn run(&mut self, samples: Vec<f32>, sample_rate: f32) -> QuantumOutcome {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            warn!("[PIPELINE] Dropping quantum with sample rate {}", sample_rate);
            return QuantumOutcome::Discarded(DiscardReason::InvalidSampleRate(sample_rate));
        }
        if self.last_sample_rate != Some(sample_rate) {
            info!(
                "[PIPELINE] Sample rate is now {} Hz (was {:?})",
                sample_rate, self.last_sample_rate
            );
            self.last_sample_rate = Some(sample_rate);
        }

        let raw_len = samples.len();
        let (window, log2_len) = pad_to_power_of_two(samples);

        let spectrum = match self
            .plan_for(window.len())
            .and_then(|plan| plan.transform(&window))
        {
            Ok(spectrum) => spectrum,
            Err(e) => {
                error!("[PIPELINE] Transform rejected a padded window: {}", e);
                return QuantumOutcome::Discarded(DiscardReason::TransformFailed(e));
            }
        };

        let magnitudes = spectrum_to_magnitudes(&spectrum);
        let processed = self.post_processor.process(magnitudes, sample_rate);
        let bins = processed.len();

        if self.handle.publish(processed, log2_len, sample_rate) {
            trace!(
                "[PIPELINE] Published {} bins ({} samples padded to {})",
                bins,
                raw_len,
                window.len()
            );
            QuantumOutcome::Published { bins, log2_len }
        } else {
            trace!("[PIPELINE] Display busy, quantum dropped");
            QuantumOutcome::NotReady
        }
    }

    fn plan_for(&mut self, len: usize) -> Result<&Radix2Fft> {
        if self.plan.as_ref().map_or(true, |plan| plan.len() != len) {
            debug!("[PIPELINE] Planning {}-point transform", len);
            self.plan = Some(Radix2Fft::new(len)?);
        }
        self.plan
            .as_ref()
            .ok_or(SpectrumError::InvalidWindowSize(len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(config: PipelineConfig) -> QuantumPipeline {
        QuantumPipeline::new(config).unwrap()
    }

    fn bytes_of(samples: &[f32]) -> Vec<u8> {
        bytemuck::cast_slice(samples).to_vec()
    }

    #[test]
    fn rejects_invalid_config() {
        let config = PipelineConfig { desired_samples_per_quantum: 0, ..Default::default() };
        assert!(QuantumPipeline::new(config).is_err());
    }

    #[test]
    fn empty_and_oversized_quanta_keep_previous_spectrum() {
        let mut pipeline = pipeline(PipelineConfig::default());
        let handle = pipeline.handle();
        assert!(pipeline.on_synthetic_quantum(1_000.0, 1024, 48_000.0).is_published());
        let before = handle.snapshot();

        assert_eq!(
            pipeline.on_quantum(&Vec::<u8>::new(), 48_000.0),
            QuantumOutcome::Discarded(DiscardReason::Empty)
        );
        let huge = bytes_of(&vec![0.5; 10_001]);
        assert_eq!(
            pipeline.on_quantum(&huge, 48_000.0),
            QuantumOutcome::Discarded(DiscardReason::Oversized(10_001))
        );
        assert_eq!(handle.snapshot(), before);
    }

    #[test]
    fn single_sample_quantum_keeps_previous_spectrum() {
        let mut pipeline = pipeline(PipelineConfig::default());
        let handle = pipeline.handle();
        assert!(pipeline.on_synthetic_quantum(440.0, 2048, 48_000.0).is_published());
        let before = handle.snapshot();

        assert_eq!(
            pipeline.on_samples(vec![0.5], 48_000.0),
            QuantumOutcome::Discarded(DiscardReason::Empty)
        );
        assert_eq!(
            pipeline.on_quantum(&bytes_of(&[0.5]), 48_000.0),
            QuantumOutcome::Discarded(DiscardReason::Empty)
        );
        assert_eq!(
            pipeline.on_synthetic_quantum(440.0, 1, 48_000.0),
            QuantumOutcome::Discarded(DiscardReason::Empty)
        );
        assert_eq!(handle.snapshot(), before);
        assert!(!handle.snapshot().magnitudes.is_empty());
    }

    #[test]
    fn two_samples_still_publish_one_bin() {
        let mut pipeline = pipeline(PipelineConfig { band_limit_enabled: false, ..Default::default() });
        assert_eq!(
            pipeline.on_samples(vec![0.5, -0.5], 48_000.0),
            QuantumOutcome::Published { bins: 1, log2_len: 1 }
        );
    }

    #[test]
    fn oversized_synthetic_request_is_refused_before_generating() {
        let mut pipeline = pipeline(PipelineConfig::default());
        let handle = pipeline.handle();
        assert!(pipeline.on_synthetic_quantum(440.0, 2048, 48_000.0).is_published());
        let before = handle.snapshot();

        let count = usize::MAX / 2;
        assert_eq!(
            pipeline.on_synthetic_waveform(Waveform::Square, 440.0, count, 48_000.0),
            QuantumOutcome::Discarded(DiscardReason::Oversized(count))
        );
        assert_eq!(
            pipeline.on_synthetic_quantum(440.0, 10_001, 48_000.0),
            QuantumOutcome::Discarded(DiscardReason::Oversized(10_001))
        );
        assert!(pipeline.on_synthetic_quantum(440.0, 10_000, 48_000.0).is_published());
        assert_ne!(handle.snapshot(), before);
    }

    /// A capture buffer whose lock always fails, like an unmapped audio frame.
    struct UnmappableBuffer;

    impl CaptureBuffer for UnmappableBuffer {
        fn lock_for_read(&self) -> Result<crate::extractor::BufferLock<'_>> {
            Err(SpectrumError::BufferAccess("frame not mapped".to_string()))
        }
    }

    #[test]
    fn unreadable_buffer_keeps_previous_spectrum() {
        let mut pipeline = pipeline(PipelineConfig::default());
        let handle = pipeline.handle();
        assert!(pipeline.on_synthetic_quantum(440.0, 2048, 48_000.0).is_published());
        let before = handle.snapshot();

        let outcome = pipeline.on_quantum(&UnmappableBuffer, 48_000.0);
        assert!(matches!(
            outcome,
            QuantumOutcome::Discarded(DiscardReason::ExtractionFailed(SpectrumError::BufferAccess(_)))
        ));
        assert_eq!(handle.snapshot(), before);

        // The failure does not wedge the pipeline.
        assert!(pipeline.on_quantum(&bytes_of(&[0.1; 256]), 48_000.0).is_published());
    }

    #[test]
    fn ceiling_is_inclusive() {
        let mut pipeline = pipeline(PipelineConfig::default());
        let outcome = pipeline.on_samples(vec![0.0; 10_000], 48_000.0);
        assert!(outcome.is_published());
    }

    #[test]
    fn stride_skips_quanta_without_reading_them() {
        let config = PipelineConfig { quantum_stride: 3, ..Default::default() };
        let mut pipeline = pipeline(config);
        let quantum = bytes_of(&[0.1; 256]);
        let outcomes: Vec<_> = (0..6).map(|_| pipeline.on_quantum(&quantum, 48_000.0)).collect();
        assert!(outcomes[0].is_published());
        assert_eq!(outcomes[1], QuantumOutcome::Skipped);
        assert_eq!(outcomes[2], QuantumOutcome::Skipped);
        assert!(outcomes[3].is_published());
        assert_eq!(pipeline.quanta_seen(), 6);
    }

    #[test]
    fn invalid_sample_rate_is_discarded() {
        let mut pipeline = pipeline(PipelineConfig::default());
        assert!(matches!(
            pipeline.on_samples(vec![0.1; 64], 0.0),
            QuantumOutcome::Discarded(DiscardReason::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn busy_display_drops_the_result() {
        let mut pipeline = pipeline(PipelineConfig::default());
        let handle = pipeline.handle();
        let read = handle.begin_read();
        assert_eq!(
            pipeline.on_synthetic_quantum(440.0, 2048, 48_000.0),
            QuantumOutcome::NotReady
        );
        drop(read);
        assert!(pipeline.on_synthetic_quantum(440.0, 2048, 48_000.0).is_published());
    }

    #[test]
    fn plan_follows_window_length() {
        let mut pipeline = pipeline(PipelineConfig { band_limit_enabled: false, ..Default::default() });
        assert_eq!(
            pipeline.on_samples(vec![0.2; 300], 48_000.0),
            QuantumOutcome::Published { bins: 256, log2_len: 9 }
        );
        assert_eq!(
            pipeline.on_samples(vec![0.2; 4096], 48_000.0),
            QuantumOutcome::Published { bins: 2048, log2_len: 12 }
        );
    }
}
