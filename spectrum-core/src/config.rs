//! # Configuration Module
//!
//! Run-time parameters for the quantum pipeline and the display mapping.
//! Both structs deserialize with `#[serde(default)]`, so a config file only
//! needs to name the values it overrides.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpectrumError};

/// Number of raw samples the capture side tries to deliver per quantum.
pub const DEFAULT_SAMPLES_PER_QUANTUM: usize = 4096;

/// Quanta larger than this are treated as spurious and discarded.
pub const DEFAULT_MAX_SAMPLES_PER_QUANTUM: usize = 10_000;

/// Lower edge of the displayed band in Hz.
pub const DEFAULT_LOW_CUT_HZ: f32 = 50.0;

/// Upper edge of the displayed band in Hz.
pub const DEFAULT_HIGH_CUT_HZ: f32 = 10_000.0;

/// Smallest quantum that yields at least one magnitude bin.
pub const MIN_SAMPLES_PER_QUANTUM: usize = 2;

/// Length `n` that normalization divides by and scales the peak to `n / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationBasis {
    /// The spectrum as it leaves band limiting.
    #[default]
    Spectrum,
    /// The transformed window, whatever band limiting removed. The peak then
    /// reaches the full `amplitude_scale` on screen.
    Window,
}

/// Parameters that stay fixed for the lifetime of a pipeline.
///
/// The sample rate is deliberately absent: it is supplied with every quantum
/// because the capture device may change underneath a running pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw samples the capture adapter accumulates before shipping a quantum.
    pub desired_samples_per_quantum: usize,
    /// Sanity ceiling; bigger quanta are discarded untouched.
    pub max_samples_per_quantum: usize,
    /// Lowest frequency kept by band limiting.
    pub low_cut_hz: f32,
    /// Frequency at which band limiting stops (exclusive).
    pub high_cut_hz: f32,
    /// Whether bins outside `[low_cut_hz, high_cut_hz)` are dropped.
    pub band_limit_enabled: bool,
    /// Process only every n-th capture quantum (1 = all of them).
    pub quantum_stride: u32,
    pub normalization_basis: NormalizationBasis,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            desired_samples_per_quantum: DEFAULT_SAMPLES_PER_QUANTUM,
            max_samples_per_quantum: DEFAULT_MAX_SAMPLES_PER_QUANTUM,
            low_cut_hz: DEFAULT_LOW_CUT_HZ,
            high_cut_hz: DEFAULT_HIGH_CUT_HZ,
            band_limit_enabled: true,
            quantum_stride: 1,
            normalization_basis: NormalizationBasis::Spectrum,
        }
    }
}

impl PipelineConfig {
    /// Checks that every value is usable by the pipeline.
    ///
    /// A high cut at or below the low cut is accepted: it simply produces an
    /// empty spectrum, which the display side already tolerates.
    pub fn validate(&self) -> Result<()> {
        if self.desired_samples_per_quantum < MIN_SAMPLES_PER_QUANTUM {
            return Err(SpectrumError::InvalidConfig(format!(
                "desired_samples_per_quantum must be at least {}",
                MIN_SAMPLES_PER_QUANTUM
            )));
        }
        if self.max_samples_per_quantum < self.desired_samples_per_quantum {
            return Err(SpectrumError::InvalidConfig(format!(
                "max_samples_per_quantum ({}) is below desired_samples_per_quantum ({})",
                self.max_samples_per_quantum, self.desired_samples_per_quantum
            )));
        }
        if self.quantum_stride == 0 {
            return Err(SpectrumError::InvalidConfig(
                "quantum_stride must be at least 1".into(),
            ));
        }
        for (name, value) in [("low_cut_hz", self.low_cut_hz), ("high_cut_hz", self.high_cut_hz)] {
            if !value.is_finite() || value < 0.0 {
                return Err(SpectrumError::InvalidConfig(format!(
                    "{name} must be a finite, non-negative frequency (got {value})"
                )));
            }
        }
        Ok(())
    }
}

/// Screen-space placement of the spectrum curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayGeometry {
    /// Y coordinate of a zero-magnitude bin. Screen y grows downward.
    pub baseline_y: f32,
    /// Vertical scale applied to the normalized magnitudes.
    pub amplitude_scale: f32,
    /// Horizontal extent the last bin maps to.
    pub display_length: f32,
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self {
            baseline_y: 200.0,
            amplitude_scale: 200.0,
            display_length: 1500.0,
        }
    }
}

/// Everything the application reads from its config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub display: DisplayGeometry,
}
