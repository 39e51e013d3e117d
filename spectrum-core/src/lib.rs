// spectrum-core/src/lib.rs

//! The core signal chain for the spectrum tuner.
//! This crate turns captured audio quanta into a normalized,
//! band-limited magnitude spectrum and maps it to screen space.
//! It is completely headless and contains no GUI code.

pub mod audio;
pub mod config;
pub mod display;
pub mod error;
pub mod extractor;
pub mod fft;
pub mod handoff;
pub mod pipeline;
pub mod postprocess;
pub mod synth;

pub use config::{AppConfig, DisplayGeometry, NormalizationBasis, PipelineConfig, MIN_SAMPLES_PER_QUANTUM};
pub use display::DisplayPoint;
pub use error::SpectrumError;
pub use handoff::{PublishedSpectrum, SpectrumHandle};
pub use pipeline::{DiscardReason, QuantumOutcome, QuantumPipeline};
pub use synth::Waveform;
