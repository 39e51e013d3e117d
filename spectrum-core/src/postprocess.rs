//! # Spectrum Post-Processing Module
//!
//! Prepares a raw magnitude spectrum for display: optional band limiting to
//! the frequency range of interest, then normalization so the curve keeps a
//! stable height from one quantum to the next.

use log::trace;

use crate::config::{NormalizationBasis, PipelineConfig};

/// Minimum `(max - min) / n` for a spectrum to be rescaled.
///
/// Anything flatter is treated as silence and left alone.
pub const NORMALIZATION_THRESHOLD: f32 = 0.001;

/// Half-open bin range `[low, high)` that band limiting keeps.
///
/// `window_len` is the length of the transformed window (twice the number of
/// magnitude bins); `round(cut · window_len / sample_rate)` gives the bin.
pub fn band_bins(window_len: usize, sample_rate: f32, low_cut_hz: f32, high_cut_hz: f32) -> (usize, usize) {
    let duration = window_len as f32 / sample_rate;
    let to_bin = |hz: f32| (hz * duration).round().max(0.0) as usize;
    (to_bin(low_cut_hz), to_bin(high_cut_hz))
}

/// Keeps only bins in `[low_bin, high_bin)`, shifted down to start at 0.
///
/// `high_bin` is clamped to the spectrum length. An inverted or
/// out-of-range band leaves the spectrum empty.
pub fn band_limit(spectrum: &mut Vec<f32>, low_bin: usize, high_bin: usize) {
    let high_bin = high_bin.min(spectrum.len());
    if high_bin <= low_bin {
        spectrum.clear();
        return;
    }
    spectrum.truncate(high_bin);
    spectrum.drain(..low_bin);
}

/// Rescales the spectrum so its peak lands at `n / 2`, with `n` its length.
///
/// Returns `false` when the spectrum is too flat (or empty, or all zero) to
/// be rescaled; the values are then untouched.
pub fn normalize(spectrum: &mut [f32]) -> bool {
    let n = spectrum.len();
    normalize_with_basis(spectrum, n)
}

/// [`normalize`] with an explicit `n` for both the flatness threshold and the
/// target peak height.
pub fn normalize_with_basis(spectrum: &mut [f32], n: usize) -> bool {
    if spectrum.is_empty() || n == 0 {
        return false;
    }

    let max_mag = spectrum.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let min_mag = spectrum.iter().copied().fold(f32::INFINITY, f32::min);

    if max_mag <= 0.0 || (max_mag - min_mag) / n as f32 <= NORMALIZATION_THRESHOLD {
        return false;
    }

    let scale = n as f32 / (2.0 * max_mag);
    for bin in spectrum.iter_mut() {
        *bin *= scale;
    }
    true
}

/// Band limiting and normalization with the cutoffs of one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumPostProcessor {
    pub low_cut_hz: f32,
    pub high_cut_hz: f32,
    pub band_limit_enabled: bool,
    pub normalization_basis: NormalizationBasis,
}

impl SpectrumPostProcessor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            low_cut_hz: config.low_cut_hz,
            high_cut_hz: config.high_cut_hz,
            band_limit_enabled: config.band_limit_enabled,
            normalization_basis: config.normalization_basis,
        }
    }

    /// Runs both steps on the magnitudes of one window.
    ///
    /// The window length is recovered as twice the number of bins.
    pub fn process(&self, mut spectrum: Vec<f32>, sample_rate: f32) -> Vec<f32> {
        let window_len = spectrum.len() * 2;
        if self.band_limit_enabled {
            let (low_bin, high_bin) =
                band_bins(window_len, sample_rate, self.low_cut_hz, self.high_cut_hz);
            band_limit(&mut spectrum, low_bin, high_bin);
            trace!(
                "[POSTPROCESS] Band limited to bins [{}, {}) -> {} bins",
                low_bin,
                high_bin,
                spectrum.len()
            );
            if spectrum.is_empty() {
                return spectrum;
            }
        }

        let n = match self.normalization_basis {
            NormalizationBasis::Spectrum => spectrum.len(),
            NormalizationBasis::Window => window_len,
        };
        if !normalize_with_basis(&mut spectrum, n) {
            trace!("[POSTPROCESS] Spectrum too flat to normalize, left unscaled");
        }
        spectrum
    }
}

impl Default for SpectrumPostProcessor {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn band_bins_round_to_nearest() {
        // 4096-point window at 48 kHz lasts 85.33 ms.
        assert_eq!(band_bins(4096, 48_000.0, 50.0, 10_000.0), (4, 853));
        assert_eq!(band_bins(2048, 48_000.0, 0.0, 24_000.0), (0, 1024));
    }

    #[test]
    fn band_limit_shifts_and_truncates() {
        let mut spectrum: Vec<f32> = (0..10).map(|i| i as f32).collect();
        band_limit(&mut spectrum, 2, 6);
        assert_eq!(spectrum, vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn band_limit_clamps_high_bin() {
        let mut spectrum: Vec<f32> = (0..4).map(|i| i as f32).collect();
        band_limit(&mut spectrum, 1, 100);
        assert_eq!(spectrum, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn inverted_band_is_empty() {
        let mut spectrum = vec![1.0; 8];
        band_limit(&mut spectrum, 5, 5);
        assert!(spectrum.is_empty());

        let mut spectrum = vec![1.0; 8];
        band_limit(&mut spectrum, 20, 30);
        assert!(spectrum.is_empty());
    }

    #[test]
    fn normalize_puts_peak_at_half_length() {
        let mut spectrum = vec![0.0, 2.0, 8.0, 4.0];
        assert!(normalize(&mut spectrum));
        assert_abs_diff_eq!(spectrum[2], 2.0);
        assert_abs_diff_eq!(spectrum[1], 0.5);
        assert_abs_diff_eq!(spectrum[3], 1.0);
    }

    #[test]
    fn flat_spectrum_is_left_unchanged() {
        // (max - min) / n is about 0.0005, under the threshold.
        let original = vec![1.0, 1.0, 1.0, 1.002];
        let mut spectrum = original.clone();
        assert!(!normalize(&mut spectrum));
        assert_eq!(spectrum, original);

        let mut silence = vec![0.0; 16];
        assert!(!normalize(&mut silence));
        assert!(silence.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn process_skips_empty_band() {
        let processor = SpectrumPostProcessor {
            low_cut_hz: 5_000.0,
            high_cut_hz: 100.0,
            band_limit_enabled: true,
            normalization_basis: NormalizationBasis::Spectrum,
        };
        assert!(processor.process(vec![1.0; 512], 48_000.0).is_empty());
    }

    #[test]
    fn process_without_band_limit_keeps_every_bin() {
        let processor = SpectrumPostProcessor {
            band_limit_enabled: false,
            ..Default::default()
        };
        let mut spectrum = vec![0.0; 512];
        spectrum[19] = 100.0;
        let processed = processor.process(spectrum, 48_000.0);
        assert_eq!(processed.len(), 512);
        assert_abs_diff_eq!(processed[19], 256.0);
    }

    #[test]
    fn window_basis_scales_past_the_band() {
        let mut spectrum = vec![0.0; 512];
        spectrum[100] = 40.0;
        spectrum[101] = 10.0;

        let limited = SpectrumPostProcessor::default().process(spectrum.clone(), 48_000.0);
        let window = SpectrumPostProcessor {
            normalization_basis: NormalizationBasis::Window,
            ..Default::default()
        }
        .process(spectrum, 48_000.0);

        // Both keep bins [1, 213) of a 1024-point window at 48 kHz.
        assert_eq!(limited.len(), 212);
        assert_eq!(window.len(), 212);
        assert_abs_diff_eq!(limited[99], 106.0);
        assert_abs_diff_eq!(window[99], 512.0);
        assert_abs_diff_eq!(window[100], 128.0);
    }

    #[test]
    fn window_basis_threshold_uses_the_window_length() {
        // (max - min) / 4 passes the threshold, / 4096 does not.
        let mut spectrum = vec![1.0, 1.0, 1.0, 3.0];
        assert!(!normalize_with_basis(&mut spectrum, 4096));
        assert_eq!(spectrum, vec![1.0, 1.0, 1.0, 3.0]);
        assert!(normalize(&mut spectrum));
    }
}
