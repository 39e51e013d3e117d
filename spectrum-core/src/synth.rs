//! # Test Signal Module
//!
//! Generates the synthetic waves fed through the pipeline when no capture
//! device is involved.

use std::f64::consts::PI;

/// Shape of a generated test wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    /// ±1 wave with the sign of the matching sine.
    Square,
}

/// Generates `sample_count` samples of `waveform` at `frequency_hz`.
pub fn generate(waveform: Waveform, frequency_hz: f32, sample_count: usize, sample_rate: f32) -> Vec<f32> {
    let step = 2.0 * PI * frequency_hz as f64 / sample_rate as f64;
    (0..sample_count)
        .map(|i| {
            let phase = (step * i as f64).sin();
            match waveform {
                Waveform::Sine => phase as f32,
                Waveform::Square if phase < 0.0 => -1.0,
                Waveform::Square => 1.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn sine_hits_expected_values() {
        let wave = generate(Waveform::Sine, 1_000.0, 8, 4_000.0);
        let expected = [0.0, 1.0, 0.0, -1.0, 0.0, 1.0, 0.0, -1.0];
        for (s, e) in wave.iter().zip(expected) {
            assert_abs_diff_eq!(*s, e, epsilon = 1e-6);
        }
    }

    #[test]
    fn square_only_takes_unit_values() {
        let wave = generate(Waveform::Square, 440.0, 1000, 48_000.0);
        assert_eq!(wave.len(), 1000);
        assert!(wave.iter().all(|&s| s == 1.0 || s == -1.0));
        assert!(wave.contains(&-1.0));
    }
}
