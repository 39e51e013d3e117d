//! # Fast Fourier Transform (FFT) Module
//!
//! Radix-2 decimation-in-time Cooley-Tukey transform used to turn a
//! power-of-two sample window into a complex spectrum, plus the helpers that
//! size and pad windows and pull magnitudes out of the result.
//!
//! ## Features
//! - Iterative in-place butterflies over a bit-reversed input
//! - Twiddle factors and the permutation table computed once per window length
//! - Double-precision arithmetic, single-precision magnitudes

use rustfft::num_complex::Complex;
use std::f64::consts::PI;

use crate::error::{Result, SpectrumError};

/// Complex output of a transform, same length as its input window.
pub type ComplexSpectrum = Vec<Complex<f64>>;

/// Returns `ceil(log2(count))`, with 0 and 1 both mapping to 0.
pub fn next_power_of_two_exponent(count: usize) -> u32 {
    if count <= 1 {
        0
    } else {
        (count - 1).ilog2() + 1
    }
}

/// Smallest power of two that holds `count` samples.
pub fn next_power_of_two_length(count: usize) -> usize {
    1usize << next_power_of_two_exponent(count)
}

/// Zero-pads `samples` at the tail up to the next power of two.
///
/// Returns the padded window together with its size exponent.
pub fn pad_to_power_of_two(mut samples: Vec<f32>) -> (Vec<f32>, u32) {
    let log2_len = next_power_of_two_exponent(samples.len());
    samples.resize(1usize << log2_len, 0.0);
    (samples, log2_len)
}

/// A transform plan for one window length.
///
/// Building the plan is the expensive part; [`Radix2Fft::process`] only
/// permutes and runs the butterflies.
#[derive(Debug, Clone)]
pub struct Radix2Fft {
    len: usize,
    /// `exp(-2πi·k/len)` for `k` in `[0, len/2)`.
    twiddles: Vec<Complex<f64>>,
    bit_reversed: Vec<usize>,
}

impl Radix2Fft {
    /// Plans a transform of `len` points.
    ///
    /// Fails with [`SpectrumError::InvalidWindowSize`] unless `len` is zero or
    /// a power of two.
    pub fn new(len: usize) -> Result<Self> {
        if len != 0 && !len.is_power_of_two() {
            return Err(SpectrumError::InvalidWindowSize(len));
        }

        let twiddles = (0..len / 2)
            .map(|k| Complex::from_polar(1.0, -2.0 * PI * k as f64 / len as f64))
            .collect();

        Ok(Self {
            len,
            twiddles,
            bit_reversed: bit_reversal_table(len),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Transforms `buffer` in place.
    ///
    /// The output ordering is the natural one: `buffer[k]` holds frequency
    /// bin `k`, exactly as the recursive even/odd split produces it.
    pub fn process(&self, buffer: &mut [Complex<f64>]) -> Result<()> {
        if buffer.len() != self.len {
            return Err(SpectrumError::InvalidWindowSize(buffer.len()));
        }

        for (i, &j) in self.bit_reversed.iter().enumerate() {
            if i < j {
                buffer.swap(i, j);
            }
        }

        let mut half = 1;
        while half < self.len {
            let size = half * 2;
            let stride = self.len / size;
            for start in (0..self.len).step_by(size) {
                for k in 0..half {
                    let t = self.twiddles[k * stride] * buffer[start + k + half];
                    let even = buffer[start + k];
                    buffer[start + k] = even + t;
                    buffer[start + k + half] = even - t;
                }
            }
            half = size;
        }

        Ok(())
    }

    /// Transforms a real window, returning a fresh complex spectrum.
    pub fn transform(&self, samples: &[f32]) -> Result<ComplexSpectrum> {
        let mut buffer: ComplexSpectrum = samples
            .iter()
            .map(|&s| Complex::new(s as f64, 0.0))
            .collect();
        self.process(&mut buffer)?;
        Ok(buffer)
    }
}

fn bit_reversal_table(len: usize) -> Vec<usize> {
    if len <= 1 {
        return vec![0; len];
    }
    let shift = usize::BITS - len.ilog2();
    (0..len).map(|i| i.reverse_bits() >> shift).collect()
}

/// One-shot transform of a power-of-two window.
pub fn transform(samples: &[f32]) -> Result<ComplexSpectrum> {
    Radix2Fft::new(samples.len())?.transform(samples)
}

/// Magnitudes of the first half of a spectrum.
///
/// A real input gives a conjugate-symmetric spectrum, so the upper half
/// repeats the lower one and is dropped.
pub fn spectrum_to_magnitudes(spectrum: &[Complex<f64>]) -> Vec<f32> {
    spectrum
        .iter()
        .take(spectrum.len() / 2)
        .map(|c| c.norm() as f32) // .norm() is sqrt(re^2 + im^2)
        .collect()
}
