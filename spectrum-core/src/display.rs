//! # Display Mapping Module
//!
//! Turns a magnitude spectrum into screen-space points. Bins are spread
//! logarithmically along x so the low end, where most musical content
//! lives, gets most of the width.

use crate::config::DisplayGeometry;

/// One vertex of the spectrum curve in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayPoint {
    pub x: f32,
    pub y: f32,
}

/// Maps every bin of `spectrum` to a [`DisplayPoint`].
///
/// `window_log2_len` is the size exponent of the window the spectrum came
/// from; dividing by `2^window_log2_len` keeps heights comparable across
/// window sizes. An empty spectrum gives an empty series.
pub fn map_to_display(spectrum: &[f32], window_log2_len: u32, geometry: &DisplayGeometry) -> Vec<DisplayPoint> {
    let len = spectrum.len();
    let log_len = (len as f64).ln();
    let window_len = 2f64.powi(window_log2_len as i32);

    spectrum
        .iter()
        .enumerate()
        .map(|(i, &magnitude)| {
            let x = if i == 0 {
                0.0
            } else {
                ((i as f64 + 1.0).ln() / log_len) * geometry.display_length as f64
            };
            let y = geometry.baseline_y as f64
                - (geometry.amplitude_scale as f64 * 2.0 * magnitude as f64 / window_len);
            DisplayPoint {
                x: x as f32,
                y: y as f32,
            }
        })
        .collect()
}
