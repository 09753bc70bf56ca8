//! Window functions for block analysis and overlap-add synthesis.

use std::f64::consts::PI;

use crate::core::fft::WINDOW_SUM_EPSILON;

/// Generates a periodic Hann window of `size` samples.
pub fn hann_window(size: usize) -> Vec<f32> {
    let mut window = vec![0.0; size];
    hann_window_into(&mut window);
    window
}

/// Fills `out` with a periodic Hann window of `out.len()` samples.
///
/// The periodic form (denominator `size` rather than `size - 1`) overlaps
/// evenly at any hop that divides the block.
pub fn hann_window_into(out: &mut [f32]) {
    if out.len() == 1 {
        out[0] = 1.0;
        return;
    }
    let n = out.len() as f64;
    for (i, slot) in out.iter_mut().enumerate() {
        let x = (2.0 * PI * i as f64) / n;
        *slot = (0.5 * (1.0 - x.cos())) as f32;
    }
}

/// Writes into `out` the synthesis window matching `analysis` at hop `interval`.
///
/// Each sample is divided by the sum of squared analysis-window values that
/// overlap it, so analysis followed by synthesis and overlap-add at the
/// given interval reconstructs the input exactly. Positions where that sum
/// falls below [`WINDOW_SUM_EPSILON`] are zeroed.
///
/// The overlap sums are accumulated in `out` first, one per offset within
/// the interval, so the cost is linear in the block length.
pub fn synthesis_window_into(analysis: &[f32], interval: usize, out: &mut [f32]) {
    debug_assert_eq!(analysis.len(), out.len());
    out.iter_mut().for_each(|x| *x = 0.0);
    if interval == 0 {
        return;
    }
    for (i, w) in analysis.iter().enumerate() {
        out[i % interval] += w * w;
    }
    // Backwards, so each sum slot is read before it is overwritten
    for i in (0..out.len()).rev() {
        let overlap = out[i % interval];
        out[i] = if overlap > WINDOW_SUM_EPSILON {
            analysis[i] / overlap
        } else {
            0.0
        };
    }
}
