//! FFT-related constants and a preplanned transform pair.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::{try_filled, Result};

/// Zero-valued complex number, used for FFT buffer initialization.
pub const COMPLEX_ZERO: Complex<f32> = Complex::new(0.0, 0.0);

/// Absolute floor for window sum normalization to prevent division by zero.
pub const WINDOW_SUM_EPSILON: f32 = 1e-6;

/// Forward and inverse FFT of one size, planned once, with their scratch space.
///
/// Planning allocates; running the transforms through
/// [`forward`](Self::forward) / [`inverse`](Self::inverse) does not.
pub struct FftPair {
    size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl FftPair {
    /// Plans both directions for `size`-point transforms.
    pub fn new(size: usize) -> Result<Self> {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());
        Ok(Self {
            size,
            forward,
            inverse,
            scratch: try_filled(scratch_len, COMPLEX_ZERO)?,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// In-place unnormalized forward transform of `buffer[..size]`.
    pub fn forward(&mut self, buffer: &mut [Complex<f32>]) {
        let need = self.forward.get_inplace_scratch_len();
        self.forward
            .process_with_scratch(&mut buffer[..self.size], &mut self.scratch[..need]);
    }

    /// In-place unnormalized inverse transform of `buffer[..size]`.
    pub fn inverse(&mut self, buffer: &mut [Complex<f32>]) {
        let need = self.inverse.get_inplace_scratch_len();
        self.inverse
            .process_with_scratch(&mut buffer[..self.size], &mut self.scratch[..need]);
    }
}

impl std::fmt::Debug for FftPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftPair").field("size", &self.size).finish()
    }
}
