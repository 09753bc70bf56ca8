//! Spectral envelope extraction via real cepstrum, used for formant shifting.

use rustfft::num_complex::Complex;

use crate::core::fft::{FftPair, COMPLEX_ZERO};
use crate::error::{try_filled, Result};

/// Minimum magnitude floor to avoid log(0) in cepstral analysis.
const LOG_FLOOR: f32 = 1e-10;

/// Fraction of the fundamental period kept by the cepstral lifter.
const LIFTER_FRACTION: f32 = 0.75;

/// Smallest lifter order, in cepstral coefficients.
const MIN_ORDER: usize = 4;

/// Estimates the fundamental as the strongest bin in the lower quarter of the
/// spectrum, in cycles per sample. Returns `None` for silent frames.
pub fn detect_fundamental(magnitudes: &[f32], block_length: usize) -> Option<f32> {
    let search_end = (magnitudes.len() / 4).max(2).min(magnitudes.len());
    let (bin, &peak) = magnitudes
        .iter()
        .enumerate()
        .take(search_end)
        .skip(1)
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    if peak <= LOG_FLOOR {
        return None;
    }
    Some(bin as f32 / block_length as f32)
}

/// Chooses a lifter order that keeps quefrencies below one fundamental period.
pub fn cepstral_order(base_frequency: f32, cepstrum_size: usize) -> usize {
    let max_order = (cepstrum_size / 4).max(MIN_ORDER);
    if base_frequency <= 0.0 {
        return (cepstrum_size / 32).clamp(MIN_ORDER, max_order);
    }
    ((LIFTER_FRACTION / base_frequency) as usize).clamp(MIN_ORDER, max_order)
}

/// Preplanned cepstral envelope estimator.
#[derive(Debug)]
pub struct EnvelopeEstimator {
    fft: FftPair,
    cepstrum: Vec<Complex<f32>>,
    envelope: Vec<f32>,
}

impl EnvelopeEstimator {
    /// Creates an estimator for spectra with `bands` non-negative bins.
    pub fn new(bands: usize) -> Result<Self> {
        let size = (bands.max(2) - 1) * 2;
        Ok(Self {
            fft: FftPair::new(size)?,
            cepstrum: try_filled(size, COMPLEX_ZERO)?,
            envelope: try_filled(bands, 1.0)?,
        })
    }

    /// Size of the cepstral transform.
    pub fn cepstrum_size(&self) -> usize {
        self.fft.size()
    }

    /// Extracts the spectral envelope of `magnitudes`, keeping `order`
    /// cepstral coefficients.
    ///
    /// 1. log magnitude, mirrored to a full spectrum
    /// 2. inverse FFT to the cepstrum
    /// 3. zero the high-quefrency part
    /// 4. forward FFT back to a smoothed log spectrum
    /// 5. exponentiate
    pub fn extract(&mut self, magnitudes: &[f32], order: usize) -> &[f32] {
        let bands = self.envelope.len();
        let size = self.fft.size();

        for (slot, &mag) in self.cepstrum.iter_mut().zip(magnitudes.iter()).take(bands) {
            *slot = Complex::new(mag.max(LOG_FLOOR).ln(), 0.0);
        }
        for i in 1..bands - 1 {
            self.cepstrum[size - i] = self.cepstrum[i];
        }

        self.fft.inverse(&mut self.cepstrum);

        let norm = 1.0 / size as f32;
        let effective_order = order.min(size / 2);
        for (i, c) in self.cepstrum.iter_mut().enumerate() {
            if i > effective_order && i < size - effective_order {
                *c = COMPLEX_ZERO;
            } else {
                *c *= norm;
            }
        }

        self.fft.forward(&mut self.cepstrum);

        for (env, c) in self.envelope.iter_mut().zip(self.cepstrum.iter()) {
            *env = c.re.exp();
        }
        &self.envelope
    }
}

/// Linearly interpolates `envelope` at fractional bin `position`, holding the
/// edge values outside the spectrum.
#[inline]
pub fn sample_envelope(envelope: &[f32], position: f32) -> f32 {
    if envelope.is_empty() {
        return 0.0;
    }
    let last = envelope.len() - 1;
    if position <= 0.0 {
        return envelope[0];
    }
    if position >= last as f32 {
        return envelope[last];
    }
    let low = position.floor() as usize;
    let frac = position - low as f32;
    envelope[low] * (1.0 - frac) + envelope[low + 1] * frac
}
