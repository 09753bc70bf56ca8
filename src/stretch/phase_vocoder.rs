//! Block-wise phase vocoder: analysis, frequency estimation, peak-shifting
//! transposition, formant correction and overlap-add synthesis.
//!
//! Frequencies are tracked in bins (cycles per block), so the phase advance
//! for bin `k` over `hop` frames splits into an exact integer part
//! `(k * hop) % block` and a small fractional deviation. This keeps the
//! unity-ratio, unity-transpose path bit-for-bit close to the input even for
//! long blocks.

use std::f32::consts::PI;

use rustfft::num_complex::Complex;

use crate::core::fft::{FftPair, COMPLEX_ZERO};
use crate::core::window::{hann_window_into, synthesis_window_into};
use crate::error::{try_filled, Result};
use crate::stretch::envelope::{cepstral_order, detect_fundamental, sample_envelope, EnvelopeEstimator};
use crate::stretch::params::PitchParams;

const TWO_PI: f32 = 2.0 * PI;

/// Largest per-bin gain formant correction may apply, in either direction.
const MAX_FORMANT_GAIN: f32 = 10.0;

/// Floor for envelope values used as divisors.
const ENVELOPE_FLOOR: f32 = 1e-10;

/// Spectral state one channel carries from block to block.
#[derive(Debug)]
pub struct SpectralChannel {
    /// Magnitudes of the latest analysed block.
    pub magnitudes: Vec<f32>,
    /// Phases of the latest analysed block.
    pub phases: Vec<f32>,
    /// Phases of the block one analysis hop earlier.
    pub prev_phases: Vec<f32>,
    /// Estimated instantaneous frequency per bin, in bins.
    pub frequencies: Vec<f32>,
    /// Output phase accumulator.
    pub synth_phases: Vec<f32>,
}

impl SpectralChannel {
    pub fn new(bands: usize) -> Result<Self> {
        Ok(Self {
            magnitudes: try_filled(bands, 0.0)?,
            phases: try_filled(bands, 0.0)?,
            prev_phases: try_filled(bands, 0.0)?,
            frequencies: bin_frequencies(bands)?,
            synth_phases: try_filled(bands, 0.0)?,
        })
    }

    /// Forgets all analysis history.
    pub fn clear(&mut self) {
        self.magnitudes.iter_mut().for_each(|x| *x = 0.0);
        self.phases.iter_mut().for_each(|x| *x = 0.0);
        self.prev_phases.iter_mut().for_each(|x| *x = 0.0);
        self.synth_phases.iter_mut().for_each(|x| *x = 0.0);
        for (k, f) in self.frequencies.iter_mut().enumerate() {
            *f = k as f32;
        }
    }
}

/// Per-bin centre frequencies, in bins.
fn bin_frequencies(bands: usize) -> Result<Vec<f32>> {
    let mut frequencies = try_filled(bands, 0.0)?;
    for (k, f) in frequencies.iter_mut().enumerate() {
        *f = k as f32;
    }
    Ok(frequencies)
}

/// Shared transforms, windows and scratch for one block configuration.
pub struct PhaseVocoder {
    block_length: usize,
    interval: usize,
    bands: usize,
    fft: FftPair,
    fft_buffer: Vec<Complex<f32>>,
    analysis_window: Vec<f32>,
    synthesis_window: Vec<f32>,
    /// Reusable buffers for the transposed spectrum.
    out_magnitudes: Vec<f32>,
    out_frequencies: Vec<f32>,
    source_phases: Vec<f32>,
    weights: Vec<f32>,
    /// Reusable peaks buffer.
    peaks: Vec<usize>,
    envelope: EnvelopeEstimator,
}

impl PhaseVocoder {
    /// Creates a phase vocoder for `block_length`-frame blocks every `interval` frames.
    pub fn new(block_length: usize, interval: usize) -> Result<Self> {
        let bands = block_length / 2 + 1;
        let mut analysis_window = try_filled(block_length, 0.0)?;
        hann_window_into(&mut analysis_window);
        let mut synthesis_window = try_filled(block_length, 0.0)?;
        synthesis_window_into(&analysis_window, interval, &mut synthesis_window);

        let mut peaks = Vec::new();
        peaks
            .try_reserve_exact(bands)
            .map_err(|_| crate::StretchError::Allocation { samples: bands })?;
        // Reserved before planning, which allocates infallibly
        let fft_buffer = try_filled(block_length, COMPLEX_ZERO)?;

        Ok(Self {
            block_length,
            interval,
            bands,
            fft: FftPair::new(block_length)?,
            fft_buffer,
            analysis_window,
            synthesis_window,
            out_magnitudes: try_filled(bands, 0.0)?,
            out_frequencies: try_filled(bands, 0.0)?,
            source_phases: try_filled(bands, 0.0)?,
            weights: try_filled(bands, 0.0)?,
            peaks,
            envelope: EnvelopeEstimator::new(bands)?,
        })
    }

    #[inline]
    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Windows one block and stores its magnitudes and phases.
    ///
    /// `sample(i)` must return the `i`-th frame of the block, `0 <= i < block_length`.
    pub fn analyse<F>(&mut self, sample: F, magnitudes: &mut [f32], phases: &mut [f32])
    where
        F: Fn(usize) -> f32,
    {
        for (i, (slot, &win)) in self
            .fft_buffer
            .iter_mut()
            .zip(self.analysis_window.iter())
            .enumerate()
        {
            *slot = Complex::new(sample(i) * win, 0.0);
        }

        self.fft.forward(&mut self.fft_buffer);

        for bin in 0..self.bands {
            let c = self.fft_buffer[bin];
            magnitudes[bin] = c.norm();
            phases[bin] = c.arg();
        }
    }

    /// Estimates per-bin frequencies from the phase change over `hop` frames.
    pub fn estimate_frequencies(&self, channel: &mut SpectralChannel, hop: usize) {
        let hop = hop.max(1);
        let scale = self.block_length as f32 / (TWO_PI * hop as f32);
        for bin in 0..self.bands {
            let expected = self.integer_advance(bin, hop);
            let deviation =
                wrap_phase(channel.phases[bin] - channel.prev_phases[bin] - expected);
            channel.frequencies[bin] = bin as f32 + deviation * scale;
        }
    }

    /// Builds the output spectrum for one block and overlap-adds it into `output`.
    ///
    /// `output` is a ring of `block_length` samples whose read position is
    /// `position`. When `fresh` is set the output phases are taken from the
    /// analysis instead of being advanced, which starts a stream in phase
    /// with its input.
    pub fn synthesise(
        &mut self,
        channel: &mut SpectralChannel,
        params: &PitchParams,
        fresh: bool,
        output: &mut [f32],
        position: usize,
    ) {
        self.map_spectrum(channel, params);
        if params.needs_formant_correction() {
            self.correct_formants(channel, params);
        }

        for bin in 0..self.bands {
            let phase = if fresh {
                self.source_phases[bin]
            } else {
                let deviation = self.out_frequencies[bin] - bin as f32;
                let advance = self.integer_advance(bin, self.interval)
                    + TWO_PI * deviation * self.interval as f32 / self.block_length as f32;
                wrap_phase(channel.synth_phases[bin] + advance)
            };
            channel.synth_phases[bin] = phase;
            self.fft_buffer[bin] = Complex::from_polar(self.out_magnitudes[bin], phase);
        }
        for bin in 1..self.bands {
            let mirror = self.block_length - bin;
            if mirror >= self.bands {
                self.fft_buffer[mirror] = self.fft_buffer[bin].conj();
            }
        }

        self.fft.inverse(&mut self.fft_buffer);

        let norm = 1.0 / self.block_length as f32;
        let len = output.len();
        for (i, (c, &win)) in self
            .fft_buffer
            .iter()
            .zip(self.synthesis_window.iter())
            .enumerate()
        {
            output[(position + i) % len] += c.re * norm * win;
        }
    }

    /// Phase advance of bin `bin` over `hop` frames, wrapped, computed from
    /// the exact integer product.
    #[inline]
    fn integer_advance(&self, bin: usize, hop: usize) -> f32 {
        let cycles = (bin * hop) % self.block_length;
        TWO_PI * cycles as f32 / self.block_length as f32
    }

    /// Fills the output magnitude/frequency/phase buffers from the analysis,
    /// moving each spectral peak and its surrounding bins as a unit.
    fn map_spectrum(&mut self, channel: &SpectralChannel, params: &PitchParams) {
        if params.is_unity_transpose() {
            self.out_magnitudes.copy_from_slice(&channel.magnitudes);
            self.out_frequencies.copy_from_slice(&channel.frequencies);
            self.source_phases.copy_from_slice(&channel.phases);
            return;
        }

        self.out_magnitudes.iter_mut().for_each(|x| *x = 0.0);
        self.weights.iter_mut().for_each(|x| *x = 0.0);
        self.source_phases.iter_mut().for_each(|x| *x = 0.0);
        for (bin, f) in self.out_frequencies.iter_mut().enumerate() {
            *f = bin as f32;
        }

        find_peaks(&channel.magnitudes, &mut self.peaks);
        if self.peaks.is_empty() {
            return;
        }

        let bands = self.bands as isize;
        let block = self.block_length as f32;
        for (i, &peak) in self.peaks.iter().enumerate() {
            let start = if i == 0 {
                0
            } else {
                (self.peaks[i - 1] + peak) / 2 + 1
            };
            let end = match self.peaks.get(i + 1) {
                Some(&next) => (peak + next) / 2 + 1,
                None => self.bands,
            };

            let freq_in = channel.frequencies[peak];
            let freq_out = params.map_frequency(freq_in / block) * block;
            let shift = freq_out.round() as isize - peak as isize;
            let delta = freq_out - freq_in;

            for bin in start..end {
                let target = bin as isize + shift;
                if target < 0 || target >= bands {
                    continue;
                }
                let target = target as usize;
                let mag = channel.magnitudes[bin];
                self.out_magnitudes[target] += mag;
                if mag > self.weights[target] {
                    self.weights[target] = mag;
                    self.out_frequencies[target] = channel.frequencies[bin] + delta;
                    self.source_phases[target] = channel.phases[bin];
                }
            }
        }
    }

    /// Rescales output magnitudes so the spectral envelope lands where the
    /// formant settings ask for, rather than where transposition moved it.
    fn correct_formants(&mut self, channel: &SpectralChannel, params: &PitchParams) {
        let base = if params.formant_base > 0.0 {
            params.formant_base
        } else {
            detect_fundamental(&channel.magnitudes, self.block_length).unwrap_or(0.0)
        };
        let order = cepstral_order(base, self.envelope.cepstrum_size());
        let envelope = self.envelope.extract(&channel.magnitudes, order);

        let transpose = params.transpose;
        let shift = params.formant_shift();
        for (bin, mag) in self.out_magnitudes.iter_mut().enumerate() {
            if *mag == 0.0 {
                continue;
            }
            let current = sample_envelope(envelope, bin as f32 / transpose);
            let desired = sample_envelope(envelope, bin as f32 / shift);
            let gain = desired / current.max(ENVELOPE_FLOOR);
            *mag *= gain.clamp(1.0 / MAX_FORMANT_GAIN, MAX_FORMANT_GAIN);
        }
    }
}

impl std::fmt::Debug for PhaseVocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseVocoder")
            .field("block_length", &self.block_length)
            .field("interval", &self.interval)
            .field("bands", &self.bands)
            .finish()
    }
}

/// Wraps a phase value to [-PI, PI] using efficient modulo arithmetic.
#[inline]
pub fn wrap_phase(phase: f32) -> f32 {
    let p = phase + PI;
    p - (p / TWO_PI).floor() * TWO_PI - PI
}

/// Collects local magnitude maxima into `peaks` (cleared first).
///
/// Edge bins count when they exceed their single neighbour. A spectrum with
/// energy but no strict maximum (e.g. a flat impulse spectrum) yields its
/// first largest bin so it is never silenced.
pub fn find_peaks(magnitudes: &[f32], peaks: &mut Vec<usize>) {
    peaks.clear();
    let n = magnitudes.len();
    if n == 0 {
        return;
    }
    if n == 1 {
        if magnitudes[0] > 0.0 {
            peaks.push(0);
        }
        return;
    }
    if magnitudes[0] > magnitudes[1] {
        peaks.push(0);
    }
    for bin in 1..n - 1 {
        if magnitudes[bin] > magnitudes[bin - 1] && magnitudes[bin] >= magnitudes[bin + 1] {
            peaks.push(bin);
        }
    }
    if magnitudes[n - 1] > magnitudes[n - 2] {
        peaks.push(n - 1);
    }
    if peaks.is_empty() {
        let mut best = 0;
        for bin in 1..n {
            if magnitudes[bin] > magnitudes[best] {
                best = bin;
            }
        }
        if magnitudes[best] > 0.0 {
            peaks.push(best);
        }
    }
}
