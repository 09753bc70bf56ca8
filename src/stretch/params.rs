//! Pitch and formant parameters shared by every block of a stream.

use serde::{Deserialize, Serialize};

/// Smallest transpose/formant factor the engine applies.
pub const MIN_FACTOR: f32 = 1.0 / 16.0;
/// Largest transpose/formant factor the engine applies.
pub const MAX_FACTOR: f32 = 16.0;

/// Converts semitones to a linear frequency multiplier (`2^(semitones/12)`).
#[inline]
pub fn semitones_to_factor(semitones: f32) -> f32 {
    2.0f32.powf(semitones / 12.0)
}

/// Current pitch/formant settings of a stretcher.
///
/// Frequencies (`tonality_limit`, `formant_base`) are normalised to the
/// sample rate, i.e. measured in cycles per sample. Zero means "unlimited"
/// for the tonality limit and "detect" for the formant base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchParams {
    /// Frequency multiplier applied to the signal.
    pub transpose: f32,
    /// Frequency above which transposition becomes a constant offset.
    pub tonality_limit: f32,
    /// Spectral envelope multiplier.
    pub formant: f32,
    /// When set, the formant factor is relative to the input rather than to
    /// the transposed signal, so formants stay put under pitch shifts.
    pub compensate_pitch: bool,
    /// Rough fundamental frequency used to size the envelope estimate.
    pub formant_base: f32,
}

impl Default for PitchParams {
    fn default() -> Self {
        Self {
            transpose: 1.0,
            tonality_limit: 0.0,
            formant: 1.0,
            compensate_pitch: false,
            formant_base: 0.0,
        }
    }
}

impl PitchParams {
    /// Sets the transpose factor and tonality limit, clamping to the supported
    /// range. Non-finite arguments leave the previous value in place.
    pub fn set_transpose(&mut self, multiplier: f32, tonality_limit: f32) {
        if multiplier.is_finite() {
            self.transpose = multiplier.clamp(MIN_FACTOR, MAX_FACTOR);
        }
        if tonality_limit.is_finite() {
            self.tonality_limit = tonality_limit.max(0.0);
        }
    }

    /// Sets the formant factor and pitch compensation flag.
    pub fn set_formant(&mut self, multiplier: f32, compensate_pitch: bool) {
        if multiplier.is_finite() {
            self.formant = multiplier.clamp(MIN_FACTOR, MAX_FACTOR);
        }
        self.compensate_pitch = compensate_pitch;
    }

    /// Sets the formant base frequency (0 = detect).
    pub fn set_formant_base(&mut self, frequency: f32) {
        if frequency.is_finite() {
            self.formant_base = frequency.clamp(0.0, 0.5);
        }
    }

    /// Effective tonality limit in cycles per sample.
    ///
    /// The requested limit is split between the input and output sides by
    /// dividing by the square root of the transpose factor. Without a limit
    /// this returns 1.0, which is above every representable frequency.
    pub fn effective_tonality_limit(&self) -> f32 {
        if self.tonality_limit > 0.0 {
            self.tonality_limit / self.transpose.sqrt()
        } else {
            1.0
        }
    }

    /// Maps an input frequency (cycles per sample) to its output frequency.
    ///
    /// Below the tonality limit frequencies are multiplied; above it they are
    /// offset by the same amount as the limit itself, preserving spacing.
    #[inline]
    pub fn map_frequency(&self, freq: f32) -> f32 {
        let limit = self.effective_tonality_limit();
        if freq > limit {
            freq + (self.transpose - 1.0) * limit
        } else {
            freq * self.transpose
        }
    }

    /// Total envelope shift relative to the input.
    pub fn formant_shift(&self) -> f32 {
        if self.compensate_pitch {
            self.formant
        } else {
            self.formant * self.transpose
        }
    }

    /// True when the transpose factor changes nothing.
    #[inline]
    pub fn is_unity_transpose(&self) -> bool {
        (self.transpose - 1.0).abs() < 1e-6
    }

    /// True when the spectral envelope must be corrected after transposition.
    #[inline]
    pub fn needs_formant_correction(&self) -> bool {
        (self.formant_shift() - self.transpose).abs() > 1e-6
    }
}
