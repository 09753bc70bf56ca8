use std::fmt;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StretchError};

/// A single audio sample (32-bit float, nominal range -1.0 to 1.0).
pub type Sample = f32;

/// Smallest block length the spectral engine accepts.
pub const MIN_BLOCK_LENGTH: usize = 2;

/// Named configuration bundles keyed by sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Block and interval tuned for quality.
    #[default]
    Default,
    /// Shorter block, longer interval: fewer FFTs per second at some quality cost.
    Cheaper,
}

impl Preset {
    /// Block length in seconds.
    pub fn block_seconds(self) -> f32 {
        match self {
            Preset::Default => 0.12,
            Preset::Cheaper => 0.1,
        }
    }

    /// Analysis interval (hop) in seconds.
    pub fn interval_seconds(self) -> f32 {
        match self {
            Preset::Default => 0.03,
            Preset::Cheaper => 0.04,
        }
    }
}

impl std::str::FromStr for Preset {
    type Err = StretchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(Preset::Default),
            "cheaper" | "cheap" => Ok(Preset::Cheaper),
            other => Err(StretchError::InvalidConfig(format!(
                "unknown preset '{}' (use default or cheaper)",
                other
            ))),
        }
    }
}

/// Configuration handed to the transform engine at construction.
///
/// Block length and interval are in frames. The configuration is fixed for
/// the lifetime of a stretcher; [`reset`](crate::Stretch::reset) keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StretchConfig {
    /// Number of interleaved channels.
    pub channels: usize,
    /// Analysis/synthesis block length in frames.
    pub block_length: usize,
    /// Distance between successive blocks in frames.
    pub interval: usize,
}

impl StretchConfig {
    /// Creates an explicit configuration. Call [`validate`](Self::validate)
    /// (or construct an engine) to check it.
    pub fn new(channels: usize, block_length: usize, interval: usize) -> Self {
        Self {
            channels,
            block_length,
            interval,
        }
    }

    /// Derives block length and interval from a named preset and a sample rate.
    ///
    /// # Errors
    /// Returns [`StretchError::InvalidConfig`] if `sample_rate` is not finite
    /// and positive.
    pub fn from_preset(preset: Preset, channels: usize, sample_rate: f32) -> Result<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(StretchError::InvalidConfig(format!(
                "sample rate must be positive and finite, got {}",
                sample_rate
            )));
        }
        let block_length = (sample_rate * preset.block_seconds()).round() as usize;
        let interval = (sample_rate * preset.interval_seconds()).round() as usize;
        Ok(Self::new(channels, block_length, interval))
    }

    /// Quality-oriented preset for `sample_rate`.
    pub fn preset_default(channels: usize, sample_rate: f32) -> Result<Self> {
        Self::from_preset(Preset::Default, channels, sample_rate)
    }

    /// Lower-cost preset for `sample_rate`.
    pub fn preset_cheaper(channels: usize, sample_rate: f32) -> Result<Self> {
        Self::from_preset(Preset::Cheaper, channels, sample_rate)
    }

    /// Set the block length.
    pub fn with_block_length(mut self, block_length: usize) -> Self {
        self.block_length = block_length;
        self
    }

    /// Set the interval.
    pub fn with_interval(mut self, interval: usize) -> Self {
        self.interval = interval;
        self
    }

    /// Number of spectral bands (non-negative frequency bins) per block.
    #[inline]
    pub fn bands(&self) -> usize {
        self.block_length / 2 + 1
    }

    /// Channel count as a `NonZeroUsize`, or a configuration error.
    pub fn channel_count(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.channels).ok_or_else(|| {
            StretchError::InvalidConfig("channel count must be at least 1".to_string())
        })
    }

    /// Checks the relationships the spectral engine depends on.
    ///
    /// # Errors
    /// Returns [`StretchError::InvalidConfig`] when the channel count is zero,
    /// the block is shorter than [`MIN_BLOCK_LENGTH`], or the interval is zero
    /// or longer than the block.
    pub fn validate(&self) -> Result<()> {
        self.channel_count()?;
        if self.block_length < MIN_BLOCK_LENGTH {
            return Err(StretchError::InvalidConfig(format!(
                "block length must be at least {}, got {}",
                MIN_BLOCK_LENGTH, self.block_length
            )));
        }
        if self.interval == 0 || self.interval > self.block_length {
            return Err(StretchError::InvalidConfig(format!(
                "interval must be in 1..={}, got {}",
                self.block_length, self.interval
            )));
        }
        Ok(())
    }
}

impl fmt::Display for StretchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channels={}, block={}, interval={}",
            self.channels, self.block_length, self.interval
        )
    }
}
