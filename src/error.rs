//! Error types for the spectral-stretch crate.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StretchError>;

/// Errors that can occur while configuring or driving a stretcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StretchError {
    /// A channel index was outside the channel count of an interleaved buffer.
    #[error("channel {channel} out of range for a {channels}-channel buffer")]
    ChannelOutOfRange { channel: usize, channels: usize },
    /// Invalid channel count, block length, interval or preset sample rate.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Engine state could not be allocated.
    #[error("failed to allocate {samples} elements of engine state")]
    Allocation { samples: usize },
    /// Invalid or unsupported audio file contents.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StretchError {
    fn from(err: std::io::Error) -> Self {
        StretchError::Io(err.to_string())
    }
}

/// Allocates a vector of `len` copies of `value`, reporting failure instead of aborting.
pub(crate) fn try_filled<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| StretchError::Allocation { samples: len })?;
    v.resize(len, value);
    Ok(v)
}
