//! Channel-major views over interleaved sample buffers.
//!
//! An interleaved buffer stores `frame0[ch0..chN-1], frame1[ch0..chN-1], ...`.
//! The views here expose it as `view.channel(c)?[frame]` without copying:
//! sample `(c, f)` resolves to `buffer[f * channels + c]`.
//!
//! Only the channel index is validated. Frame indices are the caller's
//! responsibility; indexing past the end of the underlying slice panics like
//! any other slice access.

use std::num::NonZeroUsize;
use std::ops::{Index, IndexMut};

use crate::core::types::Sample;
use crate::error::{Result, StretchError};

/// Read-only channel-major view over an interleaved buffer.
#[derive(Debug, Clone, Copy)]
pub struct ChannelView<'a> {
    data: &'a [Sample],
    channels: NonZeroUsize,
}

impl<'a> ChannelView<'a> {
    /// Wraps `data`, interpreting it as interleaved with `channels` channels.
    pub fn new(data: &'a [Sample], channels: NonZeroUsize) -> Self {
        Self { data, channels }
    }

    /// Number of interleaved channels.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels.get()
    }

    /// Number of complete frames in the buffer.
    #[inline]
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels.get()
    }

    /// Returns a strided accessor for one channel.
    ///
    /// # Errors
    /// Returns [`StretchError::ChannelOutOfRange`] when `channel >= channels()`.
    #[inline]
    pub fn channel(&self, channel: usize) -> Result<Channel<'a>> {
        check_channel(channel, self.channels.get())?;
        Ok(Channel {
            data: self.data,
            channel,
            stride: self.channels.get(),
        })
    }
}

/// Mutable channel-major view over an interleaved buffer.
#[derive(Debug)]
pub struct ChannelViewMut<'a> {
    data: &'a mut [Sample],
    channels: NonZeroUsize,
}

impl<'a> ChannelViewMut<'a> {
    /// Wraps `data`, interpreting it as interleaved with `channels` channels.
    pub fn new(data: &'a mut [Sample], channels: NonZeroUsize) -> Self {
        Self { data, channels }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels.get()
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels.get()
    }

    /// Read-only accessor for one channel.
    #[inline]
    pub fn channel(&self, channel: usize) -> Result<Channel<'_>> {
        check_channel(channel, self.channels.get())?;
        Ok(Channel {
            data: self.data,
            channel,
            stride: self.channels.get(),
        })
    }

    /// Writable accessor for one channel.
    ///
    /// # Errors
    /// Returns [`StretchError::ChannelOutOfRange`] when `channel >= channels()`.
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> Result<ChannelMut<'_>> {
        check_channel(channel, self.channels.get())?;
        Ok(ChannelMut {
            data: self.data,
            channel,
            stride: self.channels.get(),
        })
    }
}

#[inline]
fn check_channel(channel: usize, channels: usize) -> Result<()> {
    if channel >= channels {
        return Err(StretchError::ChannelOutOfRange { channel, channels });
    }
    Ok(())
}

/// One channel of an interleaved buffer, indexed by frame.
#[derive(Debug, Clone, Copy)]
pub struct Channel<'a> {
    data: &'a [Sample],
    channel: usize,
    stride: usize,
}

impl<'a> Channel<'a> {
    /// Number of frames addressable in this channel.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.stride
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the sample at `frame`, or `None` past the end of the buffer.
    #[inline]
    pub fn get(&self, frame: usize) -> Option<Sample> {
        if frame >= self.len() {
            return None;
        }
        self.data.get(frame * self.stride + self.channel).copied()
    }

    /// Iterates over the channel's samples in frame order.
    pub fn iter(&self) -> impl Iterator<Item = Sample> + 'a {
        self.data
            .iter()
            .skip(self.channel)
            .step_by(self.stride)
            .copied()
            .take(self.data.len() / self.stride)
    }
}

impl Index<usize> for Channel<'_> {
    type Output = Sample;

    #[inline]
    fn index(&self, frame: usize) -> &Sample {
        &self.data[frame * self.stride + self.channel]
    }
}

/// One writable channel of an interleaved buffer, indexed by frame.
#[derive(Debug)]
pub struct ChannelMut<'a> {
    data: &'a mut [Sample],
    channel: usize,
    stride: usize,
}

impl ChannelMut<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.stride
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sets every frame of this channel to `value`, leaving other channels untouched.
    pub fn fill(&mut self, value: Sample) {
        let frames = self.len();
        for frame in 0..frames {
            self.data[frame * self.stride + self.channel] = value;
        }
    }
}

impl Index<usize> for ChannelMut<'_> {
    type Output = Sample;

    #[inline]
    fn index(&self, frame: usize) -> &Sample {
        &self.data[frame * self.stride + self.channel]
    }
}

impl IndexMut<usize> for ChannelMut<'_> {
    #[inline]
    fn index_mut(&mut self, frame: usize) -> &mut Sample {
        &mut self.data[frame * self.stride + self.channel]
    }
}
